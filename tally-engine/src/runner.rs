//! Bounded-concurrency driver for batches of statements.
//!
//! Statements are embarrassingly parallel: no row or table state is shared
//! across workers, so the core needs no locking. Within one statement the
//! pipeline stays strictly sequential.

use crate::pipeline::{NormalizeOptions, StatementOutput, normalize_statement};
use std::sync::Arc;
use tally_core::{CompiledProfile, ExtractedTable};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// One statement's worth of work.
#[derive(Debug, Clone)]
pub struct StatementJob {
    /// Caller-chosen identifier, echoed back with the result.
    pub id: String,
    pub tables: Vec<ExtractedTable>,
    pub options: NormalizeOptions,
}

/// Process many statements concurrently, at most `max_workers` at a time.
/// Results come back in submission order, one per job; a failed statement is
/// reported whole, never as a partial ledger.
pub async fn run_statements(
    jobs: Vec<(StatementJob, Arc<CompiledProfile>)>,
    max_workers: usize,
) -> Vec<(String, tally_core::Result<StatementOutput>)> {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut set = JoinSet::new();

    for (pos, (job, profile)) in jobs.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let result = normalize_statement(&job.tables, &profile, &job.options);
            if result.is_err() {
                warn!(statement = %job.id, "statement failed normalization");
            }
            (pos, job.id, result)
        });
    }

    let mut slots: Vec<Option<(String, tally_core::Result<StatementOutput>)>> = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (pos, id, result) = joined.expect("normalization task never panics");
        if slots.len() <= pos {
            slots.resize_with(pos + 1, || None);
        }
        slots[pos] = Some((id, result));
    }
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::InstitutionProfile;

    fn profile() -> Arc<CompiledProfile> {
        Arc::new(
            InstitutionProfile::from_toml(
                r#"
id = "t"
name = "T"
separator_hint = "comma_decimal"
date_formats = ["%d/%m/%y"]

[headers]
date = ["fecha"]
description = ["concepto"]
debit = ["debito"]
credit = ["credito"]
balance = ["saldo"]
"#,
            )
            .unwrap()
            .compile()
            .unwrap(),
        )
    }

    fn job(id: &str, rows: Vec<Vec<&str>>) -> StatementJob {
        let grid = rows
            .into_iter()
            .map(|r| r.into_iter().map(|c| c.to_string()).collect())
            .collect();
        StatementJob {
            id: id.to_string(),
            tables: vec![ExtractedTable::from_cells(0, 0, grid)],
            options: NormalizeOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_results_in_submission_order() {
        let p = profile();
        let good = vec![
            vec!["Fecha", "Concepto", "Debito", "Credito", "Saldo"],
            vec!["01/09/25", "Pago", "100,00", "", "900,00"],
        ];
        let jobs = vec![
            (job("a", good.clone()), Arc::clone(&p)),
            (job("b", vec![vec!["solo texto sin montos"]]), Arc::clone(&p)),
            (job("c", good), Arc::clone(&p)),
        ];
        let results = run_statements(jobs, 2).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "a");
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err(), "no usable tables must fail whole");
        assert_eq!(results[2].0, "c");
        assert!(results[2].1.is_ok());
    }

    #[tokio::test]
    async fn test_worker_bound_of_one_still_completes() {
        let p = profile();
        let good = vec![
            vec!["Fecha", "Concepto", "Debito", "Credito", "Saldo"],
            vec!["01/09/25", "Pago", "100,00", "", "900,00"],
        ];
        let jobs: Vec<_> = (0..8).map(|i| (job(&format!("s{i}"), good.clone()), Arc::clone(&p))).collect();
        let results = run_statements(jobs, 1).await;
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
    }
}
