//! Per-statement pipeline: classify rows, map columns once per table,
//! coalesce, classify amounts, assemble the ledger, reconcile.
//!
//! The core performs no I/O and never suspends. A statement either completes
//! normalization or fails whole; partial ledgers are not emitted.

use crate::classify::{RowContext, RowKind, classify_row};
use crate::coalesce::coalesce;
use crate::columns::build_map;
use crate::ledger::build_ledger;
use crate::reconcile::reconcile;
use crate::roles::classify_amounts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tally_core::{
    CompiledProfile, Diagnostic, ExtractedTable, Ledger, NormalizeError, RawRow,
    ReconciliationReport, SectionRole, TableRef, Transaction, parse_amount,
};
use tracing::{debug, warn};

/// Side-channel inputs accompanying one statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Declared opening balance token, in the institution's own format.
    pub declared_opening: Option<String>,
    /// Declared currency code; falls back to the profile's default.
    pub currency: Option<String>,
}

/// Per-table outcome, for review tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: TableRef,
    pub transactions: usize,
    pub had_header: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Everything the pipeline hands to the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementOutput {
    pub ledger: Ledger,
    pub report: ReconciliationReport,
    pub currency: Option<String>,
    pub tables: Vec<TableReport>,
    /// Statement-level diagnostics (deduplication, reconciliation).
    pub diagnostics: Vec<Diagnostic>,
}

/// Normalize one statement's tables into a ledger plus reconciliation report.
///
/// Tables are processed strictly in document order; the column map is built
/// once per table and reused for all of its rows.
pub fn normalize_statement(
    tables: &[ExtractedTable],
    profile: &CompiledProfile,
    options: &NormalizeOptions,
) -> tally_core::Result<StatementOutput> {
    let declared_opening = match &options.declared_opening {
        Some(token) => Some(
            parse_amount(token, profile.separator_hint())
                .map_err(|source| NormalizeError::BadDeclaredOpening {
                    token: token.clone(),
                    source,
                })?
                .value,
        ),
        None => None,
    };

    let mut per_table: Vec<(TableRef, Vec<Transaction>)> = Vec::new();
    let mut table_reports: Vec<TableReport> = Vec::new();

    for table in tables {
        if table.rows.is_empty() {
            continue;
        }
        let table_ref = table.provenance();
        let mut diags: Vec<Diagnostic> = Vec::new();

        // Pass 1: classify every row, tracking the active section context.
        let mut classified: Vec<(RowKind, &RawRow)> = Vec::with_capacity(table.rows.len());
        let mut section_at: HashMap<usize, Option<SectionRole>> = HashMap::new();
        let mut current_section: Option<SectionRole> = None;
        let mut prev_kind: Option<RowKind> = None;
        for (pos, row) in table.rows.iter().enumerate() {
            let ctx = RowContext { is_first_row_of_table: pos == 0, prev_kind };
            let kind = classify_row(row, &ctx, profile);
            if kind == RowKind::SectionMarker {
                current_section = match profile.section_role(&row.joined()) {
                    Some(SectionRole::Neutral) | None => None,
                    Some(role) => Some(role),
                };
                debug!(row = %row.provenance(), ?current_section, "section marker");
            }
            section_at.insert(row.row, current_section);
            classified.push((kind, row));
            prev_kind = Some(kind);
        }

        // Pass 2: column map, built once for the whole table.
        let header_row = classified
            .iter()
            .find(|(k, _)| *k == RowKind::Header)
            .map(|(_, r)| *r);
        let samples: Vec<&RawRow> = classified
            .iter()
            .filter(|(k, _)| *k == RowKind::TransactionCandidate)
            .map(|(_, r)| *r)
            .collect();
        let (map, mut map_diags) = build_map(header_row, &samples, profile);
        diags.append(&mut map_diags);

        // Pass 3: coalesce and classify.
        let (logical, mut co_diags) = coalesce(&classified, &map, profile);
        diags.append(&mut co_diags);

        let mut txs: Vec<Transaction> = Vec::with_capacity(logical.len());
        for ltx in logical {
            let section = ltx
                .origin
                .first()
                .and_then(|r| section_at.get(&r.row).copied())
                .flatten();
            let (tx, mut role_diags) = classify_amounts(ltx, &map, section, profile);
            diags.append(&mut role_diags);
            txs.push(tx);
        }

        table_reports.push(TableReport {
            table: table_ref,
            transactions: txs.len(),
            had_header: header_row.is_some(),
            diagnostics: diags,
        });
        per_table.push((table_ref, txs));
    }

    if per_table.iter().all(|(_, txs)| txs.is_empty()) {
        warn!("statement produced no transactions from {} table(s)", tables.len());
        return Err(NormalizeError::NoUsableTables);
    }

    let (ledger, mut statement_diags) = build_ledger(per_table);
    let (report, mut recon_diags) =
        reconcile(&ledger, declared_opening, profile.profile.balance_tolerance);
    statement_diags.append(&mut recon_diags);

    Ok(StatementOutput {
        ledger,
        report,
        currency: options.currency.clone().or_else(|| profile.profile.currency.clone()),
        tables: table_reports,
        diagnostics: statement_diags,
    })
}
