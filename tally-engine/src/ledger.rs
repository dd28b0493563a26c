//! Ledger assembly: concatenate per-table transactions in document order and
//! drop exact repeats captured by overlapping extraction passes.

use std::collections::HashSet;
use tally_core::{Diagnostic, DiagnosticKind, Ledger, TableRef, Transaction};
use tracing::debug;

/// Build the statement ledger. Encounter order is preserved; the ledger is
/// never re-sorted, because source documents are not always chronological and
/// reordering would destroy provenance.
pub fn build_ledger(tables: Vec<(TableRef, Vec<Transaction>)>) -> (Ledger, Vec<Diagnostic>) {
    let mut ledger = Ledger::default();
    let mut diags = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (table, txs) in tables {
        ledger.source_tables.push(table);
        for tx in txs {
            let key = tx.dedup_key();
            if !seen.insert(key) {
                debug!(at = ?tx.origin.first(), desc = %tx.description, "duplicate transaction dropped");
                diags.push(Diagnostic {
                    kind: DiagnosticKind::DuplicateDropped,
                    at: tx.origin.first().copied(),
                    detail: format!("`{}` already captured by an earlier pass", tx.description),
                });
                continue;
            }
            ledger.transactions.push(tx);
        }
    }

    (ledger, diags)
}
