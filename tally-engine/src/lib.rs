//! tally-engine: the statement normalization pipeline — row classification,
//! column mapping, coalescing, debit/credit classification, ledger assembly,
//! and reconciliation.

pub mod classify;
pub mod coalesce;
pub mod columns;
pub mod ledger;
pub mod pipeline;
pub mod reconcile;
pub mod roles;
pub mod runner;

pub use classify::{RowContext, RowKind, classify_row};
pub use coalesce::coalesce;
pub use columns::{ColumnMap, ColumnRef, Confidence, build_map};
pub use ledger::build_ledger;
pub use pipeline::{NormalizeOptions, StatementOutput, TableReport, normalize_statement};
pub use reconcile::reconcile;
pub use roles::classify_amounts;
pub use runner::{StatementJob, run_statements};
