//! tally-core: data model, numeric normalization, and institution profiles
//! for the statement normalization engine.

pub mod amount;
pub mod date;
pub mod diag;
pub mod profile;
pub mod report;
pub mod row;
pub mod transaction;

pub use amount::{Amount, AmountError, SeparatorConvention, SeparatorHint, format_amount, looks_like_amount, parse_amount};
pub use date::{looks_like_date, parse_date};
pub use diag::{Diagnostic, DiagnosticKind, NormalizeError, Result};
pub use profile::{
    CompiledProfile, Field, HeaderKeywords, InstitutionProfile, MovementDirection, PositionalRule,
    SectionRole, SectionRule, TotalsMode, TotalsRule, fold,
};
pub use report::{MismatchDetail, OpeningSource, ReconciliationReport};
pub use row::{ExtractedTable, RawRow, RowRef, TableRef};
pub use transaction::{Ledger, LogicalTransaction, RoleHint, TaggedAmount, Transaction};
