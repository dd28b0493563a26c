//! Reconciliation summary types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where the opening balance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpeningSource {
    /// Supplied by the caller alongside the statement.
    Declared,
    /// Inverted from the first transaction's own balance and movement.
    DerivedFromFirstBalance,
    /// Nothing to go on; zero assumed and flagged.
    AssumedZero,
}

/// Detail carried when the recorded closing balance disagrees with the
/// computed one beyond tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchDetail {
    pub computed_closing: Decimal,
    pub recorded_closing: Decimal,
    pub difference: Decimal,
    pub tolerance: Decimal,
}

/// Derived summary of a ledger. Recomputed whole whenever the ledger changes;
/// never mutated in place, and holds no reference back to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub opening_balance: Decimal,
    pub opening_source: OpeningSource,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    /// Always exactly `opening_balance - total_debits + total_credits`.
    pub closing_balance: Decimal,
    pub balance_mismatch: bool,
    pub mismatch: Option<MismatchDetail>,
}

impl ReconciliationReport {
    pub fn summary(&self) -> String {
        format!(
            "opening {} | debits {} | credits {} | closing {}{}",
            self.opening_balance,
            self.total_debits,
            self.total_credits,
            self.closing_balance,
            if self.balance_mismatch { " [MISMATCH]" } else { "" }
        )
    }
}
