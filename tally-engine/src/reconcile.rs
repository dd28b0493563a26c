//! Reconciliation: opening balance, debit/credit totals, derived closing
//! balance, and the mismatch check against the source's own balance column.

use rust_decimal::Decimal;
use tally_core::{
    Diagnostic, DiagnosticKind, Ledger, MismatchDetail, OpeningSource, ReconciliationReport,
};
use tracing::debug;

/// Derive the opening balance from the ledger itself: walk to the first
/// balance-bearing transaction and invert the movements applied up to and
/// including it (`balance_before = balance_after - credits + debits`).
fn derive_opening(ledger: &Ledger) -> Option<Decimal> {
    let mut applied = Decimal::ZERO;
    for tx in &ledger.transactions {
        if let Some(d) = &tx.debit {
            applied -= d.value;
        }
        if let Some(c) = &tx.credit {
            applied += c.value;
        }
        if let Some(b) = &tx.balance {
            return Some(b.value - applied);
        }
    }
    None
}

/// Compute the reconciliation report for a ledger.
///
/// The identity `closing = opening - total_debits + total_credits` holds
/// exactly by construction; `tolerance` only guards the comparison against
/// the source's recorded closing balance.
pub fn reconcile(
    ledger: &Ledger,
    declared_opening: Option<Decimal>,
    tolerance: Decimal,
) -> (ReconciliationReport, Vec<Diagnostic>) {
    let mut diags = Vec::new();

    let (opening_balance, opening_source) = match declared_opening {
        Some(v) => (v, OpeningSource::Declared),
        None => match derive_opening(ledger) {
            Some(v) => (v, OpeningSource::DerivedFromFirstBalance),
            None => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::OpeningBalanceAssumedZero,
                    "no declared opening and no balance column to derive one from",
                ));
                (Decimal::ZERO, OpeningSource::AssumedZero)
            }
        },
    };

    let total_debits: Decimal =
        ledger.transactions.iter().filter_map(|t| t.debit.as_ref()).map(|a| a.value).sum();
    let total_credits: Decimal =
        ledger.transactions.iter().filter_map(|t| t.credit.as_ref()).map(|a| a.value).sum();
    let closing_balance = opening_balance - total_debits + total_credits;

    let mut balance_mismatch = false;
    let mut mismatch = None;
    if let Some(recorded) = ledger.last_recorded_balance() {
        let difference = recorded.value - closing_balance;
        if difference.abs() > tolerance {
            balance_mismatch = true;
            mismatch = Some(MismatchDetail {
                computed_closing: closing_balance,
                recorded_closing: recorded.value,
                difference,
                tolerance,
            });
            debug!(%closing_balance, recorded = %recorded.value, %difference, "balance mismatch");
            diags.push(Diagnostic::new(
                DiagnosticKind::BalanceMismatch,
                format!(
                    "computed closing {closing_balance} vs recorded {} (difference {difference})",
                    recorded.value
                ),
            ));
        }
    }

    (
        ReconciliationReport {
            opening_balance,
            opening_source,
            total_debits,
            total_credits,
            closing_balance,
            balance_mismatch,
            mismatch,
        },
        diags,
    )
}
