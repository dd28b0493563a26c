//! Debit/credit classification: turn a logical transaction's candidate
//! amounts into exactly one movement (or a bare balance marker).
//!
//! Resolution order: explicit/positional column assignment, then section
//! context, then per-institution description vocabulary, then the sign of
//! the value. At most one of debit/credit is ever populated.

use crate::columns::ColumnMap;
use rust_decimal::Decimal;
use tally_core::{
    Amount, CompiledProfile, Diagnostic, DiagnosticKind, Field, LogicalTransaction,
    MovementDirection, RoleHint, SectionRole, Transaction,
};
use tracing::debug;

/// Movement slot under construction.
#[derive(Debug, Default)]
struct Slots {
    debit: Option<Amount>,
    credit: Option<Amount>,
    balance: Option<Amount>,
    balance_explicit: bool,
    reference: Option<String>,
    low_confidence: bool,
}

impl Slots {
    fn movement_value(&self) -> Option<Decimal> {
        self.debit.as_ref().or(self.credit.as_ref()).map(|a| a.value)
    }

    fn set_movement(&mut self, direction: MovementDirection, amount: Amount) {
        let abs = Amount::new(amount.value.abs(), amount.raw);
        match direction {
            MovementDirection::Debit => self.debit = Some(abs),
            MovementDirection::Credit => self.credit = Some(abs),
        }
    }
}

fn direction_of(
    value: Decimal,
    description: &str,
    section: Option<SectionRole>,
    profile: &CompiledProfile,
) -> MovementDirection {
    match section {
        Some(SectionRole::Credits) => return MovementDirection::Credit,
        Some(SectionRole::Debits) => return MovementDirection::Debit,
        Some(SectionRole::Neutral) | None => {}
    }
    if let Some(d) = profile.movement_direction(description) {
        return d;
    }
    // Last resort: the printed sign. Negative reduces the balance.
    if value.is_sign_negative() { MovementDirection::Debit } else { MovementDirection::Credit }
}

/// Classify the amounts of one logical transaction into a final
/// [`Transaction`]. Pure; diagnostics are returned, not logged away.
pub fn classify_amounts(
    tx: LogicalTransaction,
    map: &ColumnMap,
    section: Option<SectionRole>,
    profile: &CompiledProfile,
) -> (Transaction, Vec<Diagnostic>) {
    let mut slots = Slots { reference: tx.reference.clone(), ..Slots::default() };
    let mut diags: Vec<Diagnostic> = Vec::new();
    let mut unassigned: Vec<Amount> = Vec::new();
    let at = tx.origin.first().copied();

    for tagged in &tx.amounts {
        let amount = tagged.amount.clone();
        match tagged.cell {
            Some(idx) if map.contains(Field::Balance, idx) => {
                // Running balance: the latest row of the coalesced group wins.
                slots.balance = Some(amount);
                slots.balance_explicit = true;
            }
            Some(idx) if map.movement_is_signed() && map.contains(Field::Debit, idx) => {
                let dir = if amount.value.is_sign_negative() {
                    MovementDirection::Debit
                } else {
                    MovementDirection::Credit
                };
                if slots.movement_value().is_none() {
                    slots.set_movement(dir, amount);
                } else {
                    unassigned.push(amount);
                }
            }
            Some(idx) if map.contains(Field::Debit, idx) => {
                if slots.debit.is_none() {
                    slots.debit = Some(Amount::new(amount.value.abs(), amount.raw));
                } else {
                    unassigned.push(amount);
                }
            }
            Some(idx) if map.contains(Field::Credit, idx) => {
                if slots.credit.is_none() {
                    slots.credit = Some(Amount::new(amount.value.abs(), amount.raw));
                } else {
                    unassigned.push(amount);
                }
            }
            _ => match tagged.hint {
                RoleHint::Balance => {
                    slots.balance = Some(amount);
                    slots.balance_explicit = true;
                }
                RoleHint::Debit if slots.debit.is_none() => {
                    slots.debit = Some(Amount::new(amount.value.abs(), amount.raw));
                }
                RoleHint::Credit if slots.credit.is_none() => {
                    slots.credit = Some(Amount::new(amount.value.abs(), amount.raw));
                }
                _ => unassigned.push(amount),
            },
        }
    }

    // Distinct positional debit and credit cells both populated: genuinely
    // contradictory extraction. Keep the larger as the movement, surface the
    // other, and flag.
    if slots.debit.is_some() && slots.credit.is_some() {
        let d = slots.debit.take().unwrap();
        let c = slots.credit.take().unwrap();
        let (keep_debit, kept, other) =
            if d.value.abs() >= c.value.abs() { (true, d, c) } else { (false, c, d) };
        if keep_debit {
            slots.debit = Some(kept);
        } else {
            slots.credit = Some(kept);
        }
        if slots.reference.is_none() {
            slots.reference = Some(other.raw.clone());
        }
        slots.low_confidence = true;
        diags.push(Diagnostic {
            kind: DiagnosticKind::AmbiguousAmounts,
            at,
            detail: format!("both debit and credit cells populated (`{}` dropped)", other.raw),
        });
    }

    // Same monetary value captured twice (overlapping scans of one row) adds
    // no information.
    unassigned.dedup_by(|a, b| a.value == b.value);
    if let Some(mv) = slots.movement_value() {
        unassigned.retain(|a| a.value.abs() != mv.abs());
    }

    // Trailing amount as running balance: only when it is distinguishable
    // from the movement, and big enough that it cannot be a voucher number
    // (otherwise the reference rule below claims it).
    if slots.balance.is_none() && !unassigned.is_empty() {
        let needs_movement = slots.movement_value().is_none();
        let enough = if needs_movement { 2 } else { 1 };
        let threshold = profile.profile.reference_threshold;
        if unassigned.len() >= enough {
            let last = unassigned.last().expect("non-empty").clone();
            let biggest_rest = unassigned[..unassigned.len() - 1]
                .iter()
                .map(|a| a.value.abs())
                .max()
                .or(slots.movement_value().map(|v| v.abs()));
            if let Some(rest) = biggest_rest
                && last.value.abs() != rest
                && last.value.abs() > threshold
            {
                slots.balance = Some(last);
                unassigned.pop();
            }
        }
    }

    // Remaining candidates: largest is the principal movement; a small
    // leftover reads as a voucher/reference number, anything bigger is kept
    // and flagged.
    if slots.movement_value().is_none() && !unassigned.is_empty() {
        unassigned.sort_by_key(|a| a.value.abs());
        let principal = unassigned.pop().expect("non-empty");
        let threshold = profile.profile.reference_threshold;
        for leftover in unassigned.drain(..) {
            if leftover.value.abs() <= threshold {
                if slots.reference.is_none() {
                    slots.reference = Some(leftover.raw.clone());
                }
            } else {
                slots.low_confidence = true;
                if slots.reference.is_none() {
                    slots.reference = Some(leftover.raw.clone());
                }
                diags.push(Diagnostic {
                    kind: DiagnosticKind::AmbiguousAmounts,
                    at,
                    detail: format!(
                        "second amount `{}` above reference threshold {}",
                        leftover.raw, threshold
                    ),
                });
            }
        }
        let dir = direction_of(principal.value, &tx.description, section, profile);
        debug!(?dir, value = %principal.value, desc = %tx.description, "movement resolved heuristically");
        slots.set_movement(dir, principal);
    } else {
        for leftover in unassigned.drain(..) {
            if leftover.value.abs() > profile.profile.reference_threshold {
                slots.low_confidence = true;
                diags.push(Diagnostic {
                    kind: DiagnosticKind::AmbiguousAmounts,
                    at,
                    detail: format!("unclaimed amount `{}` beside mapped movement", leftover.raw),
                });
            }
            if slots.reference.is_none() {
                slots.reference = Some(leftover.raw.clone());
            }
        }
    }

    // Never double-count one value as both movement and heuristic balance.
    if !slots.balance_explicit
        && let (Some(mv), Some(bal)) = (slots.movement_value(), slots.balance.as_ref())
        && bal.value.abs() == mv.abs()
    {
        slots.balance = None;
    }

    let out = Transaction {
        date: tx.date,
        description: tx.description,
        debit: slots.debit,
        credit: slots.credit,
        balance: slots.balance,
        reference: slots.reference,
        low_confidence: slots.low_confidence,
        origin: tx.origin,
    };
    debug_assert!(out.debit.is_none() || out.credit.is_none());
    (out, diags)
}
