//! Row coalescing: merge a transaction row with its trailing continuation
//! rows into one logical transaction.
//!
//! The scan is strictly sequential and stateful; at most one logical
//! transaction is open at a time. State never survives a table boundary.

use crate::classify::RowKind;
use crate::columns::ColumnMap;
use rust_decimal::Decimal;
use tally_core::{
    Amount, CompiledProfile, Diagnostic, DiagnosticKind, Field, LogicalTransaction, RawRow,
    RoleHint, TaggedAmount, TotalsMode, looks_like_amount, looks_like_date, parse_amount,
    parse_date,
};
use tracing::debug;

/// Everything one raw row contributes, pre-sorted by kind of content.
struct RowPieces {
    date: Option<chrono::NaiveDate>,
    date_raw: String,
    text: String,
    reference: Option<String>,
    amounts: Vec<TaggedAmount>,
    diags: Vec<Diagnostic>,
}

fn hint_for_cell(map: &ColumnMap, idx: usize) -> RoleHint {
    if map.contains(Field::Balance, idx) {
        RoleHint::Balance
    } else if map.movement_is_signed() && map.contains(Field::Debit, idx) {
        // Single signed movement column: the sign decides later.
        RoleHint::Unknown
    } else if map.contains(Field::Debit, idx) {
        RoleHint::Debit
    } else if map.contains(Field::Credit, idx) {
        RoleHint::Credit
    } else {
        RoleHint::Unknown
    }
}

fn is_amount_column(map: &ColumnMap, idx: usize) -> bool {
    map.contains(Field::Debit, idx)
        || map.contains(Field::Credit, idx)
        || map.contains(Field::Balance, idx)
}

/// Pull date, amounts, reference, and leftover text out of one row, using the
/// column map where it has answers and free-text scanning where it does not.
fn extract(row: &RawRow, map: &ColumnMap, profile: &CompiledProfile) -> RowPieces {
    let mut pieces = RowPieces {
        date: None,
        date_raw: String::new(),
        text: String::new(),
        reference: None,
        amounts: Vec::new(),
        diags: Vec::new(),
    };
    let hint_sep = profile.separator_hint();
    let formats = profile.date_formats();

    let mut push_text = |text: &mut String, t: &str| {
        let t = t.trim();
        if t.is_empty() {
            return;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(t);
    };

    for (idx, cell) in row.cells.iter().enumerate() {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }

        if map.contains(Field::Date, idx) {
            if let Some(d) = parse_date(cell, formats) {
                pieces.date = Some(d);
                pieces.date_raw = cell.to_string();
                continue;
            }
            if looks_like_date(cell) {
                pieces.date_raw = cell.to_string();
                continue;
            }
            // Not date-shaped at all: totals and summary rows often land
            // their text in the date column; treat it like any other cell.
        }
        if map.contains(Field::Reference, idx) {
            pieces.reference = Some(cell.to_string());
            continue;
        }

        // Whole-cell date where no date column is mapped.
        if pieces.date.is_none()
            && pieces.date_raw.is_empty()
            && !map.is_mapped(Field::Date)
            && looks_like_date(cell)
        {
            pieces.date_raw = cell.to_string();
            pieces.date = parse_date(cell, formats);
            continue;
        }

        // Whole-cell amount: mapped amount columns parse unconditionally,
        // other cells only when the token is amount-shaped.
        if is_amount_column(map, idx) {
            match parse_amount(cell, hint_sep) {
                Ok(a) => {
                    pieces.amounts.push(TaggedAmount::new(a, Some(idx), hint_for_cell(map, idx)));
                }
                Err(e) => {
                    pieces.diags.push(Diagnostic::at_row(
                        DiagnosticKind::UnparsableAmount,
                        row.provenance(),
                        e.to_string(),
                    ));
                }
            }
            continue;
        }
        if looks_like_amount(cell) {
            match parse_amount(cell, hint_sep) {
                Ok(a) => pieces.amounts.push(TaggedAmount::new(a, Some(idx), RoleHint::Unknown)),
                Err(e) => pieces.diags.push(Diagnostic::at_row(
                    DiagnosticKind::UnparsableAmount,
                    row.provenance(),
                    e.to_string(),
                )),
            }
            continue;
        }

        // Mixed cell: scrape amount-shaped (and, if still needed, date-shaped)
        // tokens out of the text; the rest is description.
        for token in cell.split_whitespace() {
            if pieces.date.is_none()
                && pieces.date_raw.is_empty()
                && !map.is_mapped(Field::Date)
                && looks_like_date(token)
            {
                pieces.date_raw = token.to_string();
                pieces.date = parse_date(token, formats);
                continue;
            }
            if looks_like_amount(token) {
                match parse_amount(token, hint_sep) {
                    Ok(a) => pieces.amounts.push(TaggedAmount::new(a, None, RoleHint::Unknown)),
                    Err(e) => pieces.diags.push(Diagnostic::at_row(
                        DiagnosticKind::UnparsableAmount,
                        row.provenance(),
                        e.to_string(),
                    )),
                }
                continue;
            }
            push_text(&mut pieces.text, token);
        }
    }

    pieces
}

/// Value of the principal (non-balance) amounts currently on a transaction.
fn movement_sum(tx: &LogicalTransaction) -> Decimal {
    tx.amounts
        .iter()
        .filter(|a| a.hint != RoleHint::Balance)
        .map(|a| a.amount.value)
        .sum()
}

fn close_open(
    open: &mut Option<LogicalTransaction>,
    out: &mut Vec<LogicalTransaction>,
    diags: &mut Vec<Diagnostic>,
    profile: &CompiledProfile,
) {
    let Some(tx) = open.take() else { return };
    if tx.has_amounts() {
        out.push(tx);
        return;
    }
    // Zero amounts: a boilerplate fragment dies quietly, anything else is
    // surfaced so a reviewer can see what was skipped.
    if !tx.description.trim().is_empty() && !profile.is_metadata(&tx.description) {
        let at = tx.origin.first().copied();
        diags.push(Diagnostic {
            kind: DiagnosticKind::EmptyTransactionDropped,
            at,
            detail: format!("no amounts on `{}`", tx.description),
        });
    }
}

/// Merge classified rows into logical transactions, in document order.
pub fn coalesce(
    rows: &[(RowKind, &RawRow)],
    map: &ColumnMap,
    profile: &CompiledProfile,
) -> (Vec<LogicalTransaction>, Vec<Diagnostic>) {
    let mut out: Vec<LogicalTransaction> = Vec::new();
    let mut diags: Vec<Diagnostic> = Vec::new();
    let mut open: Option<LogicalTransaction> = None;

    for (kind, row) in rows {
        match kind {
            RowKind::Header | RowKind::SectionMarker => {
                // A new section or a repeated header ends whatever was open.
                close_open(&mut open, &mut out, &mut diags, profile);
            }
            RowKind::Metadata | RowKind::Blank => {}
            RowKind::TransactionCandidate => {
                let mut pieces = extract(row, map, profile);
                diags.append(&mut pieces.diags);

                let has_date = pieces.date.is_some() || !pieces.date_raw.is_empty();
                if !has_date
                    && let Some(mode) = profile.totals_match(&row.joined())
                    && open.is_some()
                    && !pieces.amounts.is_empty()
                {
                    // Institution-configured totals line: supersedes (or
                    // augments) the detail line it follows instead of opening
                    // a movement of its own.
                    let tx = open.as_mut().unwrap();
                    let principal = pieces
                        .amounts
                        .iter()
                        .filter(|a| a.hint != RoleHint::Balance)
                        .max_by_key(|a| a.amount.abs())
                        .cloned();
                    if let Some(p) = principal {
                        let value = match mode {
                            TotalsMode::Replace => p.amount.value,
                            TotalsMode::Add => movement_sum(tx) + p.amount.value,
                        };
                        debug!(row = %row.provenance(), ?mode, %value, "totals line supersedes detail");
                        tx.amounts.retain(|a| a.hint == RoleHint::Balance);
                        tx.amounts.push(TaggedAmount::new(
                            Amount::new(value, p.amount.raw.clone()),
                            p.cell,
                            RoleHint::Unknown,
                        ));
                    }
                    for a in pieces.amounts.into_iter().filter(|a| a.hint == RoleHint::Balance) {
                        tx.amounts.push(a);
                    }
                    tx.push_description(&pieces.text);
                    tx.origin.push(row.provenance());
                    continue;
                }

                close_open(&mut open, &mut out, &mut diags, profile);
                open = Some(LogicalTransaction {
                    date: pieces.date,
                    date_raw: pieces.date_raw,
                    description: pieces.text,
                    amounts: pieces.amounts,
                    reference: pieces.reference,
                    origin: vec![row.provenance()],
                });
            }
            RowKind::Continuation => {
                let Some(tx) = open.as_mut() else {
                    diags.push(Diagnostic::at_row(
                        DiagnosticKind::OrphanContinuation,
                        row.provenance(),
                        format!("`{}` has no open transaction to extend", row.joined()),
                    ));
                    continue;
                };
                let mut pieces = extract(row, map, profile);
                diags.append(&mut pieces.diags);

                if let Some(mode) = profile.totals_match(&row.joined())
                    && !pieces.amounts.is_empty()
                {
                    let principal = pieces
                        .amounts
                        .iter()
                        .filter(|a| a.hint != RoleHint::Balance)
                        .max_by_key(|a| a.amount.abs())
                        .cloned();
                    if let Some(p) = principal {
                        let value = match mode {
                            TotalsMode::Replace => p.amount.value,
                            TotalsMode::Add => movement_sum(tx) + p.amount.value,
                        };
                        tx.amounts.retain(|a| a.hint == RoleHint::Balance);
                        tx.amounts.push(TaggedAmount::new(
                            Amount::new(value, p.amount.raw.clone()),
                            p.cell,
                            RoleHint::Unknown,
                        ));
                    }
                    tx.push_description(&pieces.text);
                    tx.origin.push(row.provenance());
                    continue;
                }

                tx.push_description(&pieces.text);
                tx.amounts.append(&mut pieces.amounts);
                if tx.reference.is_none() {
                    tx.reference = pieces.reference;
                }
                tx.origin.push(row.provenance());
            }
        }
    }

    close_open(&mut open, &mut out, &mut diags, profile);
    (out, diags)
}
