//! Row classification: decide what each raw row is before any merging.

use serde::{Deserialize, Serialize};
use tally_core::{CompiledProfile, RawRow, looks_like_amount, looks_like_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    Header,
    SectionMarker,
    Metadata,
    TransactionCandidate,
    Continuation,
    Blank,
}

/// Scan context carried between rows of one table. Resets at table
/// boundaries; continuation logic never crosses tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowContext {
    pub is_first_row_of_table: bool,
    pub prev_kind: Option<RowKind>,
}

/// True when any cell (or whitespace token inside a cell) is date-shaped.
pub fn row_has_date(row: &RawRow) -> bool {
    row.cells.iter().any(|c| {
        let c = c.trim();
        looks_like_date(c) || c.split_whitespace().any(looks_like_date)
    })
}

/// True when any cell (or whitespace token inside a cell) is amount-shaped.
pub fn row_has_amount(row: &RawRow) -> bool {
    row.cells.iter().any(|c| {
        let c = c.trim();
        looks_like_amount(c) || c.split_whitespace().any(looks_like_amount)
    })
}

fn has_nontrivial_text(row: &RawRow) -> bool {
    let text = row.joined();
    text.chars().filter(|c| c.is_alphabetic()).count() >= 3
}

/// Is the row nothing but amount-shaped tokens? Such a row alone after a
/// candidate supplies a missing amount rather than starting a movement.
fn amount_only(row: &RawRow) -> bool {
    let mut saw_amount = false;
    for cell in &row.cells {
        for token in cell.split_whitespace() {
            if looks_like_amount(token) {
                saw_amount = true;
            } else if token.chars().any(|c| c.is_alphanumeric()) {
                return false;
            }
        }
    }
    saw_amount
}

/// Classify one raw row. Keyword sets, section markers, and boilerplate
/// patterns all come from the institution profile.
pub fn classify_row(row: &RawRow, ctx: &RowContext, profile: &CompiledProfile) -> RowKind {
    if row.is_blank() {
        return RowKind::Blank;
    }

    let joined = row.joined();

    if profile.is_metadata(&joined) {
        return RowKind::Metadata;
    }

    // Header: at least two cells naming distinct semantic fields.
    let mut header_fields: Vec<tally_core::Field> = Vec::new();
    for cell in &row.cells {
        if let Some(f) = profile.header_field(cell)
            && !header_fields.contains(&f)
        {
            header_fields.push(f);
        }
    }
    if header_fields.len() >= 2 {
        return RowKind::Header;
    }

    if profile.section_role(&joined).is_some() {
        return RowKind::SectionMarker;
    }

    let has_date = row_has_date(row);
    let has_amount = row_has_amount(row);

    let follows_candidate = matches!(
        ctx.prev_kind,
        Some(RowKind::TransactionCandidate) | Some(RowKind::Continuation)
    );

    if has_date || has_amount {
        // A bare amount immediately after a candidate extends it instead of
        // opening a movement of its own.
        if !has_date && amount_only(row) && (follows_candidate || ctx.is_first_row_of_table) {
            return RowKind::Continuation;
        }
        return RowKind::TransactionCandidate;
    }

    if has_nontrivial_text(row) && (follows_candidate || ctx.is_first_row_of_table) {
        return RowKind::Continuation;
    }

    RowKind::Blank
}
