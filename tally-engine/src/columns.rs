//! Column mapping: semantic field -> cell index, per table.
//!
//! Built once per table from the header row when one exists, topped up with
//! the institution's declarative positional fallback rules, and reused for
//! every row of that table. Re-deriving per row would be non-deterministic on
//! noisy single rows.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tally_core::{CompiledProfile, Diagnostic, DiagnosticKind, Field, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Derived from a matched header token.
    Explicit,
    /// Inferred from a configured column position.
    Positional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub indices: Vec<usize>,
    pub confidence: Confidence,
}

/// Per-table mapping from semantic field to cell index(es). Fields the
/// profile could not resolve are absent, never guessed past the declared
/// fallback; downstream components fall back to free-text scanning for those.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    assignments: HashMap<Field, ColumnRef>,
    /// Row width the positional rules were resolved against.
    pub width: usize,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<&ColumnRef> {
        self.assignments.get(&field)
    }

    /// First mapped cell index for `field`.
    pub fn cell_index(&self, field: Field) -> Option<usize> {
        self.assignments.get(&field).and_then(|r| r.indices.first().copied())
    }

    pub fn contains(&self, field: Field, idx: usize) -> bool {
        self.assignments.get(&field).is_some_and(|r| r.indices.contains(&idx))
    }

    pub fn is_explicit(&self, field: Field) -> bool {
        self.assignments.get(&field).is_some_and(|r| r.confidence == Confidence::Explicit)
    }

    pub fn is_mapped(&self, field: Field) -> bool {
        self.assignments.contains_key(&field)
    }

    /// True when the profile mapped debit and credit onto the same cell: a
    /// single signed movement column whose role the sign decides.
    pub fn movement_is_signed(&self) -> bool {
        match (self.cell_index(Field::Debit), self.cell_index(Field::Credit)) {
            (Some(d), Some(c)) => d == c,
            _ => false,
        }
    }

    pub fn explicit_count(&self) -> usize {
        self.assignments.values().filter(|r| r.confidence == Confidence::Explicit).count()
    }
}

/// Most common cell count across the sampled rows; header width as fallback.
fn dominant_width(header_row: Option<&RawRow>, sample_rows: &[&RawRow]) -> usize {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for r in sample_rows {
        *counts.entry(r.cells.len()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(width, n)| (*n, *width))
        .map(|(width, _)| width)
        .or_else(|| header_row.map(|h| h.cells.len()))
        .unwrap_or(0)
}

/// Build the per-table column map.
///
/// Explicit header matches win; positional rules only fill fields the header
/// left unmapped. Returns table-level diagnostics for required fields that
/// neither source resolved.
pub fn build_map(
    header_row: Option<&RawRow>,
    sample_rows: &[&RawRow],
    profile: &CompiledProfile,
) -> (ColumnMap, Vec<Diagnostic>) {
    let mut assignments: HashMap<Field, ColumnRef> = HashMap::new();

    if let Some(header) = header_row {
        for (idx, cell) in header.cells.iter().enumerate() {
            if let Some(field) = profile.header_field(cell) {
                assignments
                    .entry(field)
                    .or_insert_with(|| ColumnRef { indices: Vec::new(), confidence: Confidence::Explicit })
                    .indices
                    .push(idx);
            }
        }
    }

    let width = dominant_width(header_row, sample_rows);

    for rule in &profile.profile.positional {
        if assignments.contains_key(&rule.field) {
            continue;
        }
        let resolved = match (rule.index, rule.from_end) {
            (Some(i), _) if i < width => Some(i),
            (None, Some(e)) if e < width => Some(width - 1 - e),
            _ => None,
        };
        if let Some(idx) = resolved {
            assignments.insert(
                rule.field,
                ColumnRef { indices: vec![idx], confidence: Confidence::Positional },
            );
        }
    }

    let mut diags = Vec::new();
    let movement_mapped =
        assignments.contains_key(&Field::Debit) || assignments.contains_key(&Field::Credit);
    let mut unresolved: Vec<&str> = Vec::new();
    if !assignments.contains_key(&Field::Date) {
        unresolved.push("date");
    }
    if !movement_mapped {
        unresolved.push("debit/credit");
    }
    if !unresolved.is_empty() {
        diags.push(Diagnostic::new(
            DiagnosticKind::NoHeaderAndNoFallback,
            format!(
                "no header match and no positional rule for: {}; falling back to free-text scanning",
                unresolved.join(", ")
            ),
        ));
    }

    (ColumnMap { assignments, width }, diags)
}
