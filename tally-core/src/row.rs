//! Raw extractor output: tables of rows of text cells, with provenance.

use serde::{Deserialize, Serialize};

/// One row of text cells as produced by an external extraction backend,
/// before any semantic interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    /// Zero-based page index in the source document.
    pub page: usize,
    /// Zero-based table index within the page.
    pub table: usize,
    /// Zero-based row index within the table.
    pub row: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(page: usize, table: usize, row: usize, cells: Vec<String>) -> Self {
        Self { page, table, row, cells }
    }

    /// Cell text at `idx`, trimmed; empty string when the index is out of range.
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(|c| c.trim()).unwrap_or("")
    }

    /// Number of cells with non-whitespace content.
    pub fn non_empty_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.trim().is_empty()).count()
    }

    /// All cells joined with single spaces, collapsing empties.
    pub fn joined(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_blank(&self) -> bool {
        self.non_empty_cells() == 0
    }

    pub fn provenance(&self) -> RowRef {
        RowRef { page: self.page, table: self.table, row: self.row }
    }
}

/// Lightweight reference back to a source row, kept for audit trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRef {
    pub page: usize,
    pub table: usize,
    pub row: usize,
}

impl std::fmt::Display for RowRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}/t{}/r{}", self.page, self.table, self.row)
    }
}

/// Reference to a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub page: usize,
    pub index: usize,
}

/// One table handed over by the extraction backend. The core is agnostic to
/// which extraction strategy (bordered, stream, text, OCR) produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    pub page: usize,
    pub index: usize,
    pub rows: Vec<RawRow>,
}

impl ExtractedTable {
    pub fn new(page: usize, index: usize, rows: Vec<RawRow>) -> Self {
        Self { page, index, rows }
    }

    /// Build a table from plain cell grids, assigning row provenance.
    pub fn from_cells(page: usize, index: usize, grid: Vec<Vec<String>>) -> Self {
        let rows = grid
            .into_iter()
            .enumerate()
            .map(|(r, cells)| RawRow::new(page, index, r, cells))
            .collect();
        Self { page, index, rows }
    }

    pub fn provenance(&self) -> TableRef {
        TableRef { page: self.page, index: self.index }
    }
}
