//! Reading extracted tables from disk.
//!
//! Two shapes are accepted: a JSON file carrying every table of a statement
//! with page/index provenance, or a bare CSV treated as one table on page 0.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tally_core::ExtractedTable;

/// JSON statement file: `{"tables": [{"page": 0, "index": 0, "rows": [["..."]]}]}`.
#[derive(Debug, Deserialize)]
struct StatementFile {
    tables: Vec<TableSpec>,
}

#[derive(Debug, Deserialize)]
struct TableSpec {
    #[serde(default)]
    page: usize,
    #[serde(default)]
    index: usize,
    rows: Vec<Vec<String>>,
}

pub fn load_tables(path: &Path) -> Result<Vec<ExtractedTable>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => load_csv(path),
        _ => load_json(path),
    }
}

fn load_json(path: &Path) -> Result<Vec<ExtractedTable>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let file: StatementFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(file
        .tables
        .into_iter()
        .map(|t| ExtractedTable::from_cells(t.page, t.index, t.rows))
        .collect())
}

fn load_csv(path: &Path) -> Result<Vec<ExtractedTable>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result.with_context(|| format!("reading {}", path.display()))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(vec![ExtractedTable::from_cells(0, 0, rows)])
}
