//! CSV ingest.
//!
//! Turns an uploaded CSV file into untyped JSON rows for the override store.
//! Which category a row belongs to is decided later, by shape (see
//! `domain::schema`); this module only reads and types cells.
//!
//! Design goals:
//! - **Dynamic cell typing** (integer, then real, then text; empty cells omitted)
//! - **Row-level errors** (skip unreadable lines, but report what happened)
//! - **No category logic here**

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde_json::{Map, Number, Value};

use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: typed rows + row errors.
#[derive(Debug, Clone)]
pub struct IngestedCsv {
    pub rows: Vec<Value>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Read a CSV file into JSON objects keyed by (normalized) header name.
pub fn read_csv_rows(path: &Path) -> Result<IngestedCsv, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_csv_from(file).map_err(|e| AppError::new(2, format!("{}: {e}", path.display())))
}

/// Same as [`read_csv_rows`] for any reader.
pub fn read_csv_from<R: Read>(reader: R) -> Result<IngestedCsv, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    if header_map.is_empty() {
        return Err(AppError::new(2, "CSV has no header row."));
    }
    let columns = ordered_columns(&header_map);

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let row = row_to_json(&record, &columns);
        if row.is_empty() {
            // Blank line.
            continue;
        }
        rows.push(Value::Object(row));
    }

    Ok(IngestedCsv {
        rows,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes put a BOM in front of the first header
    // (e.g. "\u{feff}timestamp"); without stripping it the shape check misses
    // the column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ordered_columns(header_map: &HashMap<String, usize>) -> Vec<(usize, String)> {
    let mut columns: Vec<(usize, String)> = header_map
        .iter()
        .map(|(name, idx)| (*idx, name.clone()))
        .collect();
    columns.sort_by_key(|(idx, _)| *idx);
    columns
}

fn row_to_json(record: &StringRecord, columns: &[(usize, String)]) -> Map<String, Value> {
    let mut row = Map::new();
    for (idx, name) in columns {
        let Some(cell) = record.get(*idx).map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        row.insert(name.clone(), parse_cell(cell));
    }
    row
}

/// Type a cell: integer, then finite real, then text.
fn parse_cell(cell: &str) -> Value {
    if let Ok(n) = cell.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}
