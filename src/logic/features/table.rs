//! Tabular data - CSV in, CSV out
//!
//! Cells are kept as raw strings so batch output can echo every input column
//! verbatim. Numeric views are parsed on demand, per column.

use std::collections::HashSet;
use std::io::Read;

use thiserror::Error;

/// Tokens read as a missing cell
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
    "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a",
    "nan", "null",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum TableError {
    #[error("No columns to parse from file")]
    Empty,

    #[error("Expected {expected} fields in line {line}, saw {found}")]
    Ragged {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("could not convert string to float: '{value}' (column '{column}', row {row})")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("column not found: {0}")]
    UnknownColumn(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ============================================================================
// CELL HELPERS
// ============================================================================

pub fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

/// Parse a cell as a number; `Ok(None)` for a missing cell
pub fn parse_cell(cell: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    if is_missing(cell) {
        return Ok(None);
    }
    cell.trim().parse::<f64>().map(Some)
}

/// Median of the present values; NaN when there are none
pub fn median(values: &[Option<f64>]) -> f64 {
    let mut present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();

    if present.is_empty() {
        return f64::NAN;
    }

    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        (present[mid - 1] + present[mid]) / 2.0
    } else {
        present[mid]
    }
}

/// Suffix repeated names so every column stays addressable by name
fn dedupe_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.map(|name| {
        let mut candidate = name.to_string();
        let mut n = 0;
        while !seen.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{}.{}", name, n);
        }
        candidate
    })
    .collect()
}

// ============================================================================
// TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse CSV with a header line.
    ///
    /// Short rows are padded with missing cells, long rows are an error.
    /// Repeated header names become `name.1`, `name.2`, ...
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = dedupe_headers(reader.headers()?.iter());
        if headers.is_empty() {
            return Err(TableError::Empty);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(TableError::Ragged {
                    line: record.position().map(|p| p.line()).unwrap_or(0),
                    expected: headers.len(),
                    found: record.len(),
                });
            }

            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        Self::from_reader(bytes)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Numeric view of one column, `None` where the cell is missing
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let cell = &cells[idx];
                parse_cell(cell).map_err(|_| TableError::NonNumeric {
                    column: name.to_string(),
                    row,
                    value: cell.clone(),
                })
            })
            .collect()
    }

    /// Index of the first row whose `column` holds the integer `key`.
    ///
    /// `10854555` and `10854555.0` both match; unparseable cells never do.
    pub fn find_row(&self, column: &str, key: i64) -> Result<Option<usize>, TableError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;

        Ok(self.rows.iter().position(|cells| {
            let cell = cells[idx].trim();
            match cell.parse::<i64>() {
                Ok(v) => v == key,
                Err(_) => cell
                    .parse::<f64>()
                    .map(|v| v.fract() == 0.0 && v == key as f64)
                    .unwrap_or(false),
            }
        }))
    }

    /// Overwrite `name` in place if it exists, otherwise append it.
    ///
    /// `values` must hold one cell per row.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, TableError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.into_inner().map_err(|e| TableError::Io(e.into_error()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
