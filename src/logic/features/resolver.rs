//! Feature Resolver - raw input to model-ordered numbers
//!
//! Three sources, two policies:
//! - explicit mapping: every schema name required, values used as given,
//!   keys outside the schema ignored
//! - lookup table row / uploaded batch: gaps filled with the column median
//!
//! The mapping path never imputes. Callers sending features directly must send
//! all of them.

use std::fmt;

use ndarray::{Array1, Array2};
use serde_json::{Map, Value};
use thiserror::Error;

use super::layout::FeatureSchema;
use super::table::{median, Table, TableError};

/// Missing names listed in an error before truncating
pub const MAX_REPORTED_MISSING: usize = 10;

/// Column holding the integer key in the lookup table
pub const LOOKUP_KEY_COLUMN: &str = "kepid";

// ============================================================================
// ERRORS
// ============================================================================

/// Names absent from the input: first few shown, all counted
#[derive(Debug, Clone, PartialEq)]
pub struct MissingNames {
    pub shown: Vec<String>,
    pub total: usize,
}

impl MissingNames {
    fn from_list(mut missing: Vec<String>) -> Option<Self> {
        if missing.is_empty() {
            return None;
        }
        let total = missing.len();
        missing.truncate(MAX_REPORTED_MISSING);
        Some(Self { shown: missing, total })
    }
}

impl fmt::Display for MissingNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self.shown.iter().map(|n| format!("'{}'", n)).collect();
        write!(f, "[{}] (total {})", quoted.join(", "), self.total)
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Missing features: {0}")]
    MissingFeatures(MissingNames),

    #[error("Missing required columns: {0}")]
    MissingColumns(MissingNames),

    #[error("feature '{0}' must be a number")]
    InvalidValue(String),

    #[error("kepid not found")]
    KeyNotFound(i64),

    #[error(transparent)]
    Table(#[from] TableError),
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Build one row from caller-supplied values. No imputation.
///
/// Presence is checked before any value is read, and only schema keys are
/// converted. A `null` value counts as present and becomes NaN.
pub fn from_mapping(
    schema: &FeatureSchema,
    features: &Map<String, Value>,
) -> Result<Array1<f64>, ResolveError> {
    let missing = schema.missing_from(|name| features.contains_key(name));
    if let Some(missing) = MissingNames::from_list(missing) {
        return Err(ResolveError::MissingFeatures(missing));
    }

    schema
        .iter()
        .map(|name| {
            features
                .get(name)
                .and_then(numeric_value)
                .ok_or_else(|| ResolveError::InvalidValue(name.to_string()))
        })
        .collect()
}

/// Numbers and numeric strings; `null` reads as NaN
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => Some(f64::NAN),
        _ => None,
    }
}

/// Build one row from the lookup table entry keyed by `key`.
///
/// Gaps take the median of the whole table's column, computed per call.
pub fn from_lookup(
    schema: &FeatureSchema,
    table: &Table,
    key: i64,
) -> Result<Array1<f64>, ResolveError> {
    let row = table
        .find_row(LOOKUP_KEY_COLUMN, key)?
        .ok_or(ResolveError::KeyNotFound(key))?;

    schema
        .iter()
        .map(|name| -> Result<f64, ResolveError> {
            let column = table.numeric_column(name)?;
            Ok(column[row].unwrap_or_else(|| median(&column)))
        })
        .collect()
}

/// Build the full matrix for an uploaded batch, one row per input row.
///
/// Gaps take the median of the uploaded column.
pub fn from_batch(schema: &FeatureSchema, table: &Table) -> Result<Array2<f64>, ResolveError> {
    let missing = schema.missing_from(|name| table.has_column(name));
    if let Some(missing) = MissingNames::from_list(missing) {
        return Err(ResolveError::MissingColumns(missing));
    }

    let mut matrix = Array2::<f64>::zeros((table.len(), schema.len()));
    for (j, name) in schema.iter().enumerate() {
        let column = table.numeric_column(name)?;
        let fill = median(&column);
        for (i, value) in column.into_iter().enumerate() {
            matrix[[i, j]] = value.unwrap_or(fill);
        }
    }

    Ok(matrix)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_mapping_uses_schema_order() {
        let schema = schema(&["b", "a", "c"]);
        let features = mapping(json!({"a": 1, "b": "2", "c": 3.0, "extra": 99}));

        let row = from_mapping(&schema, &features).unwrap();
        assert_eq!(row.to_vec(), vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_mapping_reports_first_ten_missing() {
        let names: Vec<String> = (0..15).map(|i| format!("f{}", i)).collect();
        let schema = FeatureSchema::new(names.clone()).unwrap();
        let features = mapping(json!({"f3": 1.0}));

        match from_mapping(&schema, &features) {
            Err(ResolveError::MissingFeatures(missing)) => {
                assert_eq!(missing.total, 14);
                let expected: Vec<String> = names
                    .into_iter()
                    .filter(|n| n != "f3")
                    .take(MAX_REPORTED_MISSING)
                    .collect();
                assert_eq!(missing.shown, expected);
            }
            other => panic!("expected missing features, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_message_format() {
        let schema = schema(&["koi_period", "koi_depth"]);
        let err = from_mapping(&schema, &Map::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing features: ['koi_period', 'koi_depth'] (total 2)"
        );
    }

    #[test]
    fn test_mapping_null_is_nan() {
        let schema = schema(&["a"]);
        let features = mapping(json!({"a": null}));
        assert!(from_mapping(&schema, &features).unwrap()[0].is_nan());
    }

    #[test]
    fn test_mapping_ignores_extra_keys_of_any_type() {
        let schema = schema(&["a"]);
        let features = mapping(json!({"a": 4, "comment": "from UI", "tags": [1, 2]}));
        assert_eq!(from_mapping(&schema, &features).unwrap().to_vec(), vec![4.0]);
    }

    #[test]
    fn test_mapping_checks_presence_before_values() {
        let schema = schema(&["a", "b"]);
        let features = mapping(json!({"a": "abc"}));
        assert!(matches!(
            from_mapping(&schema, &features),
            Err(ResolveError::MissingFeatures(ref m)) if m.shown == vec!["b".to_string()]
        ));
    }

    #[test]
    fn test_mapping_rejects_non_numeric_schema_value() {
        let schema = schema(&["a", "b"]);
        let features = mapping(json!({"a": 1, "b": {"nested": true}}));
        let err = from_mapping(&schema, &features).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidValue(ref name) if name == "b"));
        assert_eq!(err.to_string(), "feature 'b' must be a number");
    }

    #[test]
    fn test_lookup_fills_gaps_with_table_median() {
        let table = Table::from_bytes(b"kepid,a,b\n1,10,\n2,,5\n3,30,7\n4,40,9\n").unwrap();
        let schema = schema(&["a", "b"]);

        // row 1: a present, b missing -> median(5,7,9) = 7
        assert_eq!(from_lookup(&schema, &table, 1).unwrap().to_vec(), vec![10.0, 7.0]);
        // row 2: a missing -> median(10,30,40) = 30
        assert_eq!(from_lookup(&schema, &table, 2).unwrap().to_vec(), vec![30.0, 5.0]);
    }

    #[test]
    fn test_lookup_unknown_key() {
        let table = Table::from_bytes(b"kepid,a\n1,10\n").unwrap();
        let err = from_lookup(&schema(&["a"]), &table, 42).unwrap_err();
        assert!(matches!(err, ResolveError::KeyNotFound(42)));
    }

    #[test]
    fn test_lookup_table_without_schema_column() {
        let table = Table::from_bytes(b"kepid,a\n1,10\n").unwrap();
        let err = from_lookup(&schema(&["a", "z"]), &table, 1).unwrap_err();
        assert!(matches!(err, ResolveError::Table(TableError::UnknownColumn(_))));
    }

    #[test]
    fn test_batch_orders_columns_and_imputes() {
        let table = Table::from_bytes(b"id,b,a\nx,1,\ny,,4\nz,3,8\n").unwrap();
        let matrix = from_batch(&schema(&["a", "b"]), &table).unwrap();

        assert_eq!(matrix.shape(), &[3, 2]);
        assert_eq!(matrix.row(0).to_vec(), vec![6.0, 1.0]);
        assert_eq!(matrix.row(1).to_vec(), vec![4.0, 2.0]);
        assert_eq!(matrix.row(2).to_vec(), vec![8.0, 3.0]);
    }

    #[test]
    fn test_batch_missing_columns() {
        let table = Table::from_bytes(b"a\n1\n").unwrap();
        let err = from_batch(&schema(&["a", "b", "c"]), &table).unwrap_err();
        assert_eq!(err.to_string(), "Missing required columns: ['b', 'c'] (total 2)");
    }

    #[test]
    fn test_batch_all_missing_column_stays_nan() {
        let table = Table::from_bytes(b"a,b\n1,\n2,\n").unwrap();
        let matrix = from_batch(&schema(&["a", "b"]), &table).unwrap();
        assert!(matrix.column(1).iter().all(|v| v.is_nan()));
    }
}
