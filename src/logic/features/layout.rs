//! Feature Layout - the model's column order
//!
//! The schema comes from the model bundle, not from code: whatever order the
//! classifier was trained on is the order every row must be assembled in.
//!
//! ## Rules
//! 1. Non-empty
//! 2. No duplicate names
//! 3. Never reordered after load

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("feature list is empty")]
    Empty,

    #[error("duplicate feature name: {0}")]
    Duplicate(String),
}

// ============================================================================
// FEATURE SCHEMA
// ============================================================================

/// Ordered feature names expected by the classifier
///
/// Cheap to clone; the name list is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Arc<[String]>,
}

impl Serialize for FeatureSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names.iter())
    }
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Result<Self, LayoutError> {
        if names.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(LayoutError::Duplicate(name.clone()));
            }
        }

        Ok(Self { names: names.into() })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed schema
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Schema names for which `present` returns false, in schema order
    pub fn missing_from<F>(&self, present: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.iter()
            .filter(|name| !present(name))
            .map(str::to_string)
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_schema_keeps_order() {
        let schema = FeatureSchema::new(names(&["koi_period", "koi_depth", "koi_prad"])).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.names(), &names(&["koi_period", "koi_depth", "koi_prad"])[..]);
    }

    #[test]
    fn test_schema_rejects_empty() {
        assert_eq!(FeatureSchema::new(vec![]), Err(LayoutError::Empty));
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = FeatureSchema::new(names(&["a", "b", "a"])).unwrap_err();
        assert_eq!(err, LayoutError::Duplicate("a".to_string()));
    }

    #[test]
    fn test_missing_from_preserves_schema_order() {
        let schema = FeatureSchema::new(names(&["a", "b", "c", "d"])).unwrap();
        let missing = schema.missing_from(|name| name == "b");
        assert_eq!(missing, names(&["a", "c", "d"]));
    }

    #[test]
    fn test_serializes_as_list() {
        let schema = FeatureSchema::new(names(&["x", "y"])).unwrap();
        assert_eq!(serde_json::to_value(&schema).unwrap(), serde_json::json!(["x", "y"]));
    }
}
