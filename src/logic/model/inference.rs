//! Inference Engine
//!
//! Turns a model-ordered matrix into one score per row. Read-only over the
//! loaded classifier, so one engine serves every request concurrently.

use ndarray::{Array1, Array2, Axis};
use thiserror::Error;

use crate::logic::features::FeatureSchema;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("feature matrix has {found} columns, model expects {expected}")]
    Shape { expected: usize, found: usize },

    #[error("feature names mismatch: expected {expected:?}, got {found:?}")]
    FeatureNames {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("classifier returned {found} scores for {expected} rows")]
    OutputLength { expected: usize, found: usize },
}

// ============================================================================
// NATIVE INPUT
// ============================================================================

/// Numeric matrix with its columns tagged by feature name
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    names: FeatureSchema,
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(names: FeatureSchema, values: Array2<f64>) -> Result<Self, InferenceError> {
        if values.ncols() != names.len() {
            return Err(InferenceError::Shape {
                expected: names.len(),
                found: values.ncols(),
            });
        }
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &FeatureSchema {
        &self.names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }
}

// ============================================================================
// INFERENCE ENGINE TRAIT
// ============================================================================

/// A binary classifier over tagged feature matrices
///
/// Scores are passed through as returned; nothing clamps them to [0, 1].
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;
    fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>, InferenceError>;
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct InferenceEngine {
    classifier: Box<dyn Classifier>,
    schema: FeatureSchema,
}

impl InferenceEngine {
    pub fn new(classifier: Box<dyn Classifier>, schema: FeatureSchema) -> Self {
        Self { classifier, schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// One score per row of `rows`
    pub fn score(&self, rows: Array2<f64>) -> Result<Vec<f64>, InferenceError> {
        let matrix = FeatureMatrix::new(self.schema.clone(), rows)?;
        let expected = matrix.n_rows();

        let scores = self.classifier.predict_proba(&matrix)?;
        if scores.len() != expected {
            return Err(InferenceError::OutputLength {
                expected,
                found: scores.len(),
            });
        }

        tracing::trace!(rows = expected, "Scored feature matrix");
        Ok(scores)
    }

    pub fn score_row(&self, row: Array1<f64>) -> Result<f64, InferenceError> {
        let scores = self.score(row.insert_axis(Axis(0)))?;
        Ok(scores[0])
    }
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("classifier", &self.classifier.name())
            .field("features", &self.schema.len())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
