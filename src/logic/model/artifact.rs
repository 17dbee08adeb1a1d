//! Model Artifact - classifier plus its feature order
//!
//! Loaded once before the server binds; any failure here is fatal.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::booster::{BoosterError, TreeEnsemble};
use super::inference::{Classifier, InferenceEngine};
use crate::logic::features::{FeatureSchema, LayoutError};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model bundle not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read model bundle: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model bundle: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid feature list: {0}")]
    Layout(#[from] LayoutError),

    #[error("invalid model: {0}")]
    Booster(#[from] BoosterError),

    #[error("model was trained on different features than the bundle lists")]
    FeatureNames,
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// On-disk bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub features: Vec<String>,
    pub model: TreeEnsemble,
}

/// Model metadata
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub model_type: String,
    pub features: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ModelArtifact {
    engine: InferenceEngine,
    metadata: ModelMetadata,
}

impl ModelArtifact {
    /// Load and validate the bundle at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        tracing::info!("Loading model bundle from: {}", path.display());

        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path)?;
        let artifact = Self::from_json(&bytes, &path.display().to_string())?;

        tracing::info!(
            features = artifact.metadata.features,
            model_type = %artifact.metadata.model_type,
            "Model bundle loaded"
        );
        Ok(artifact)
    }

    pub fn from_json(bytes: &[u8], source: &str) -> Result<Self, ModelError> {
        let bundle: ModelBundle = serde_json::from_slice(bytes)?;
        Self::from_bundle(bundle, source)
    }

    pub fn from_bundle(bundle: ModelBundle, source: &str) -> Result<Self, ModelError> {
        let schema = FeatureSchema::new(bundle.features)?;
        bundle.model.validate(schema.len())?;

        if let Some(names) = &bundle.model.feature_names {
            if names.as_slice() != schema.names() {
                return Err(ModelError::FeatureNames);
            }
        }

        Ok(Self::from_parts(Box::new(bundle.model), schema, source))
    }

    /// Wrap any classifier; used for alternative model types
    pub fn from_parts(classifier: Box<dyn Classifier>, schema: FeatureSchema, source: &str) -> Self {
        let metadata = ModelMetadata {
            model_path: source.to_string(),
            model_type: classifier.name().to_string(),
            features: schema.len(),
            loaded_at: Utc::now(),
        };

        Self {
            engine: InferenceEngine::new(classifier, schema),
            metadata,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.engine.schema()
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    const BUNDLE: &str = r#"{
        "features": ["koi_period", "koi_depth"],
        "model": {
            "objective": "binary:logistic",
            "base_score": 0.5,
            "trees": [{"nodes": [
                {"split": {"feature": 1, "threshold": 100.0, "left": 1, "right": 2}},
                {"leaf": {"value": -2.0}},
                {"leaf": {"value": 2.0}}
            ]}]
        }
    }"#;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUNDLE.as_bytes()).unwrap();

        let artifact = ModelArtifact::load(file.path()).unwrap();
        assert_eq!(artifact.schema().names(), &["koi_period".to_string(), "koi_depth".to_string()]);
        assert_eq!(artifact.metadata().model_type, "binary:logistic");
        assert_eq!(artifact.metadata().features, 2);

        let p = artifact.engine().score_row(array![1.0, 500.0]).unwrap();
        assert!(p > 0.5 && p < 1.0);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = ModelArtifact::load("/nonexistent/exoplanet_xgb.json").unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_corrupt_bundle() {
        let err = ModelArtifact::from_json(b"{not json", "test").unwrap_err();
        assert!(matches!(err, ModelError::Parse(_)));
    }

    #[test]
    fn test_empty_feature_list() {
        let json = r#"{"features": [], "model": {"trees": []}}"#;
        let err = ModelArtifact::from_json(json.as_bytes(), "test").unwrap_err();
        assert!(matches!(err, ModelError::Layout(LayoutError::Empty)));
    }

    #[test]
    fn test_split_outside_schema() {
        let json = BUNDLE.replace(r#""features": ["koi_period", "koi_depth"]"#, r#""features": ["koi_period"]"#);
        let err = ModelArtifact::from_json(json.as_bytes(), "test").unwrap_err();
        assert!(matches!(err, ModelError::Booster(BoosterError::FeatureOutOfRange { .. })));
    }

    #[test]
    fn test_model_feature_names_must_match() {
        let json = r#"{
            "features": ["a", "b"],
            "model": {"feature_names": ["b", "a"], "trees": []}
        }"#;
        let err = ModelArtifact::from_json(json.as_bytes(), "test").unwrap_err();
        assert!(matches!(err, ModelError::FeatureNames));
    }
}
