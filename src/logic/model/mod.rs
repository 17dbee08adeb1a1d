//! Model Module - artifact loading and inference
//!
//! The artifact is immutable after load; share it behind an `Arc`.

pub mod artifact;
pub mod booster;
pub mod inference;
pub mod threshold;

// Re-export common types
pub use artifact::{ModelArtifact, ModelBundle, ModelError, ModelMetadata};
pub use booster::{Node, Objective, Tree, TreeEnsemble};
pub use inference::{Classifier, FeatureMatrix, InferenceEngine, InferenceError};
pub use threshold::{Decision, Verdict, DECISION_THRESHOLD};
