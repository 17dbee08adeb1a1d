//! Gradient-boosted tree ensemble
//!
//! Flat node arrays, XGBoost split semantics:
//! - go left when `value < threshold`
//! - a missing (NaN) value follows `default_left`
//! - margin = base margin + sum of reached leaves
//!
//! ```json
//! {
//!   "objective": "binary:logistic",
//!   "base_score": 0.5,
//!   "trees": [
//!     {"nodes": [
//!       {"split": {"feature": 0, "threshold": 3.5, "left": 1, "right": 2, "default_left": true}},
//!       {"leaf": {"value": -0.4}},
//!       {"leaf": {"value": 0.6}}
//!     ]}
//!   ]
//! }
//! ```

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::inference::{Classifier, FeatureMatrix, InferenceError};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum BoosterError {
    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },

    #[error("tree {tree} node {node} splits on column {feature}, model has {columns}")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: usize,
        columns: usize,
    },

    #[error("tree {tree} node {node} has invalid child {child}")]
    BadChild { tree: usize, node: usize, child: usize },

    #[error("base_score {0} must lie strictly between 0 and 1")]
    BaseScore(f64),
}

// ============================================================================
// MODEL TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Objective {
    /// Sigmoid of the margin
    #[default]
    #[serde(rename = "binary:logistic")]
    BinaryLogistic,

    /// Raw margin, untransformed
    #[serde(rename = "binary:logitraw")]
    BinaryLogitRaw,
}

impl Objective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::BinaryLogistic => "binary:logistic",
            Objective::BinaryLogitRaw => "binary:logitraw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "default_left")]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

fn default_left() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Leaf value reached by `row`. Assumes a validated tree.
    pub fn leaf_value(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right, default_left } => {
                    let x = row[*feature];
                    idx = if x.is_nan() {
                        if *default_left { *left } else { *right }
                    } else if x < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Children must point forward, so traversal always terminates.
    fn validate(&self, tree: usize, columns: usize) -> Result<(), BoosterError> {
        if self.nodes.is_empty() {
            return Err(BoosterError::EmptyTree { tree });
        }

        for (node, n) in self.nodes.iter().enumerate() {
            if let Node::Split { feature, left, right, .. } = n {
                if *feature >= columns {
                    return Err(BoosterError::FeatureOutOfRange {
                        tree,
                        node,
                        feature: *feature,
                        columns,
                    });
                }
                for &child in [left, right] {
                    if child <= node || child >= self.nodes.len() {
                        return Err(BoosterError::BadChild { tree, node, child });
                    }
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub objective: Objective,

    /// Probability prior for `binary:logistic`, raw margin for `binary:logitraw`
    #[serde(default = "default_base_score")]
    pub base_score: f64,

    /// Column names the trees were trained on, if recorded
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,

    pub trees: Vec<Tree>,
}

fn default_base_score() -> f64 {
    0.5
}

impl TreeEnsemble {
    pub fn validate(&self, columns: usize) -> Result<(), BoosterError> {
        if self.objective == Objective::BinaryLogistic
            && !(self.base_score > 0.0 && self.base_score < 1.0)
        {
            return Err(BoosterError::BaseScore(self.base_score));
        }

        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(i, tree)| tree.validate(i, columns))
    }

    fn base_margin(&self) -> f64 {
        match self.objective {
            Objective::BinaryLogistic => (self.base_score / (1.0 - self.base_score)).ln(),
            Objective::BinaryLogitRaw => self.base_score,
        }
    }

    pub fn margin(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.base_margin() + self.trees.iter().map(|t| t.leaf_value(row)).sum::<f64>()
    }

    fn transform(&self, margin: f64) -> f64 {
        match self.objective {
            Objective::BinaryLogistic => 1.0 / (1.0 + (-margin).exp()),
            Objective::BinaryLogitRaw => margin,
        }
    }
}

impl Classifier for TreeEnsemble {
    fn name(&self) -> &str {
        self.objective.as_str()
    }

    fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>, InferenceError> {
        if let Some(expected) = &self.feature_names {
            if expected.as_slice() != matrix.names().names() {
                return Err(InferenceError::FeatureNames {
                    expected: expected.clone(),
                    found: matrix.names().names().to_vec(),
                });
            }
        }

        Ok(matrix
            .values()
            .rows()
            .into_iter()
            .map(|row| self.transform(self.margin(row)))
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn stump(feature: usize, threshold: f64, lo: f64, hi: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split { feature, threshold, left: 1, right: 2, default_left: false },
                Node::Leaf { value: lo },
                Node::Leaf { value: hi },
            ],
        }
    }

    fn ensemble(objective: Objective, trees: Vec<Tree>) -> TreeEnsemble {
        TreeEnsemble { objective, base_score: 0.5, feature_names: None, trees }
    }

    #[test]
    fn test_split_direction() {
        let tree = stump(0, 3.0, -1.0, 1.0);
        assert_eq!(tree.leaf_value(array![2.9].view()), -1.0);
        assert_eq!(tree.leaf_value(array![3.0].view()), 1.0);
    }

    #[test]
    fn test_missing_follows_default() {
        let mut tree = stump(0, 3.0, -1.0, 1.0);
        assert_eq!(tree.leaf_value(array![f64::NAN].view()), 1.0);

        if let Node::Split { default_left, .. } = &mut tree.nodes[0] {
            *default_left = true;
        }
        assert_eq!(tree.leaf_value(array![f64::NAN].view()), -1.0);
    }

    #[test]
    fn test_margin_sums_trees() {
        let model = ensemble(
            Objective::BinaryLogitRaw,
            vec![stump(0, 1.0, -2.0, 2.0), stump(1, 5.0, 0.5, -0.5)],
        );
        // base 0.5 + 2.0 + 0.5
        assert_eq!(model.margin(array![3.0, 1.0].view()), 3.0);
    }

    #[test]
    fn test_logistic_output_in_unit_interval() {
        let model = ensemble(Objective::BinaryLogistic, vec![stump(0, 1.0, -30.0, 30.0)]);
        let lo = model.transform(model.margin(array![0.0].view()));
        let hi = model.transform(model.margin(array![2.0].view()));
        assert!(lo > 0.0 && lo < 0.01);
        assert!(hi < 1.0 && hi > 0.99);
    }

    #[test]
    fn test_base_score_half_is_zero_margin() {
        let model = ensemble(Objective::BinaryLogistic, vec![]);
        assert_eq!(model.margin(array![1.0].view()), 0.0);
        assert_eq!(model.transform(0.0), 0.5);
    }

    #[test]
    fn test_validate_feature_range() {
        let model = ensemble(Objective::BinaryLogistic, vec![stump(4, 1.0, 0.0, 0.0)]);
        assert!(matches!(
            model.validate(2),
            Err(BoosterError::FeatureOutOfRange { feature: 4, columns: 2, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let tree = Tree {
            nodes: vec![
                Node::Split { feature: 0, threshold: 1.0, left: 0, right: 1, default_left: true },
                Node::Leaf { value: 0.0 },
            ],
        };
        let model = ensemble(Objective::BinaryLogistic, vec![tree]);
        assert_eq!(
            model.validate(1),
            Err(BoosterError::BadChild { tree: 0, node: 0, child: 0 })
        );
    }

    #[test]
    fn test_validate_base_score() {
        let mut model = ensemble(Objective::BinaryLogistic, vec![]);
        model.base_score = 1.0;
        assert_eq!(model.validate(1), Err(BoosterError::BaseScore(1.0)));
    }

    #[test]
    fn test_node_json_shape() {
        let json = r#"{"trees":[{"nodes":[
            {"split":{"feature":0,"threshold":2.5,"left":1,"right":2}},
            {"leaf":{"value":-1.0}},
            {"leaf":{"value":1.0}}
        ]}]}"#;
        let model: TreeEnsemble = serde_json::from_str(json).unwrap();
        assert_eq!(model.objective, Objective::BinaryLogistic);
        assert_eq!(model.base_score, 0.5);
        assert!(matches!(model.trees[0].nodes[0], Node::Split { default_left: true, .. }));
    }
}
