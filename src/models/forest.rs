//! Anomaly oracle contract and the fitted isolation-forest implementation.
//!
//! The scoring engine only depends on the [`AnomalyDetector`] trait; any
//! conforming decision function can stand in for the forest. The
//! [`IsolationForest`] here evaluates an artifact exported by the offline
//! trainer with scikit-learn-compatible semantics, so a forest fitted
//! offline and this evaluator agree on every label.

use serde::Deserialize;
use thiserror::Error;

/// Euler-Mascheroni constant, used in the average path length estimate.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Oracle invocation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("feature vector has {got} values, model expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("malformed forest artifact: {0}")]
    Malformed(String),
}

/// Raw oracle label, following the fitted convention: -1 is anomalous,
/// 1 is normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Anomalous,
    Normal,
}

/// One oracle decision: the binary label plus the raw decision-function
/// value it was derived from (negative for anomalous inputs).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub label: Label,
    pub score: f64,
}

/// An already-fitted decision function distinguishing unusual feature
/// vectors from typical ones.
pub trait AnomalyDetector: Send + Sync {
    /// Decide whether a normalized feature vector is anomalous.
    fn decide(&self, features: &[f64]) -> Result<Decision, OracleError>;

    /// Number of features the detector was fitted for.
    fn feature_count(&self) -> usize;

    /// Short name for logs and health replies.
    fn name(&self) -> &str;
}

/// One node of an isolation tree, in the flat layout the trainer exports.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        samples: u32,
    },
}

/// A single isolation tree. Node 0 is the root.
#[derive(Debug, Clone, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<TreeNode>,
}

impl IsolationTree {
    /// Path length of a point: root-to-leaf hops plus the average-path
    /// correction for the samples that ended up in the leaf.
    fn path_length(&self, features: &[f64]) -> Result<f64, OracleError> {
        let mut node = 0usize;
        let mut depth = 0.0;

        // A walk longer than the node count means the artifact has a cycle.
        for _ in 0..=self.nodes.len() {
            let current = self.nodes.get(node).ok_or_else(|| {
                OracleError::Malformed(format!("node index {node} out of range"))
            })?;

            match current {
                TreeNode::Leaf { samples } => {
                    return Ok(depth + average_path_length(*samples));
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).ok_or_else(|| {
                        OracleError::Malformed(format!("split on unknown feature {feature}"))
                    })?;
                    node = if *value <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }

        Err(OracleError::Malformed("cyclic tree".to_string()))
    }
}

/// Fitted isolation forest, loaded once at startup from the trainer's
/// JSON export and immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct IsolationForest {
    /// Feature layout version the forest was fitted against.
    pub schema_version: u32,
    /// Feature names in fitted order.
    pub feature_names: Vec<String>,
    /// Subsample size used per tree during fitting.
    pub sample_size: u32,
    /// Decision offset (scikit-learn `offset_`).
    pub offset: f64,
    pub trees: Vec<IsolationTree>,
}

impl IsolationForest {
    /// Structural validation, run once at load time. `decide` assumes a
    /// forest that passed this check.
    pub fn validate(&self) -> Result<(), OracleError> {
        if self.trees.is_empty() {
            return Err(OracleError::Malformed("forest has no trees".to_string()));
        }
        if self.sample_size < 2 {
            return Err(OracleError::Malformed(format!(
                "sample_size {} is too small",
                self.sample_size
            )));
        }
        if !self.offset.is_finite() {
            return Err(OracleError::Malformed("offset is not finite".to_string()));
        }

        let n_features = self.feature_names.len();
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(OracleError::Malformed(format!("tree {t} has no nodes")));
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                if let TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    if *feature >= n_features {
                        return Err(OracleError::Malformed(format!(
                            "tree {t} node {n} splits on feature {feature}, forest has {n_features}"
                        )));
                    }
                    if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                        return Err(OracleError::Malformed(format!(
                            "tree {t} node {n} references a child out of range"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Anomaly score s(x) = 2^(-E[h(x)] / c(psi)), in (0, 1]. Higher
    /// means more isolated, i.e. more anomalous.
    fn anomaly_score(&self, features: &[f64]) -> Result<f64, OracleError> {
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.path_length(features)?;
        }
        let mean_path = total / self.trees.len() as f64;

        Ok(2_f64.powf(-mean_path / average_path_length(self.sample_size)))
    }
}

impl AnomalyDetector for IsolationForest {
    fn decide(&self, features: &[f64]) -> Result<Decision, OracleError> {
        if features.len() != self.feature_names.len() {
            return Err(OracleError::DimensionMismatch {
                expected: self.feature_names.len(),
                got: features.len(),
            });
        }

        // decision_function(x) = -s(x) - offset; negative means anomalous,
        // matching the fitted convention (predict == -1).
        let score = -self.anomaly_score(features)? - self.offset;
        let label = if score < 0.0 {
            Label::Anomalous
        } else {
            Label::Normal
        };

        Ok(Decision { label, score })
    }

    fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    fn name(&self) -> &str {
        "isolation_forest"
    }
}

/// Average path length of an unsuccessful BST search in a tree of n
/// points: c(n) = 2 H(n-1) - 2 (n-1)/n, with c(0) = c(1) = 0.
fn average_path_length(n: u32) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let h = (n - 1) as f64;
            2.0 * (h.ln() + EULER_GAMMA) - 2.0 * h / n as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-tree fixture: each tree isolates points that deviate far from
    /// the fitted mean on one feature after one split, and sinks everything
    /// else into a deep, well-populated leaf.
    fn fixture_forest() -> IsolationForest {
        let tree_on = |feature: usize| IsolationTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold: 2.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { samples: 200 },
                TreeNode::Leaf { samples: 1 },
            ],
        };

        IsolationForest {
            schema_version: crate::feature_extractor::SCHEMA_VERSION,
            feature_names: crate::feature_extractor::FEATURE_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            sample_size: 256,
            offset: -0.5,
            trees: vec![tree_on(0), tree_on(4)],
        }
    }

    #[test]
    fn test_average_path_length_small_values() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(256) per the closed form.
        assert!((average_path_length(256) - 10.244).abs() < 0.01);
    }

    #[test]
    fn test_outlier_labelled_anomalous() {
        let forest = fixture_forest();

        // Large deviations on amount and amount_deviation.
        let decision = forest
            .decide(&[31.3, -2.6, 1.0, -1.9, 15.0, 6.0])
            .unwrap();

        assert_eq!(decision.label, Label::Anomalous);
        assert!(decision.score < 0.0);
    }

    #[test]
    fn test_near_mean_point_labelled_normal() {
        let forest = fixture_forest();

        let decision = forest
            .decide(&[0.0, -0.2, -0.5, 0.0, 0.0, 0.0])
            .unwrap();

        assert_eq!(decision.label, Label::Normal);
        assert!(decision.score >= 0.0);
    }

    #[test]
    fn test_outliers_score_below_inliers() {
        let forest = fixture_forest();

        let outlier = forest.decide(&[31.3, 0.0, 0.0, 0.0, 15.0, 0.0]).unwrap();
        let inlier = forest.decide(&[0.1, 0.0, 0.0, 0.0, 0.2, 0.0]).unwrap();

        assert!(outlier.score < inlier.score);
    }

    #[test]
    fn test_dimension_mismatch() {
        let forest = fixture_forest();

        let err = forest.decide(&[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            OracleError::DimensionMismatch {
                expected: 6,
                got: 2
            }
        );
    }

    #[test]
    fn test_validate_accepts_fixture() {
        assert!(fixture_forest().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_forest() {
        let mut forest = fixture_forest();
        forest.trees.clear();

        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_split() {
        let mut forest = fixture_forest();
        forest.trees[0].nodes[0] = TreeNode::Split {
            feature: 99,
            threshold: 0.0,
            left: 1,
            right: 2,
        };

        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_cyclic_tree_detected() {
        let mut forest = fixture_forest();
        // Root points back at itself on both branches.
        forest.trees[0].nodes[0] = TreeNode::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
        };

        let err = forest.decide(&[0.0; 6]).unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    #[test]
    fn test_artifact_deserialization() {
        let raw = r#"{
            "schema_version": 1,
            "feature_names": ["amount", "hour", "category", "merchant_freq", "amount_deviation", "velocity"],
            "sample_size": 256,
            "offset": -0.5,
            "trees": [
                {"nodes": [
                    {"kind": "split", "feature": 0, "threshold": 2.0, "left": 1, "right": 2},
                    {"kind": "leaf", "samples": 200},
                    {"kind": "leaf", "samples": 1}
                ]}
            ]
        }"#;

        let forest: IsolationForest = serde_json::from_str(raw).unwrap();

        assert!(forest.validate().is_ok());
        assert_eq!(forest.trees.len(), 1);
        assert_eq!(forest.feature_count(), 6);
    }
}
