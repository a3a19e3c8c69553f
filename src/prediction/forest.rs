//! Tree-ensemble predictors loaded from JSON.
//!
//! A forest artifact looks like:
//!
//! ```json
//! {
//!   "kind": "classifier",
//!   "n_features": 8,
//!   "classes": ["high", "low", "medium"],
//!   "trees": [
//!     {"nodes": [
//!       {"feature": 3, "threshold": 100000.0, "left": 1, "right": 2},
//!       {"value": [0.0, 12.0, 3.0]},
//!       {"value": [9.0, 0.0, 1.0]}
//!     ]}
//!   ]
//! }
//! ```
//!
//! Split nodes send a sample left when `x[feature] <= threshold`. Children
//! always come after their parent in the node list, which makes every walk
//! terminate. Regressor leaves hold a single value, classifier leaves hold
//! one weight per class.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use super::artifacts::read_json;
use super::error::{ArtifactLoadFailure, PredictorError};

/// Raw output of a predictor, before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Value(f64),
    Label(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorKind {
    Regressor,
    Classifier,
}

/// A trained model, opaque to the pipeline beyond `predict`.
pub trait Predictor: Send + Sync {
    fn kind(&self) -> PredictorKind;

    /// Number of features the model was trained on.
    fn n_features(&self) -> usize;

    fn predict(&self, features: &[f64]) -> Result<Prediction, PredictorError>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Tree { nodes }
    }

    fn validate(&self, n_features: usize, leaf_width: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_owned());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {index} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {index} has a non-finite threshold"));
                    }
                    for child in [left, right] {
                        if *child <= index || *child >= self.nodes.len() {
                            return Err(format!("node {index} has invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(format!(
                            "leaf {index} has {} values, expected {leaf_width}",
                            value.len()
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite()) {
                        return Err(format!("leaf {index} has a non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf(&self, features: &[f64]) -> Result<&[f64], PredictorError> {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf { value }) => return Ok(value),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).ok_or_else(|| {
                        PredictorError::MalformedTree(format!("feature {feature} out of range"))
                    })?;
                    index = if *x <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(PredictorError::MalformedTree(format!(
                        "node {index} does not exist"
                    )))
                }
            }
        }
    }
}

fn check_width(expected: usize, features: &[f64]) -> Result<(), PredictorError> {
    if features.len() != expected {
        return Err(PredictorError::FeatureCountMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Averages the leaf values of its trees.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    n_features: usize,
    trees: Vec<Tree>,
}

impl RandomForestRegressor {
    pub fn new(n_features: usize, trees: Vec<Tree>) -> Result<Self, String> {
        if trees.is_empty() {
            return Err("forest has no trees".to_owned());
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features, 1)
                .map_err(|reason| format!("tree {i}: {reason}"))?;
        }
        Ok(RandomForestRegressor { n_features, trees })
    }
}

impl Predictor for RandomForestRegressor {
    fn kind(&self) -> PredictorKind {
        PredictorKind::Regressor
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<Prediction, PredictorError> {
        check_width(self.n_features, features)?;
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.leaf(features)?[0];
        }
        let mean = sum / self.trees.len() as f64;
        if !mean.is_finite() {
            return Err(PredictorError::NonFiniteOutput);
        }
        Ok(Prediction::Value(mean))
    }
}

/// Soft voting: each tree contributes its leaf's class distribution, the
/// label with the highest total wins and ties go to the earlier class.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    n_features: usize,
    classes: Vec<String>,
    trees: Vec<Tree>,
}

impl RandomForestClassifier {
    pub fn new(n_features: usize, classes: Vec<String>, trees: Vec<Tree>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("classifier has no classes".to_owned());
        }
        if trees.is_empty() {
            return Err("forest has no trees".to_owned());
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features, classes.len())
                .map_err(|reason| format!("tree {i}: {reason}"))?;
            let negative = tree
                .nodes
                .iter()
                .any(|n| matches!(n, Node::Leaf { value } if value.iter().any(|v| *v < 0.0)));
            if negative {
                return Err(format!("tree {i}: negative class weight"));
            }
        }
        Ok(RandomForestClassifier {
            n_features,
            classes,
            trees,
        })
    }

    /// Averaged class probabilities, in class order.
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, PredictorError> {
        check_width(self.n_features, features)?;
        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf(features)?;
            let weight: f64 = leaf.iter().sum();
            if weight > 0.0 {
                for (total, v) in totals.iter_mut().zip(leaf) {
                    *total += v / weight;
                }
            }
        }
        let n = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n).collect())
    }
}

impl Predictor for RandomForestClassifier {
    fn kind(&self) -> PredictorKind {
        PredictorKind::Classifier
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<Prediction, PredictorError> {
        let proba = self.predict_proba(features)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(Prediction::Label(self.classes[best].clone()))
    }
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ForestFile {
    Regressor {
        n_features: usize,
        trees: Vec<Tree>,
    },
    Classifier {
        n_features: usize,
        classes: Vec<String>,
        trees: Vec<Tree>,
    },
}

/// Loads a regressor or classifier forest, whichever the file declares.
pub fn load_predictor(path: &Path) -> Result<Arc<dyn Predictor>, ArtifactLoadFailure> {
    let invalid = |reason: String| ArtifactLoadFailure::Invalid {
        path: path.to_owned(),
        reason,
    };
    let predictor: Arc<dyn Predictor> = match read_json::<ForestFile>(path)? {
        ForestFile::Regressor { n_features, trees } => {
            Arc::new(RandomForestRegressor::new(n_features, trees).map_err(invalid)?)
        }
        ForestFile::Classifier {
            n_features,
            classes,
            trees,
        } => Arc::new(RandomForestClassifier::new(n_features, classes, trees).map_err(invalid)?),
    };
    Ok(predictor)
}
