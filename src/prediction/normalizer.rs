use serde::Deserialize;
use std::path::Path;

use super::artifacts::read_json;
use super::error::{ArtifactLoadFailure, PredictorError};
use super::features::FeatureVector;

/// A fitted, frozen per-feature transform applied before inference.
pub trait Normalizer: Send + Sync {
    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PredictorError>;

    /// Number of features the transform was fitted on.
    fn dimension(&self) -> usize;
}

#[derive(Deserialize)]
struct StandardScalerFile {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// `(x - mean) / scale` per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// A zero scale (constant column at fit time) is replaced with 1 so the
    /// column passes through centered.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, String> {
        if mean.len() != scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                mean.len(),
                scale.len()
            ));
        }
        if mean.is_empty() {
            return Err("no features".to_owned());
        }
        if mean.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err("parameters must be finite".to_owned());
        }
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Ok(StandardScaler { mean, scale })
    }

    /// Loads `{"mean": [...], "scale": [...]}`.
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadFailure> {
        let file: StandardScalerFile = read_json(path)?;
        StandardScaler::new(file.mean, file.scale).map_err(|reason| ArtifactLoadFailure::Invalid {
            path: path.to_owned(),
            reason,
        })
    }
}

impl Normalizer for StandardScaler {
    fn transform(&self, features: &FeatureVector) -> Result<FeatureVector, PredictorError> {
        if features.len() != self.mean.len() {
            return Err(PredictorError::FeatureCountMismatch {
                expected: self.mean.len(),
                actual: features.len(),
            });
        }
        let scaled = features
            .as_slice()
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();
        Ok(FeatureVector::new(scaled))
    }

    fn dimension(&self) -> usize {
        self.mean.len()
    }
}
