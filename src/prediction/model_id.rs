use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::error::UnknownModel;
use super::features::{FeatureName, MODEL1_SCHEMA, MODEL2_SCHEMA, MODEL3_SCHEMA, MODEL4_SCHEMA};

/// The four served models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelId {
    /// View-count regression.
    Model1,
    /// Subscriber-count regression.
    Model2,
    /// Three-class popularity classifier.
    Model3,
    /// Binary trending-status classifier.
    Model4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTask {
    Regression,
    Classification,
}

impl ModelId {
    pub const ALL: [ModelId; 4] = [
        ModelId::Model1,
        ModelId::Model2,
        ModelId::Model3,
        ModelId::Model4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Model1 => "model1",
            ModelId::Model2 => "model2",
            ModelId::Model3 => "model3",
            ModelId::Model4 => "model4",
        }
    }

    pub fn task(&self) -> ModelTask {
        match self {
            ModelId::Model1 | ModelId::Model2 => ModelTask::Regression,
            ModelId::Model3 | ModelId::Model4 => ModelTask::Classification,
        }
    }

    /// Prefix used when formatting the prediction, e.g. `Views: 1234`.
    pub fn output_label(&self) -> &'static str {
        match self {
            ModelId::Model1 => "Views",
            ModelId::Model2 => "Subscribers",
            ModelId::Model3 => "Class",
            ModelId::Model4 => "Status",
        }
    }

    /// Only the two regressors were trained on scaled inputs.
    pub fn requires_normalization(&self) -> bool {
        matches!(self, ModelId::Model1 | ModelId::Model2)
    }

    /// The ordered feature list the model was trained on.
    pub fn schema(&self) -> &'static [FeatureName] {
        match self {
            ModelId::Model1 => MODEL1_SCHEMA,
            ModelId::Model2 => MODEL2_SCHEMA,
            ModelId::Model3 => MODEL3_SCHEMA,
            ModelId::Model4 => MODEL4_SCHEMA,
        }
    }

    pub fn predictor_file_name(&self) -> &'static str {
        match self {
            ModelId::Model1 => "model1_view_count.json",
            ModelId::Model2 => "model2_subscribers.json",
            ModelId::Model3 => "model3_popularity_class.json",
            ModelId::Model4 => "model4_trending_status.json",
        }
    }

    pub fn normalizer_file_name(&self) -> Option<&'static str> {
        match self {
            ModelId::Model1 => Some("scaler_model1.json"),
            ModelId::Model2 => Some("scaler_model2.json"),
            ModelId::Model3 | ModelId::Model4 => None,
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = UnknownModel;

    /// Identifiers are matched exactly, `Model1` or ` model1` are unknown.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownModel(s.to_owned()))
    }
}
