//! Error types for the prediction pipeline.

use std::path::PathBuf;
use thiserror::Error;

use super::ModelId;

/// Per-request errors returned by the dispatcher.
///
/// None of these are fatal: the server converts them into an error response
/// and keeps serving.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictionError {
    /// The model identifier is blank or not one of the known models.
    #[error("Invalid model specified, expected one of: model1, model2, model3, model4")]
    InvalidModel(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Anything that went wrong after the model was selected.
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),
}

impl PredictionError {
    /// True for errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PredictionError::InvalidModel(_) | PredictionError::MissingField(_)
        )
    }

    /// Short stable name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::InvalidModel(_) => "invalid_model",
            PredictionError::MissingField(_) => "missing_field",
            PredictionError::PredictionFailed(_) => "prediction_failed",
        }
    }
}

/// Lookup of an identifier that doesn't name any registered model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown model: {0:?}")]
pub struct UnknownModel(pub String);

impl From<UnknownModel> for PredictionError {
    fn from(value: UnknownModel) -> Self {
        PredictionError::InvalidModel(value.0)
    }
}

/// Errors raised by a loaded predictor or normalizer while serving.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictorError {
    #[error("expected {expected} features, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("predictor produced a non-finite value")]
    NonFiniteOutput,

    #[error("malformed tree: {0}")]
    MalformedTree(String),
}

impl From<PredictorError> for PredictionError {
    fn from(value: PredictorError) -> Self {
        PredictionError::PredictionFailed(value.to_string())
    }
}

/// A startup-time failure to load or validate an artifact.
///
/// The server refuses to start when any of these is returned.
#[derive(Debug, Error)]
pub enum ArtifactLoadFailure {
    #[error("artifact not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt artifact {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("artifacts for {model} are incompatible: {reason}")]
    Incompatible { model: ModelId, reason: String },

    #[error("no artifact registered for {0}")]
    NotRegistered(String),
}
