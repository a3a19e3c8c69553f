//! Feature derivation and model dispatch for the engagement models.

mod artifacts;
pub mod dispatcher;
pub mod encoder;
pub mod error;
pub mod features;
pub mod forest;
pub mod model_id;
pub mod normalizer;
pub mod raw;
pub mod registry;

pub use dispatcher::{PredictionDispatcher, PredictionResult, PredictionValue};
pub use error::{ArtifactLoadFailure, PredictionError};
pub use model_id::ModelId;
pub use raw::RawVideoMetrics;
pub use registry::{LoadOptions, ModelRegistry};
