//! Engagement prediction server library
//!
//! Exposes the prediction pipeline and the HTTP server for the binaries and
//! for integration tests.

pub mod config;
pub mod prediction;
pub mod server;

pub use prediction::{ModelId, ModelRegistry, PredictionDispatcher};
pub use server::{run_server, RequestsLoggingLevel};
