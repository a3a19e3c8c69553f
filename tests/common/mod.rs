//! Common test infrastructure
//!
//! Everything an end-to-end test needs: a server loaded from a temporary
//! artifact directory and a client for its endpoints. Tests should only
//! import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{example_payload, TestClient, TestServer};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_predict_views() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.predict("model1", &example_payload()).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod fixtures;
mod server;

pub use client::TestClient;
pub use constants::*;
pub use fixtures::{example_payload, zero_payload};
pub use server::TestServer;

#[allow(unused_imports)]
pub(crate) use fixtures::create_test_artifacts;
