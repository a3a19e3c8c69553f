//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. When routes or request
//! formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// GET /
    pub async fn get_status(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Status request failed")
    }

    /// GET /models
    pub async fn get_models(&self) -> Response {
        self.client
            .get(format!("{}/models", self.base_url))
            .send()
            .await
            .expect("Models request failed")
    }

    /// POST /predict?model=<model>
    pub async fn predict(&self, model: &str, payload: &Value) -> Response {
        self.client
            .post(format!("{}/predict", self.base_url))
            .query(&[("model", model)])
            .json(payload)
            .send()
            .await
            .expect("Predict request failed")
    }

    /// POST /predict without a model parameter
    pub async fn predict_without_model(&self, payload: &Value) -> Response {
        self.client
            .post(format!("{}/predict", self.base_url))
            .json(payload)
            .send()
            .await
            .expect("Predict request failed")
    }

    /// POST /predict with a raw, possibly malformed, JSON body
    pub async fn predict_raw(&self, model: &str, body: &str) -> Response {
        self.client
            .post(format!("{}/predict", self.base_url))
            .query(&[("model", model)])
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Predict request failed")
    }

    /// Predicts and returns the `prediction` string, panicking on non-200.
    pub async fn prediction(&self, model: &str, payload: &Value) -> String {
        let response = self.predict(model, payload).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Prediction for {} failed",
            model
        );
        let body: Value = response.json().await.expect("Invalid JSON response");
        body["prediction"]
            .as_str()
            .expect("Missing prediction")
            .to_string()
    }
}
