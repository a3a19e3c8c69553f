use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::metrics::{metrics_handler, record_prediction};
use super::{log_requests, state::*, ServerConfig};
use crate::prediction::features::FeatureName;
use crate::prediction::model_id::ModelTask;
use crate::prediction::{ModelId, PredictionError};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub started_at: String,
    pub version: String,
    pub models: Vec<ModelId>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize)]
struct ModelInfo {
    id: ModelId,
    task: ModelTask,
    output_label: &'static str,
    normalized: bool,
    features: Vec<&'static str>,
}

#[derive(Deserialize, Debug)]
struct PredictQuery {
    model: Option<String>,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        started_at: state.started_at.to_rfc3339(),
        version: state.version.clone(),
        models: state
            .dispatcher
            .registry()
            .entries()
            .map(|entry| entry.id())
            .collect(),
    };
    Json(stats)
}

async fn get_models(State(dispatcher): State<GuardedDispatcher>) -> impl IntoResponse {
    let models: Vec<ModelInfo> = dispatcher
        .registry()
        .entries()
        .map(|entry| ModelInfo {
            id: entry.id(),
            task: entry.id().task(),
            output_label: entry.id().output_label(),
            normalized: entry.normalizer().is_some(),
            features: entry.schema().iter().map(FeatureName::as_str).collect(),
        })
        .collect();
    Json(models)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for PredictionError {
    fn into_response(self) -> Response {
        match &self {
            PredictionError::PredictionFailed(cause) => {
                error!("Prediction failed: {}", cause);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed")
            }
            _ => {
                debug!("Rejected prediction request: {}", self);
                error_response(StatusCode::BAD_REQUEST, self.to_string())
            }
        }
    }
}

async fn predict(
    State(dispatcher): State<GuardedDispatcher>,
    Query(query): Query<PredictQuery>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let model_id = query.model.as_deref();

    // The model is checked before the body so an unknown model is reported
    // even when the body is unreadable.
    let model = match dispatcher.registry().get(model_id.unwrap_or_default()) {
        Ok(entry) => entry.id(),
        Err(unknown) => {
            let err = PredictionError::from(unknown);
            record_prediction("invalid", err.kind(), start.elapsed());
            return err.into_response();
        }
    };

    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected {} request body: {}", model, rejection.body_text());
            record_prediction(model.as_str(), "invalid_body", start.elapsed());
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON body: {}", rejection.body_text()),
            );
        }
    };

    let result = dispatcher.predict_json(Some(model.as_str()), &payload);
    match result {
        Ok(prediction) => {
            record_prediction(model.as_str(), "ok", start.elapsed());
            Json(json!({ "prediction": prediction.to_string() })).into_response()
        }
        Err(err) => {
            record_prediction(model.as_str(), err.kind(), start.elapsed());
            err.into_response()
        }
    }
}

pub fn make_app(config: ServerConfig, dispatcher: GuardedDispatcher) -> Router {
    let state = ServerState::new(config, dispatcher);

    Router::new()
        .route("/", get(home))
        .route("/models", get(get_models))
        .route("/predict", post(predict))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(dispatcher: GuardedDispatcher, config: ServerConfig) -> Result<()> {
    let address = format!("{}:{}", config.bind_address, config.port);
    let metrics_address = format!("{}:{}", config.bind_address, config.metrics_port);

    let app = make_app(config, dispatcher);
    let metrics_app = make_metrics_app();

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_address)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", metrics_address))?;
    info!("Listening on {}, metrics on {}", address, metrics_address);

    tokio::select! {
        result = axum::serve(listener, app) => result.context("HTTP server failed"),
        result = axum::serve(metrics_listener, metrics_app) => result.context("Metrics server failed"),
    }
}
