use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::prediction::PredictionDispatcher;

use super::ServerConfig;

pub type GuardedDispatcher = Arc<PredictionDispatcher>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
    pub dispatcher: GuardedDispatcher,
    pub version: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, dispatcher: GuardedDispatcher) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            started_at: Utc::now(),
            dispatcher,
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedDispatcher {
    fn from_ref(input: &ServerState) -> Self {
        input.dispatcher.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
