use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all engagement server metrics
const PREFIX: &str = "engagement";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Prediction Metrics
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_predictions_total"), "Predictions by model and outcome"),
        &["model", "outcome"]
    ).expect("Failed to create predictions_total metric");

    pub static ref PREDICTION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_prediction_duration_seconds"),
            "Time spent deriving features and running the model"
        )
        .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
        &["model"]
    ).expect("Failed to create prediction_duration_seconds metric");

    // Artifact Metrics
    pub static ref LOADED_ARTIFACTS: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_loaded_artifacts"), "Artifacts loaded at startup"),
        &["type"]
    ).expect("Failed to create loaded_artifacts metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Already registered is fine, tests call this repeatedly
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(PREDICTIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PREDICTION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(LOADED_ARTIFACTS.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Publish what the registry loaded.
pub fn init_artifact_metrics(models: usize, normalizers: usize, categories: usize) {
    LOADED_ARTIFACTS
        .with_label_values(&["model"])
        .set(models as f64);
    LOADED_ARTIFACTS
        .with_label_values(&["normalizer"])
        .set(normalizers as f64);
    LOADED_ARTIFACTS
        .with_label_values(&["category"])
        .set(categories as f64);

    tracing::info!(
        "Artifact metrics initialized: {} models, {} normalizers, {} categories",
        models,
        normalizers,
        categories
    );
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a prediction. `outcome` is `ok` or the error kind.
pub fn record_prediction(model: &str, outcome: &str, duration: Duration) {
    PREDICTIONS_TOTAL
        .with_label_values(&[model, outcome])
        .inc();

    PREDICTION_DURATION_SECONDS
        .with_label_values(&[model])
        .observe(duration.as_secs_f64());
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_family(name: &str) -> Option<prometheus::proto::MetricFamily> {
        REGISTRY
            .gather()
            .into_iter()
            .find(|m| m.get_name() == format!("{PREFIX}_{name}"))
    }

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        assert!(!REGISTRY.gather().is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_http_request() {
        init_metrics();
        record_http_request("POST", "/predict", 200, Duration::from_millis(5));
        assert!(find_family("http_requests_total").is_some());
    }

    #[test]
    fn test_record_prediction() {
        init_metrics();
        record_prediction("model1", "ok", Duration::from_micros(80));
        record_prediction("model1", "missing_field", Duration::from_micros(10));

        let counter = PREDICTIONS_TOTAL.with_label_values(&["model1", "ok"]);
        assert!(counter.get() >= 1.0);
        assert!(find_family("prediction_duration_seconds").is_some());
    }

    #[test]
    fn test_artifact_metrics() {
        init_metrics();
        init_artifact_metrics(4, 2, 8);
        assert_eq!(LOADED_ARTIFACTS.with_label_values(&["model"]).get(), 4.0);
        assert!(find_family("loaded_artifacts").is_some());
    }
}
