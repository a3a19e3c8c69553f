use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::error::PredictionError;
use super::features::FeatureDerivationEngine;
use super::forest::Prediction;
use super::raw::RawVideoMetrics;
use super::registry::ModelRegistry;
use super::ModelId;

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionValue {
    /// Regressor output rounded to the nearest integer.
    Count(i64),
    /// Classifier label, verbatim.
    Label(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub model: ModelId,
    pub value: PredictionValue,
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            PredictionValue::Count(n) => {
                write!(f, "{}: {}", self.model.output_label(), group_thousands(*n))
            }
            PredictionValue::Label(label) => write!(f, "{}: {}", self.model.output_label(), label),
        }
    }
}

/// Runs a raw record through encoding, derivation, normalization and the
/// selected model.
pub struct PredictionDispatcher {
    registry: Arc<ModelRegistry>,
    engine: FeatureDerivationEngine,
}

impl PredictionDispatcher {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        let engine = FeatureDerivationEngine::new(registry.binning().clone());
        PredictionDispatcher { registry, engine }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn predict(
        &self,
        model_id: &str,
        raw: &RawVideoMetrics,
    ) -> Result<PredictionResult, PredictionError> {
        let entry = self.registry.get(model_id)?;
        let model = entry.id();

        let region_id = self
            .registry
            .region_encoder()
            .encode(raw.region.as_deref());
        let sentiment_id = self
            .registry
            .sentiment_encoder()
            .encode(raw.title_sentiment.as_deref());

        let features = self.engine.derive(model, raw, region_id, sentiment_id)?;
        let features = match entry.normalizer() {
            Some(normalizer) => normalizer.transform(&features)?,
            None => features,
        };
        debug!("{} features: {:?}", model, features.as_slice());

        let value = match entry.predictor().predict(features.as_slice())? {
            Prediction::Value(v) => PredictionValue::Count(round_to_count(v)?),
            Prediction::Label(label) => PredictionValue::Label(label),
        };
        Ok(PredictionResult { model, value })
    }

    /// Same as [`predict`](Self::predict) for a JSON payload. The model is
    /// validated before the payload is looked at, so an invalid model is
    /// reported regardless of what was sent.
    pub fn predict_json(
        &self,
        model_id: Option<&str>,
        payload: &Value,
    ) -> Result<PredictionResult, PredictionError> {
        let model_id = model_id.unwrap_or_default();
        self.registry.get(model_id)?;
        let raw = RawVideoMetrics::from_json(payload)?;
        self.predict(model_id, &raw)
    }
}

/// `1234567` -> `"1,234,567"`, sign kept.
fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

fn round_to_count(value: f64) -> Result<i64, PredictionError> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return Err(PredictionError::PredictionFailed(format!(
            "prediction {value} is out of range"
        )));
    }
    Ok(rounded as i64)
}
