//! The raw per-video record a prediction starts from.

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::PredictionError;

pub const VIDEO_AGE_DAYS: &str = "video_age_days";
pub const TITLE_LENGTH_WORDS: &str = "title_length_words";
pub const CATEGORY_ID: &str = "category_id";
pub const LIKE_COUNT: &str = "like_count";
pub const VIEW_COUNT: &str = "view_count";
pub const COMMENT_COUNT: &str = "comment_count";
pub const SUBSCRIBER_COUNT: &str = "subscriber_count";
pub const LIKE_VIEW_RATIO_PERCENT: &str = "like_view_ratio_percent";
pub const REGION: &str = "region";
pub const TITLE_SENTIMENT: &str = "title_sentiment";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawVideoMetrics {
    pub video_age_days: f64,
    pub title_length_words: u64,
    pub category_id: i64,
    pub like_count: u64,
    pub view_count: u64,
    pub comment_count: u64,
    pub subscriber_count: u64,
    pub like_view_ratio_percent: f64,
    /// Free text, `None` when the payload carried `null` or an empty string.
    pub region: Option<String>,
    pub title_sentiment: Option<String>,
}

impl RawVideoMetrics {
    /// Parses a request payload.
    ///
    /// Absent keys and `null` numbers are `MissingField`, values of the wrong
    /// shape are `PredictionFailed`. Nothing is ever defaulted except the two
    /// categorical fields, which the encoders handle.
    pub fn from_json(payload: &Value) -> Result<Self, PredictionError> {
        let object = payload.as_object().ok_or_else(|| {
            PredictionError::PredictionFailed("payload must be a JSON object".to_owned())
        })?;

        Ok(RawVideoMetrics {
            video_age_days: non_negative_number(object, VIDEO_AGE_DAYS)?,
            title_length_words: count(object, TITLE_LENGTH_WORDS)?,
            category_id: integer(object, CATEGORY_ID)?,
            like_count: count(object, LIKE_COUNT)?,
            view_count: count(object, VIEW_COUNT)?,
            comment_count: count(object, COMMENT_COUNT)?,
            subscriber_count: count(object, SUBSCRIBER_COUNT)?,
            like_view_ratio_percent: number(object, LIKE_VIEW_RATIO_PERCENT)?,
            region: category(object, REGION)?,
            title_sentiment: category(object, TITLE_SENTIMENT)?,
        })
    }
}

fn present<'a>(
    object: &'a Map<String, Value>,
    key: &'static str,
) -> Result<&'a Value, PredictionError> {
    match object.get(key) {
        None | Some(Value::Null) => Err(PredictionError::MissingField(key)),
        Some(value) => Ok(value),
    }
}

fn number(object: &Map<String, Value>, key: &'static str) -> Result<f64, PredictionError> {
    let value = present(object, key)?;
    let number = value.as_f64().ok_or_else(|| {
        PredictionError::PredictionFailed(format!("field `{key}` must be a number, got {value}"))
    })?;
    if !number.is_finite() {
        return Err(PredictionError::PredictionFailed(format!(
            "field `{key}` must be finite"
        )));
    }
    Ok(number)
}

fn non_negative_number(
    object: &Map<String, Value>,
    key: &'static str,
) -> Result<f64, PredictionError> {
    let number = number(object, key)?;
    if number < 0.0 {
        return Err(PredictionError::PredictionFailed(format!(
            "field `{key}` must not be negative, got {number}"
        )));
    }
    Ok(number)
}

fn integer(object: &Map<String, Value>, key: &'static str) -> Result<i64, PredictionError> {
    let value = present(object, key)?;
    if let Some(integer) = value.as_i64() {
        return Ok(integer);
    }
    // 24.0 is accepted, 24.5 is not
    let number = number(object, key)?;
    if number.fract() != 0.0 || number < i64::MIN as f64 || number > i64::MAX as f64 {
        return Err(PredictionError::PredictionFailed(format!(
            "field `{key}` must be an integer, got {number}"
        )));
    }
    Ok(number as i64)
}

fn count(object: &Map<String, Value>, key: &'static str) -> Result<u64, PredictionError> {
    let integer = integer(object, key)?;
    u64::try_from(integer).map_err(|_| {
        PredictionError::PredictionFailed(format!(
            "field `{key}` must not be negative, got {integer}"
        ))
    })
}

fn category(
    object: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, PredictionError> {
    match object.get(key) {
        None => Err(PredictionError::MissingField(key)),
        Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        // falsy values take the default token, like null and ""
        Some(Value::Bool(false)) => Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(PredictionError::PredictionFailed(format!(
            "field `{key}` must be a string, got {other}"
        ))),
    }
}
