//! Test artifact fixtures
//!
//! Writes a complete artifact directory with tiny hand-built forests whose
//! outputs are easy to reason about:
//!
//! - model1 averages two stumps, on scaled `like_count` and `likes_per_day`.
//! - model2 is one stump on raw `view_count`.
//! - model3 splits on `view_count`, model4 on `views_per_day`.

use anyhow::Result;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn stump(feature: usize, threshold: f64, left: Value, right: Value) -> Value {
    json!({"nodes": [
        {"feature": feature, "threshold": threshold, "left": 1, "right": 2},
        {"value": left},
        {"value": right}
    ]})
}

fn write_json(dir: &Path, name: &str, value: &Value) -> Result<()> {
    fs::write(dir.join(name), serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Creates a temporary artifact directory for all four models.
///
/// The returned TempDir must be kept alive for the server's lifetime.
pub fn create_test_artifacts() -> Result<TempDir> {
    let temp_dir = TempDir::new()?;
    let dir = temp_dir.path();

    write_json(
        dir,
        "model1_view_count.json",
        &json!({
            "kind": "regressor",
            "n_features": 10,
            "trees": [
                stump(3, 0.0, json!([1000.0]), json!([250000.0])),
                stump(6, 0.5, json!([2000.0]), json!([300000.0]))
            ]
        }),
    )?;
    write_json(
        dir,
        "scaler_model1.json",
        &json!({
            "mean": [5.0, 10.0, 20.0, 1000.0, 2.0, 50000.0, 100.0, 0.02, 2.0, 1.0],
            "scale": [5.0, 5.0, 10.0, 2000.0, 1.0, 50000.0, 200.0, 0.01, 2.0, 1.0]
        }),
    )?;

    write_json(
        dir,
        "model2_subscribers.json",
        &json!({
            "kind": "regressor",
            "n_features": 26,
            "trees": [stump(4, 1000.0, json!([10.0]), json!([150000.6]))]
        }),
    )?;
    write_json(
        dir,
        "scaler_model2.json",
        &json!({"mean": vec![0.0; 26], "scale": vec![1.0; 26]}),
    )?;

    write_json(
        dir,
        "model3_popularity_class.json",
        &json!({
            "kind": "classifier",
            "n_features": 8,
            "classes": ["high", "low", "medium"],
            "trees": [stump(3, 100000.0, json!([0.0, 1.0, 0.0]), json!([1.0, 0.0, 0.0]))]
        }),
    )?;
    write_json(
        dir,
        "model4_trending_status.json",
        &json!({
            "kind": "classifier",
            "n_features": 14,
            "classes": ["successful", "unsuccessful"],
            "trees": [stump(7, 5000.0, json!([0.0, 1.0]), json!([1.0, 0.0]))]
        }),
    )?;

    write_json(
        dir,
        "region_encoder.json",
        &json!({"classes": ["ca", "de", "gb", "in", "us"]}),
    )?;
    write_json(
        dir,
        "sentiment_encoder.json",
        &json!({"classes": ["negative", "neutral", "positive"]}),
    )?;

    Ok(temp_dir)
}

/// The reference record: a 10 day old video from the US with a positive title.
pub fn example_payload() -> Value {
    json!({
        "region": "US",
        "title_sentiment": "positive",
        "video_age_days": 10,
        "title_length_words": 8,
        "category_id": 24,
        "like_count": 5000,
        "like_view_ratio_percent": 2.5,
        "subscriber_count": 100000,
        "view_count": 200000,
        "comment_count": 300
    })
}

pub fn zero_payload() -> Value {
    json!({
        "region": "",
        "title_sentiment": null,
        "video_age_days": 0,
        "title_length_words": 0,
        "category_id": 0,
        "like_count": 0,
        "like_view_ratio_percent": 0,
        "subscriber_count": 0,
        "view_count": 0,
        "comment_count": 0
    })
}
