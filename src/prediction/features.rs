//! Feature derivation.
//!
//! Every engineered feature is defined once, as a [`FeatureName`] with a
//! single formula. A model's input is an ordered list of those names, and the
//! order is part of the contract with the trained artifact: it must match the
//! column order the model was fitted on.
//!
//! All ratios divide by `count + 1`, never by the raw count, and log features
//! use `ln(1 + x)`. Both conventions come from training and must be kept
//! as-is, they're not just zero guards.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::artifacts::read_json;
use super::error::{ArtifactLoadFailure, PredictionError};
use super::raw::RawVideoMetrics;
use super::ModelId;

/// Bin assigned when a record can't be binned against fitted edges.
pub const DEFAULT_BIN: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    VideoAgeDays,
    TitleLengthWords,
    CategoryId,
    LikeCount,
    ViewCount,
    CommentCount,
    SubscriberCount,
    LikeViewRatioPercent,
    RegionId,
    SentimentId,
    LikesPerDay,
    CommentsPerDay,
    ViewsPerDay,
    LikeViewRatio,
    EngagementRate,
    CommentLikeRatio,
    LogViewCount,
    LogLikeCount,
    LogCommentCount,
    ViralScore,
    EngagementDepth,
    LikeEngagement,
    CategorySentiment,
    AgeEngagement,
    RegionCategoryEncoded,
    ViewCountBins,
    AgeBins,
    TitleLengthPerWord,
    ConversionRate,
    SubGrowthRate,
}

use FeatureName::*;

pub const MODEL1_SCHEMA: &[FeatureName] = &[
    VideoAgeDays,
    TitleLengthWords,
    CategoryId,
    LikeCount,
    LikeViewRatioPercent,
    SubscriberCount,
    LikesPerDay,
    LikeViewRatio,
    RegionId,
    SentimentId,
];

pub const MODEL2_SCHEMA: &[FeatureName] = &[
    VideoAgeDays,
    TitleLengthWords,
    CategoryId,
    LikeCount,
    ViewCount,
    LikeViewRatioPercent,
    CommentCount,
    EngagementRate,
    CommentLikeRatio,
    LikesPerDay,
    CommentsPerDay,
    ViewsPerDay,
    LogViewCount,
    LogLikeCount,
    LogCommentCount,
    ViralScore,
    EngagementDepth,
    LikeEngagement,
    CategorySentiment,
    AgeEngagement,
    RegionCategoryEncoded,
    ViewCountBins,
    AgeBins,
    TitleLengthPerWord,
    RegionId,
    SentimentId,
];

pub const MODEL3_SCHEMA: &[FeatureName] = &[
    VideoAgeDays,
    CategoryId,
    LikeCount,
    ViewCount,
    CommentCount,
    SubscriberCount,
    RegionId,
    SentimentId,
];

pub const MODEL4_SCHEMA: &[FeatureName] = &[
    VideoAgeDays,
    CategoryId,
    LikeCount,
    ViewCount,
    CommentCount,
    SubscriberCount,
    EngagementRate,
    ViewsPerDay,
    ViralScore,
    ConversionRate,
    LikesPerDay,
    SubGrowthRate,
    RegionId,
    SentimentId,
];

impl FeatureName {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoAgeDays => "video_age_days",
            TitleLengthWords => "title_length_words",
            CategoryId => "category_id",
            LikeCount => "like_count",
            ViewCount => "view_count",
            CommentCount => "comment_count",
            SubscriberCount => "subscriber_count",
            LikeViewRatioPercent => "like_view_ratio_percent",
            RegionId => "region_encoded",
            SentimentId => "sentiment_encoded",
            LikesPerDay => "likes_per_day",
            CommentsPerDay => "comments_per_day",
            ViewsPerDay => "views_per_day",
            LikeViewRatio => "like_view_ratio",
            EngagementRate => "engagement_rate",
            CommentLikeRatio => "comment_like_ratio",
            LogViewCount => "log_view_count",
            LogLikeCount => "log_like_count",
            LogCommentCount => "log_comment_count",
            ViralScore => "viral_score",
            EngagementDepth => "engagement_depth",
            LikeEngagement => "like_engagement",
            CategorySentiment => "category_sentiment",
            AgeEngagement => "age_engagement",
            RegionCategoryEncoded => "region_category_encoded",
            ViewCountBins => "view_count_bins",
            AgeBins => "age_bins",
            TitleLengthPerWord => "title_length_per_word",
            ConversionRate => "conversion_rate",
            SubGrowthRate => "sub_growth_rate",
        }
    }

    fn value(&self, input: &DerivationInput) -> f64 {
        let raw = input.raw;
        match self {
            VideoAgeDays => raw.video_age_days,
            TitleLengthWords => raw.title_length_words as f64,
            CategoryId => raw.category_id as f64,
            LikeCount => raw.like_count as f64,
            ViewCount => raw.view_count as f64,
            CommentCount => raw.comment_count as f64,
            SubscriberCount => raw.subscriber_count as f64,
            LikeViewRatioPercent => raw.like_view_ratio_percent,
            RegionId => input.region_id as f64,
            SentimentId => input.sentiment_id as f64,
            LikesPerDay => likes_per_day(raw),
            CommentsPerDay => comments_per_day(raw),
            ViewsPerDay => views_per_day(raw),
            LikeViewRatio | LikeEngagement => like_view_ratio(raw),
            EngagementRate => engagement_rate(raw),
            CommentLikeRatio => comment_like_ratio(raw),
            LogViewCount => (raw.view_count as f64).ln_1p(),
            LogLikeCount => (raw.like_count as f64).ln_1p(),
            LogCommentCount => (raw.comment_count as f64).ln_1p(),
            ViralScore => viral_score(raw),
            EngagementDepth => engagement_depth(raw),
            // placeholder that ignores sentiment, kept as trained
            CategorySentiment => raw.category_id as f64 * 100.0,
            AgeEngagement => raw.video_age_days * engagement_rate(raw),
            // placeholder that ignores region, kept as trained
            RegionCategoryEncoded => raw.category_id as f64 * 100.0 + 50.0,
            ViewCountBins => input.binning.view_count_bin(raw.view_count as f64),
            AgeBins => input.binning.age_bin(raw.video_age_days),
            TitleLengthPerWord => title_length_per_word(raw),
            ConversionRate => conversion_rate(raw),
            SubGrowthRate => sub_growth_rate(raw),
        }
    }
}

/// `count / (video_age_days + 1)`
fn per_day(count: u64, raw: &RawVideoMetrics) -> f64 {
    count as f64 / (raw.video_age_days + 1.0)
}

/// `numerator / (denominator + 1)`
fn smoothed_ratio(numerator: f64, denominator: u64) -> f64 {
    numerator / (denominator as f64 + 1.0)
}

pub fn likes_per_day(raw: &RawVideoMetrics) -> f64 {
    per_day(raw.like_count, raw)
}

pub fn comments_per_day(raw: &RawVideoMetrics) -> f64 {
    per_day(raw.comment_count, raw)
}

pub fn views_per_day(raw: &RawVideoMetrics) -> f64 {
    per_day(raw.view_count, raw)
}

pub fn like_view_ratio(raw: &RawVideoMetrics) -> f64 {
    smoothed_ratio(raw.like_count as f64, raw.view_count)
}

pub fn engagement_rate(raw: &RawVideoMetrics) -> f64 {
    smoothed_ratio(
        raw.like_count as f64 + raw.comment_count as f64,
        raw.view_count,
    )
}

pub fn comment_like_ratio(raw: &RawVideoMetrics) -> f64 {
    smoothed_ratio(raw.comment_count as f64, raw.like_count)
}

pub fn engagement_depth(raw: &RawVideoMetrics) -> f64 {
    smoothed_ratio(raw.comment_count as f64, raw.view_count)
}

pub fn viral_score(raw: &RawVideoMetrics) -> f64 {
    (views_per_day(raw) * engagement_rate(raw) * (raw.subscriber_count as f64 + 1.0)).ln_1p()
}

pub fn title_length_per_word(raw: &RawVideoMetrics) -> f64 {
    smoothed_ratio(raw.title_length_words as f64, raw.title_length_words)
}

pub fn conversion_rate(raw: &RawVideoMetrics) -> f64 {
    smoothed_ratio(raw.view_count as f64, raw.subscriber_count)
}

pub fn sub_growth_rate(raw: &RawVideoMetrics) -> f64 {
    (raw.subscriber_count as f64 + 1.0) / (raw.video_age_days + 1.0)
}

/// Fitted equal-width bin edges for a single column.
///
/// Intervals are right-closed, `(e[i], e[i + 1]]`, except that the lowest
/// edge itself belongs to bin 0.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    pub fn new(edges: Vec<f64>) -> Result<Self, String> {
        if edges.len() < 2 {
            return Err("at least two bin edges are required".to_owned());
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err("bin edges must be finite".to_owned());
        }
        if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err("bin edges must be strictly increasing".to_owned());
        }
        Ok(BinEdges(edges))
    }

    /// `None` when the value is outside the fitted range.
    pub fn bin(&self, value: f64) -> Option<usize> {
        let edges = &self.0;
        if value == edges[0] {
            return Some(0);
        }
        edges
            .windows(2)
            .position(|pair| pair[0] < value && value <= pair[1])
    }
}

#[derive(Deserialize)]
struct BinEdgesFile {
    view_count: Vec<f64>,
    video_age_days: Vec<f64>,
}

/// How model2's two bin features are computed at inference time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BinningPolicy {
    /// Both bin features are [`DEFAULT_BIN`] for every record. This is what
    /// the deployed model2 was served with.
    #[default]
    Constant,
    /// Bin each record against edges persisted at training time.
    Fitted {
        view_count: BinEdges,
        video_age_days: BinEdges,
    },
}

impl BinningPolicy {
    /// Loads `{"view_count": [...], "video_age_days": [...]}`.
    pub fn load(path: &Path) -> Result<Self, ArtifactLoadFailure> {
        let file: BinEdgesFile = read_json(path)?;
        let invalid = |reason: String| ArtifactLoadFailure::Invalid {
            path: path.to_owned(),
            reason,
        };
        Ok(BinningPolicy::Fitted {
            view_count: BinEdges::new(file.view_count).map_err(invalid)?,
            video_age_days: BinEdges::new(file.video_age_days).map_err(invalid)?,
        })
    }

    fn view_count_bin(&self, view_count: f64) -> f64 {
        match self {
            BinningPolicy::Constant => DEFAULT_BIN,
            BinningPolicy::Fitted { view_count: e, .. } => bin_or_default(e, view_count),
        }
    }

    fn age_bin(&self, video_age_days: f64) -> f64 {
        match self {
            BinningPolicy::Constant => DEFAULT_BIN,
            BinningPolicy::Fitted {
                video_age_days: e, ..
            } => bin_or_default(e, video_age_days),
        }
    }
}

fn bin_or_default(edges: &BinEdges, value: f64) -> f64 {
    edges.bin(value).map(|b| b as f64).unwrap_or(DEFAULT_BIN)
}

/// An ordered model input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        FeatureVector(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

struct DerivationInput<'a> {
    raw: &'a RawVideoMetrics,
    region_id: u32,
    sentiment_id: u32,
    binning: &'a BinningPolicy,
}

/// Builds the model-specific feature vector from a raw record.
#[derive(Debug, Clone, Default)]
pub struct FeatureDerivationEngine {
    binning: BinningPolicy,
}

impl FeatureDerivationEngine {
    pub fn new(binning: BinningPolicy) -> Self {
        FeatureDerivationEngine { binning }
    }

    pub fn binning(&self) -> &BinningPolicy {
        &self.binning
    }

    pub fn derive(
        &self,
        model: ModelId,
        raw: &RawVideoMetrics,
        region_id: u32,
        sentiment_id: u32,
    ) -> Result<FeatureVector, PredictionError> {
        let input = DerivationInput {
            raw,
            region_id,
            sentiment_id,
            binning: &self.binning,
        };
        let schema = model.schema();
        let mut values = Vec::with_capacity(schema.len());
        for feature in schema {
            let value = feature.value(&input);
            if !value.is_finite() {
                return Err(PredictionError::PredictionFailed(format!(
                    "feature `{}` is not finite for {model}",
                    feature.as_str()
                )));
            }
            values.push(value);
        }
        Ok(FeatureVector(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn example() -> RawVideoMetrics {
        RawVideoMetrics {
            video_age_days: 10.0,
            title_length_words: 8,
            category_id: 24,
            like_count: 5000,
            view_count: 200000,
            comment_count: 300,
            subscriber_count: 100000,
            like_view_ratio_percent: 2.5,
            region: Some("US".to_owned()),
            title_sentiment: Some("positive".to_owned()),
        }
    }

    fn zeros() -> RawVideoMetrics {
        RawVideoMetrics {
            video_age_days: 0.0,
            title_length_words: 0,
            category_id: 0,
            like_count: 0,
            view_count: 0,
            comment_count: 0,
            subscriber_count: 0,
            like_view_ratio_percent: 0.0,
            region: None,
            title_sentiment: None,
        }
    }

    #[test]
    fn model1_vector_matches_training_order() {
        let v = FeatureDerivationEngine::default()
            .derive(ModelId::Model1, &example(), 4, 2)
            .unwrap();
        let expected = [
            10.0,
            8.0,
            24.0,
            5000.0,
            2.5,
            100000.0,
            5000.0 / 11.0,
            5000.0 / 200001.0,
            4.0,
            2.0,
        ];
        assert_eq!(v.as_slice(), &expected);
    }

    #[test]
    fn model2_vector() {
        let raw = example();
        let v = FeatureDerivationEngine::default()
            .derive(ModelId::Model2, &raw, 4, 2)
            .unwrap();
        let engagement = 5300.0 / 200001.0;
        let views_per_day = 200000.0 / 11.0;
        let expected = [
            10.0,
            8.0,
            24.0,
            5000.0,
            200000.0,
            2.5,
            300.0,
            engagement,
            300.0 / 5001.0,
            5000.0 / 11.0,
            300.0 / 11.0,
            views_per_day,
            200000f64.ln_1p(),
            5000f64.ln_1p(),
            300f64.ln_1p(),
            (views_per_day * engagement * 100001.0).ln_1p(),
            300.0 / 200001.0,
            5000.0 / 200001.0,
            2400.0,
            10.0 * engagement,
            2450.0,
            2.0,
            2.0,
            8.0 / 9.0,
            4.0,
            2.0,
        ];
        assert_eq!(v.len(), 26);
        assert_eq!(v.as_slice(), &expected);
    }

    #[test]
    fn model3_uses_raw_counts_only() {
        let v = FeatureDerivationEngine::default()
            .derive(ModelId::Model3, &example(), 4, 2)
            .unwrap();
        assert_eq!(
            v.as_slice(),
            &[10.0, 24.0, 5000.0, 200000.0, 300.0, 100000.0, 4.0, 2.0]
        );
    }

    #[test]
    fn model4_vector() {
        let v = FeatureDerivationEngine::default()
            .derive(ModelId::Model4, &example(), 4, 2)
            .unwrap();
        let engagement: f64 = 5300.0 / 200001.0;
        let views_per_day: f64 = 200000.0 / 11.0;
        let expected = [
            10.0,
            24.0,
            5000.0,
            200000.0,
            300.0,
            100000.0,
            engagement,
            views_per_day,
            (views_per_day * engagement * 100001.0).ln_1p(),
            200000.0 / 100001.0,
            5000.0 / 11.0,
            100001.0 / 11.0,
            4.0,
            2.0,
        ];
        assert_eq!(v.as_slice(), &expected);
    }

    #[test]
    fn zero_record_is_finite_for_every_model() {
        let engine = FeatureDerivationEngine::default();
        for model in ModelId::ALL {
            let v = engine.derive(model, &zeros(), 0, 0).unwrap();
            assert_eq!(v.len(), model.schema().len());
            assert!(v.as_slice().iter().all(|x| x.is_finite()), "{model}");
        }
    }

    #[test]
    fn zero_record_smoothing_values() {
        let raw = zeros();
        assert_eq!(likes_per_day(&raw), 0.0);
        assert_eq!(engagement_rate(&raw), 0.0);
        assert_eq!(viral_score(&raw), 0.0);
        assert_eq!(sub_growth_rate(&raw), 1.0);
        assert_eq!(title_length_per_word(&raw), 0.0);
    }

    #[test]
    fn schemas_have_no_duplicates() {
        for model in ModelId::ALL {
            let names: HashSet<_> = model.schema().iter().map(|f| f.as_str()).collect();
            assert_eq!(names.len(), model.schema().len(), "{model}");
        }
    }

    #[test]
    fn shared_formulas_agree_across_models() {
        let engine = FeatureDerivationEngine::default();
        let raw = example();
        let m2 = engine.derive(ModelId::Model2, &raw, 1, 1).unwrap();
        let m4 = engine.derive(ModelId::Model4, &raw, 1, 1).unwrap();
        let at = |model: ModelId, v: &FeatureVector, f: FeatureName| {
            let i = model.schema().iter().position(|x| *x == f).unwrap();
            v.as_slice()[i]
        };
        for f in [EngagementRate, ViewsPerDay, ViralScore, LikesPerDay] {
            assert_eq!(at(ModelId::Model2, &m2, f), at(ModelId::Model4, &m4, f));
        }
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        let engine = FeatureDerivationEngine::default();

        let mut raw = example();
        raw.video_age_days = f64::INFINITY;
        for model in ModelId::ALL {
            assert!(matches!(
                engine.derive(model, &raw, 0, 0),
                Err(PredictionError::PredictionFailed(_))
            ));
        }

        let mut raw = example();
        raw.like_view_ratio_percent = f64::NAN;
        assert!(engine.derive(ModelId::Model1, &raw, 0, 0).is_err());
        // model3 doesn't read the ratio at all
        assert!(engine.derive(ModelId::Model3, &raw, 0, 0).is_ok());
    }

    #[test]
    fn bin_edges_are_right_closed() {
        let edges = BinEdges::new(vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();
        assert_eq!(edges.bin(0.0), Some(0));
        assert_eq!(edges.bin(5.0), Some(0));
        assert_eq!(edges.bin(10.0), Some(0));
        assert_eq!(edges.bin(10.5), Some(1));
        assert_eq!(edges.bin(50.0), Some(4));
        assert_eq!(edges.bin(50.1), None);
        assert_eq!(edges.bin(-1.0), None);
    }

    #[test]
    fn rejects_bad_edges() {
        assert!(BinEdges::new(vec![1.0]).is_err());
        assert!(BinEdges::new(vec![0.0, 0.0, 1.0]).is_err());
        assert!(BinEdges::new(vec![0.0, f64::NAN]).is_err());
    }

    #[test]
    fn fitted_binning_feeds_model2() {
        let engine = FeatureDerivationEngine::new(BinningPolicy::Fitted {
            view_count: BinEdges::new(vec![0.0, 1e5, 2e5, 3e5, 4e5, 5e5]).unwrap(),
            video_age_days: BinEdges::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(),
        });
        let v = engine.derive(ModelId::Model2, &example(), 0, 0).unwrap();
        let bins = |f: FeatureName| {
            let i = MODEL2_SCHEMA.iter().position(|x| *x == f).unwrap();
            v.as_slice()[i]
        };
        // 200000 is the right edge of bin 1, age 10 is past the last edge
        assert_eq!(bins(ViewCountBins), 1.0);
        assert_eq!(bins(AgeBins), DEFAULT_BIN);
    }

    #[test]
    fn loads_bin_edges_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"view_count": [0, 10, 20], "video_age_days": [0, 5, 10]}}"#
        )
        .unwrap();
        let policy = BinningPolicy::load(file.path()).unwrap();
        assert!(matches!(policy, BinningPolicy::Fitted { .. }));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, r#"{{"view_count": [10, 0], "video_age_days": [0, 5]}}"#).unwrap();
        assert!(matches!(
            BinningPolicy::load(bad.path()),
            Err(ArtifactLoadFailure::Invalid { .. })
        ));
    }
}
