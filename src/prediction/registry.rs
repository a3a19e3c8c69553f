//! The set of loaded artifacts the dispatcher serves from.
//!
//! A [`ModelRegistry`] is built once at startup, either from an artifact
//! directory with [`ModelRegistry::load`] or from injected components with
//! [`ModelRegistry::builder`], and is read-only afterwards. It is shared
//! behind an `Arc`; dropping the last handle releases every artifact.

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::encoder::{CategoryEncoder, CategoryEncoding, LabelEncoding};
use super::error::{ArtifactLoadFailure, UnknownModel};
use super::features::{BinningPolicy, FeatureName};
use super::forest::{load_predictor, Predictor, PredictorKind};
use super::model_id::ModelTask;
use super::normalizer::{Normalizer, StandardScaler};
use super::ModelId;

pub const REGION_ENCODER_FILE: &str = "region_encoder.json";
pub const SENTIMENT_ENCODER_FILE: &str = "sentiment_encoder.json";
pub const MODEL2_BIN_EDGES_FILE: &str = "model2_bin_edges.json";

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Bin model2's view count and age against `model2_bin_edges.json`
    /// instead of using the constant bin.
    pub fitted_bins: bool,
}

/// A model and the components its input goes through.
#[derive(Clone)]
pub struct ModelEntry {
    id: ModelId,
    predictor: Arc<dyn Predictor>,
    normalizer: Option<Arc<dyn Normalizer>>,
}

impl ModelEntry {
    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn schema(&self) -> &'static [FeatureName] {
        self.id.schema()
    }

    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    pub fn normalizer(&self) -> Option<&dyn Normalizer> {
        self.normalizer.as_deref()
    }
}

pub struct ModelRegistry {
    // indexed by `ModelId as usize`
    entries: Vec<ModelEntry>,
    region_encoder: CategoryEncoder,
    sentiment_encoder: CategoryEncoder,
    binning: BinningPolicy,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Loads every artifact from `dir`. Any missing or invalid file fails
    /// the whole load.
    pub fn load(dir: &Path, options: &LoadOptions) -> Result<Self, ArtifactLoadFailure> {
        if !dir.is_dir() {
            return Err(ArtifactLoadFailure::Missing(dir.to_owned()));
        }
        let mut builder = ModelRegistry::builder();

        for id in ModelId::ALL {
            let path = dir.join(id.predictor_file_name());
            info!("Loading {} from {:?}", id, path);
            builder = builder.with_predictor(id, load_predictor(&path)?);

            if let Some(file_name) = id.normalizer_file_name() {
                let path = dir.join(file_name);
                info!("Loading {} scaler from {:?}", id, path);
                builder = builder.with_normalizer(id, Arc::new(StandardScaler::load(&path)?));
            }
        }

        let region = LabelEncoding::load(&dir.join(REGION_ENCODER_FILE))?;
        let sentiment = LabelEncoding::load(&dir.join(SENTIMENT_ENCODER_FILE))?;
        info!(
            "Loaded encoders: {} regions, {} sentiments",
            region.len(),
            sentiment.len()
        );
        builder = builder
            .with_region_encoding(Arc::new(region))
            .with_sentiment_encoding(Arc::new(sentiment));

        if options.fitted_bins {
            let path = dir.join(MODEL2_BIN_EDGES_FILE);
            info!("Loading model2 bin edges from {:?}", path);
            builder = builder.with_binning(BinningPolicy::load(&path)?);
        }

        builder.build()
    }

    /// Looks up a model by its string identifier.
    pub fn get(&self, model_id: &str) -> Result<&ModelEntry, UnknownModel> {
        let id: ModelId = model_id.parse()?;
        Ok(self.entry(id))
    }

    pub fn entry(&self, id: ModelId) -> &ModelEntry {
        &self.entries[id as usize]
    }

    pub fn entries(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.iter()
    }

    pub fn region_encoder(&self) -> &CategoryEncoder {
        &self.region_encoder
    }

    pub fn sentiment_encoder(&self) -> &CategoryEncoder {
        &self.sentiment_encoder
    }

    pub fn binning(&self) -> &BinningPolicy {
        &self.binning
    }
}

/// Assembles a registry from in-memory components.
#[derive(Default)]
pub struct ModelRegistryBuilder {
    predictors: Vec<(ModelId, Arc<dyn Predictor>)>,
    normalizers: Vec<(ModelId, Arc<dyn Normalizer>)>,
    region: Option<Arc<dyn CategoryEncoding>>,
    sentiment: Option<Arc<dyn CategoryEncoding>>,
    binning: BinningPolicy,
}

impl ModelRegistryBuilder {
    pub fn with_predictor(mut self, id: ModelId, predictor: Arc<dyn Predictor>) -> Self {
        self.predictors.retain(|(existing, _)| *existing != id);
        self.predictors.push((id, predictor));
        self
    }

    pub fn with_normalizer(mut self, id: ModelId, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizers.retain(|(existing, _)| *existing != id);
        self.normalizers.push((id, normalizer));
        self
    }

    pub fn with_region_encoding(mut self, encoding: Arc<dyn CategoryEncoding>) -> Self {
        self.region = Some(encoding);
        self
    }

    pub fn with_sentiment_encoding(mut self, encoding: Arc<dyn CategoryEncoding>) -> Self {
        self.sentiment = Some(encoding);
        self
    }

    pub fn with_binning(mut self, binning: BinningPolicy) -> Self {
        self.binning = binning;
        self
    }

    /// Checks that every model is present and that each predictor and
    /// normalizer agrees with the model's schema.
    pub fn build(self) -> Result<ModelRegistry, ArtifactLoadFailure> {
        let mut entries = Vec::with_capacity(ModelId::ALL.len());
        for id in ModelId::ALL {
            let predictor = self
                .predictors
                .iter()
                .find(|(existing, _)| *existing == id)
                .map(|(_, p)| p.clone())
                .ok_or_else(|| ArtifactLoadFailure::NotRegistered(id.to_string()))?;
            let normalizer = self
                .normalizers
                .iter()
                .find(|(existing, _)| *existing == id)
                .map(|(_, n)| n.clone());
            check_compatible(id, predictor.as_ref(), normalizer.as_deref())?;
            entries.push(ModelEntry {
                id,
                predictor,
                normalizer,
            });
        }

        let region = self
            .region
            .ok_or_else(|| ArtifactLoadFailure::NotRegistered("region encoder".to_owned()))?;
        let sentiment = self
            .sentiment
            .ok_or_else(|| ArtifactLoadFailure::NotRegistered("sentiment encoder".to_owned()))?;

        Ok(ModelRegistry {
            entries,
            region_encoder: CategoryEncoder::region(region),
            sentiment_encoder: CategoryEncoder::sentiment(sentiment),
            binning: self.binning,
        })
    }
}

fn check_compatible(
    id: ModelId,
    predictor: &dyn Predictor,
    normalizer: Option<&dyn Normalizer>,
) -> Result<(), ArtifactLoadFailure> {
    let incompatible = |reason: String| ArtifactLoadFailure::Incompatible { model: id, reason };
    let width = id.schema().len();

    let expected_kind = match id.task() {
        ModelTask::Regression => PredictorKind::Regressor,
        ModelTask::Classification => PredictorKind::Classifier,
    };
    if predictor.kind() != expected_kind {
        return Err(incompatible(format!(
            "expected a {:?}, found a {:?}",
            expected_kind,
            predictor.kind()
        )));
    }
    if predictor.n_features() != width {
        return Err(incompatible(format!(
            "predictor takes {} features, schema has {}",
            predictor.n_features(),
            width
        )));
    }
    match (id.requires_normalization(), normalizer) {
        (true, None) => Err(incompatible("missing normalizer".to_owned())),
        (false, Some(_)) => Err(incompatible(
            "model is trained on unscaled input and takes no normalizer".to_owned(),
        )),
        (true, Some(n)) if n.dimension() != width => Err(incompatible(format!(
            "normalizer takes {} features, schema has {}",
            n.dimension(),
            width
        ))),
        _ => Ok(()),
    }
}
