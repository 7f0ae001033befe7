//! Inference engine: the single entry point from text to `(mood, energy)`.
//!
//! Holds the embedding adapter, the frozen centroid registry, and the
//! per-space thresholds. Construct it once at startup and share it behind an
//! `Arc`; `infer` takes `&self` and requests run independently.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use moodlog_core::{
    ENERGY_SPACE, EngineConfig, LabelSpace, MOOD_SPACE, Tags, UnknownLabelError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapter::{AdapterError, EmbeddingAdapter, check_embedding, with_timeout};
use crate::classifier::{Classification, Classifier, ClassifyError, Decision, ScoreVector};
use crate::prototypes::PrototypeSet;
use crate::registry::CentroidRegistry;

#[derive(Debug, Error)]
pub enum InferenceError {
    /// The adapter failed, timed out, or returned an unusable vector.
    /// Usually transient; callers may retry with backoff.
    #[error("could not classify this entry: embedding unavailable: {0}")]
    EmbeddingUnavailable(#[source] AdapterError),

    #[error(transparent)]
    Label(#[from] UnknownLabelError),
}

impl From<ClassifyError> for InferenceError {
    fn from(e: ClassifyError) -> Self {
        match e {
            ClassifyError::Label(e) => Self::Label(e),
            ClassifyError::Dimension { expected, actual } => {
                Self::EmbeddingUnavailable(AdapterError::Malformed(format!(
                    "expected {expected} dimensions, got {actual}"
                )))
            }
        }
    }
}

pub struct InferenceEngine {
    adapter: Arc<dyn EmbeddingAdapter>,
    classifier: Classifier,
    timeout: Duration,
}

impl InferenceEngine {
    /// Wire an adapter to an already built registry.
    ///
    /// The registry must contain the mood and energy spaces.
    pub fn new(
        adapter: Arc<dyn EmbeddingAdapter>,
        registry: Arc<CentroidRegistry>,
        config: &EngineConfig,
    ) -> Result<Self, UnknownLabelError> {
        for space in [MOOD_SPACE, ENERGY_SPACE] {
            if registry.space(space).is_none() {
                return Err(UnknownLabelError::Space(space.to_string()));
            }
        }
        Ok(Self {
            adapter,
            classifier: Classifier::from_config(registry, config),
            timeout: config.embed_timeout(),
        })
    }

    /// Load the prototype corpus named by `config` (or the built-in one),
    /// build the registry for the default label spaces, and wire the engine.
    pub async fn bootstrap(
        adapter: Arc<dyn EmbeddingAdapter>,
        config: &EngineConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let prototypes = match &config.prototypes {
            Some(path) => PrototypeSet::load(path)?,
            None => PrototypeSet::builtin(),
        };

        let registry = CentroidRegistry::build(
            &LabelSpace::defaults(),
            &prototypes,
            adapter.as_ref(),
            config.embed_timeout(),
        )
        .await
        .context("building centroid registry")?;

        let summary = registry.summary();
        info!(
            adapter = adapter.name(),
            dim = summary.dim,
            centroids = summary.centroids,
            prototypes = summary.prototypes,
            "inference engine ready"
        );
        Ok(Self::new(adapter, Arc::new(registry), config)?)
    }

    /// Label one piece of text.
    ///
    /// Blank text returns `(Unknown, Unknown)` without calling the adapter.
    /// Adapter trouble is an error, never a guessed label.
    pub async fn infer(&self, text: &str) -> Result<Tags, InferenceError> {
        let results = self.classify_all(text).await?;
        let label_of = |space: &str| {
            results
                .iter()
                .find(|c| c.space == space)
                .map(|c| c.label.as_str())
                .ok_or_else(|| UnknownLabelError::Space(space.to_string()))
        };
        Ok(Tags::new(
            label_of(MOOD_SPACE)?.parse()?,
            label_of(ENERGY_SPACE)?.parse()?,
        ))
    }

    /// Classify `text` in every space of the registry, sharing one embedding.
    pub async fn classify_all(&self, text: &str) -> Result<Vec<Classification>, InferenceError> {
        let registry = self.classifier.registry();

        let Some(embedding) = self.embed(text).await? else {
            debug!("blank entry, skipping embedding");
            return Ok(registry.spaces().map(unscored).collect());
        };

        let mut results = Vec::new();
        for space in registry.spaces() {
            results.push(self.classifier.classify(&space.name, &embedding)?);
        }
        Ok(results)
    }

    async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, InferenceError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let chars = text.chars().count();
        let embedding = with_timeout(self.timeout, self.adapter.embed(text))
            .await
            .and_then(|v| check_embedding(&v, self.classifier.registry().dim()).map(|_| v))
            .map_err(|e| {
                warn!(adapter = self.adapter.name(), chars, error = %e, "embedding failed");
                InferenceError::EmbeddingUnavailable(e)
            })?;
        debug!(chars, "embedded entry");
        Ok(Some(embedding))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn adapter(&self) -> &dyn EmbeddingAdapter {
        self.adapter.as_ref()
    }
}

/// Fallback result for a space when there is nothing to embed.
fn unscored(space: &LabelSpace) -> Classification {
    Classification {
        space: space.name.clone(),
        label: space.fallback.clone(),
        decision: Decision::Degenerate,
        best: None,
        second: None,
        scores: ScoreVector::default(),
    }
}
