//! Centroid-based classification with a confidence/ambiguity policy.
//!
//! Scores an entry embedding against every centroid of one label space by
//! cosine similarity, then decides:
//!
//! 1. best score `<` the space's low-confidence threshold → fallback label;
//! 2. the space has a blend label, the gap between the top two scores is
//!    `<` the ambiguity margin, and neither of the two is already ambivalent
//!    → blend label (Mixed for mood);
//! 3. otherwise → the best label.
//!
//! Both comparisons are strict: a best score exactly at the threshold is
//! trusted, and a gap exactly equal to the margin is not ambiguous. Equal
//! scores rank in the space's declaration order.
//!
//! Classification is a pure function of (space, embedding, registry,
//! thresholds).

use std::collections::HashMap;
use std::sync::Arc;

use moodlog_core::{EngineConfig, SpacePolicy, UnknownLabelError};
use thiserror::Error;
use tracing::debug;

use crate::registry::CentroidRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Label(#[from] UnknownLabelError),

    #[error("embedding has {actual} dimensions, registry expects {expected}")]
    Dimension { expected: usize, actual: usize },
}

/// One label's similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Per-request similarity scores for one space, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreVector {
    scores: Vec<LabelScore>,
}

impl ScoreVector {
    pub fn get(&self, label: &str) -> Option<f32> {
        self.scores
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.score)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelScore> {
        self.scores.iter()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Scores sorted descending; ties keep declaration order.
    pub fn ranked(&self) -> Vec<&LabelScore> {
        let mut ranked: Vec<&LabelScore> = self.scores.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}

/// Which rule of the decision policy produced the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Best label returned as-is.
    Confident,
    /// Best score under the low-confidence threshold: fallback.
    LowConfidence,
    /// Top two readings too close: blend label.
    Ambiguous,
    /// Zero-magnitude embedding, nothing to score: fallback.
    Degenerate,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confident => "confident",
            Self::LowConfidence => "low-confidence",
            Self::Ambiguous => "ambiguous",
            Self::Degenerate => "degenerate",
        }
    }
}

/// Outcome of classifying one embedding in one space.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub space: String,
    pub label: String,
    pub decision: Decision,
    pub best: Option<LabelScore>,
    pub second: Option<LabelScore>,
    /// Empty when the embedding was degenerate.
    pub scores: ScoreVector,
}

/// Turns embeddings into labels using a shared, frozen registry.
#[derive(Debug, Clone)]
pub struct Classifier {
    registry: Arc<CentroidRegistry>,
    policies: HashMap<String, SpacePolicy>,
}

impl Classifier {
    /// Classifier with default thresholds for every space.
    pub fn new(registry: Arc<CentroidRegistry>) -> Self {
        Self {
            registry,
            policies: HashMap::new(),
        }
    }

    /// Classifier with thresholds taken from `config`.
    pub fn from_config(registry: Arc<CentroidRegistry>, config: &EngineConfig) -> Self {
        let policies = registry
            .spaces()
            .map(|s| (s.name.clone(), config.policy(&s.name)))
            .collect();
        Self { registry, policies }
    }

    pub fn with_policy(mut self, space: &str, policy: SpacePolicy) -> Self {
        self.policies.insert(space.to_string(), policy);
        self
    }

    pub fn policy(&self, space: &str) -> SpacePolicy {
        self.policies.get(space).copied().unwrap_or_default()
    }

    pub fn registry(&self) -> &CentroidRegistry {
        &self.registry
    }

    /// Cosine similarity against every centroid of `space`.
    ///
    /// `Ok(None)` when the embedding has zero magnitude and no score is defined.
    pub fn scores(
        &self,
        space: &str,
        embedding: &[f32],
    ) -> Result<Option<ScoreVector>, ClassifyError> {
        let dim = self.registry.dim();
        if embedding.len() != dim {
            return Err(ClassifyError::Dimension {
                expected: dim,
                actual: embedding.len(),
            });
        }

        let centroids = self.registry.centroids(space)?;
        // In f64 every finite non-zero f32 vector has a finite non-zero norm.
        let norm = magnitude(embedding);
        if norm == 0.0 {
            return Ok(None);
        }

        let scores = centroids
            .map(|(label, centroid)| {
                let dot: f64 = embedding
                    .iter()
                    .zip(centroid.vector())
                    .map(|(&x, &y)| f64::from(x) * f64::from(y))
                    .sum();
                LabelScore {
                    label: label.to_string(),
                    score: (dot / (norm * centroid.norm())).clamp(-1.0, 1.0) as f32,
                }
            })
            .collect();
        Ok(Some(ScoreVector { scores }))
    }

    /// Choose one label of `space` for `embedding`.
    pub fn classify(
        &self,
        space: &str,
        embedding: &[f32],
    ) -> Result<Classification, ClassifyError> {
        let def = self
            .registry
            .space(space)
            .ok_or_else(|| UnknownLabelError::Space(space.to_string()))?;
        let policy = self.policy(space);

        let fallback = |decision: Decision,
                        scores: ScoreVector,
                        best: Option<LabelScore>,
                        second: Option<LabelScore>| Classification {
            space: space.to_string(),
            label: def.fallback.clone(),
            decision,
            best,
            second,
            scores,
        };

        let Some(scores) = self.scores(space, embedding)? else {
            debug!(space, "zero-magnitude embedding, using fallback");
            return Ok(fallback(Decision::Degenerate, ScoreVector::default(), None, None));
        };

        let ranked = scores.ranked();
        let Some(best) = ranked.first().map(|s| (*s).clone()) else {
            return Ok(fallback(Decision::Degenerate, scores, None, None));
        };
        let second = ranked.get(1).map(|s| (*s).clone());

        if best.score < policy.low_confidence_threshold {
            debug!(space, best = best.score, "below confidence threshold");
            return Ok(fallback(Decision::LowConfidence, scores, Some(best), second));
        }

        // A lone label competes against -1.
        let second_score = second.as_ref().map_or(-1.0, |s| s.score);
        let second_ambivalent = second
            .as_ref()
            .is_some_and(|s| def.is_ambivalent(&s.label));

        let (label, decision) = match &def.blend {
            Some(blend)
                if best.score - second_score < policy.ambiguity_margin
                    && !def.is_ambivalent(&best.label)
                    && !second_ambivalent =>
            {
                (blend.label.clone(), Decision::Ambiguous)
            }
            _ => (best.label.clone(), Decision::Confident),
        };

        debug!(
            space,
            label = %label,
            decision = decision.as_str(),
            best = best.score,
            second = second_score,
            "classified"
        );
        Ok(Classification {
            space: space.to_string(),
            label,
            decision,
            best: Some(best),
            second,
            scores,
        })
    }
}

pub(crate) fn magnitude(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}
