//! Centroid registry: one reference vector per label, per label space.
//!
//! Built once from the prototype corpus and then frozen. A registry value only
//! exists after every non-fallback label of every space has a centroid, so a
//! half-built registry can never reach the classifier. Share it behind an
//! `Arc`; reads need no locking and return borrowed slices only.

use std::collections::HashMap;
use std::time::Duration;

use moodlog_core::{LabelSpace, UnknownLabelError};
use thiserror::Error;
use tracing::{debug, info};

use crate::adapter::{AdapterError, EmbeddingAdapter, check_embedding, with_timeout};
use crate::classifier::magnitude;
use crate::prototypes::PrototypeSet;

/// Startup failure: some label would be left without a usable centroid.
#[derive(Debug, Error)]
pub enum RegistryBuildError {
    #[error("no label spaces given")]
    NoSpaces,

    #[error("label space '{0}' declared twice")]
    DuplicateSpace(String),

    #[error("label space '{0}' has no prototypes")]
    MissingSpace(String),

    #[error("{space}/{label}: no prototypes")]
    EmptyLabel { space: String, label: String },

    #[error("{space}: '{label}' is not a label of this space")]
    UnknownLabel { space: String, label: String },

    #[error("{space}: fallback label '{label}' cannot have prototypes")]
    FallbackPrototypes { space: String, label: String },

    #[error("{space}/{label}: embedding prototypes failed: {source}")]
    Embedding {
        space: String,
        label: String,
        source: AdapterError,
    },

    #[error("{space}/{label}: expected {expected} dimensions, got {actual}")]
    Dimension {
        space: String,
        label: String,
        expected: usize,
        actual: usize,
    },

    #[error("{space}/{label}: centroid has zero magnitude")]
    Degenerate { space: String, label: String },
}

/// Mean prototype embedding for one label, with its magnitude precomputed.
#[derive(Debug, Clone)]
pub struct Centroid {
    vector: Vec<f32>,
    norm: f64,
    prototypes: usize,
}

impl Centroid {
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn norm(&self) -> f64 {
        self.norm
    }

    /// Number of prototype sentences averaged into this centroid.
    pub fn prototypes(&self) -> usize {
        self.prototypes
    }
}

#[derive(Debug)]
struct SpaceCentroids {
    space: LabelSpace,
    /// Parallel to `space.labels`.
    centroids: Vec<Centroid>,
}

/// Frozen label → centroid mapping for every configured label space.
#[derive(Debug)]
pub struct CentroidRegistry {
    spaces: Vec<SpaceCentroids>,
    dim: usize,
}

/// Summary of a built registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySummary {
    pub spaces: usize,
    pub centroids: usize,
    pub prototypes: usize,
    pub dim: usize,
}

impl CentroidRegistry {
    /// Embed every prototype of every scored label and average per label.
    ///
    /// Each adapter call is bounded by `timeout`. Any failure aborts the
    /// build; no label is ever skipped.
    pub async fn build(
        spaces: &[LabelSpace],
        prototypes: &PrototypeSet,
        adapter: &dyn EmbeddingAdapter,
        timeout: Duration,
    ) -> Result<Self, RegistryBuildError> {
        check_spaces(spaces)?;

        let mut built = Vec::with_capacity(spaces.len());
        // Every vector must match what the adapter declares.
        let expected = adapter.dim();

        for space in spaces {
            check_corpus(space, prototypes)?;

            let mut centroids = Vec::with_capacity(space.labels.len());
            for label in &space.labels {
                let sentences: Vec<&str> = prototypes
                    .get(&space.name, label)
                    .iter()
                    .map(String::as_str)
                    .collect();
                if sentences.is_empty() {
                    return Err(RegistryBuildError::EmptyLabel {
                        space: space.name.clone(),
                        label: label.clone(),
                    });
                }

                let embed_err = |source| RegistryBuildError::Embedding {
                    space: space.name.clone(),
                    label: label.clone(),
                    source,
                };
                let vectors = with_timeout(timeout, adapter.embed_batch(&sentences))
                    .await
                    .map_err(embed_err)?;
                if vectors.len() != sentences.len() {
                    return Err(embed_err(AdapterError::Malformed(format!(
                        "{} vectors for {} prototypes",
                        vectors.len(),
                        sentences.len()
                    ))));
                }

                for v in &vectors {
                    if v.len() != expected || expected == 0 {
                        return Err(RegistryBuildError::Dimension {
                            space: space.name.clone(),
                            label: label.clone(),
                            expected,
                            actual: v.len(),
                        });
                    }
                    check_embedding(v, expected).map_err(embed_err)?;
                }

                let centroid = mean(&vectors, expected).ok_or_else(|| {
                    RegistryBuildError::Degenerate {
                        space: space.name.clone(),
                        label: label.clone(),
                    }
                })?;
                debug!(
                    space = %space.name,
                    label = %label,
                    prototypes = centroid.prototypes,
                    "computed centroid"
                );
                centroids.push(centroid);
            }

            info!(
                space = %space.name,
                labels = centroids.len(),
                prototypes = centroids.iter().map(|c| c.prototypes).sum::<usize>(),
                adapter = adapter.name(),
                "built centroids"
            );
            built.push(SpaceCentroids {
                space: space.clone(),
                centroids,
            });
        }

        Ok(Self {
            spaces: built,
            dim: expected,
        })
    }

    /// Assemble a registry from precomputed centroids.
    ///
    /// `centroids` maps `(space, label)` to a vector; every scored label of
    /// every space needs exactly one entry.
    pub fn from_centroids(
        spaces: &[LabelSpace],
        centroids: HashMap<(String, String), Vec<f32>>,
    ) -> Result<Self, RegistryBuildError> {
        check_spaces(spaces)?;
        let mut centroids = centroids;
        let mut dim: Option<usize> = None;
        let mut built = Vec::with_capacity(spaces.len());

        for space in spaces {
            let mut out = Vec::with_capacity(space.labels.len());
            for label in &space.labels {
                let vector = centroids
                    .remove(&(space.name.clone(), label.clone()))
                    .ok_or_else(|| RegistryBuildError::EmptyLabel {
                        space: space.name.clone(),
                        label: label.clone(),
                    })?;
                let expected = *dim.get_or_insert(vector.len());
                if vector.len() != expected || expected == 0 {
                    return Err(RegistryBuildError::Dimension {
                        space: space.name.clone(),
                        label: label.clone(),
                        expected,
                        actual: vector.len(),
                    });
                }
                let centroid = mean(std::slice::from_ref(&vector), expected).ok_or_else(|| {
                    RegistryBuildError::Degenerate {
                        space: space.name.clone(),
                        label: label.clone(),
                    }
                })?;
                out.push(centroid);
            }
            built.push(SpaceCentroids {
                space: space.clone(),
                centroids: out,
            });
        }

        if let Some(((space, label), _)) = centroids.into_iter().next() {
            let known = spaces.iter().find(|s| s.name == space);
            return Err(match known {
                Some(s) if s.is_fallback(&label) => {
                    RegistryBuildError::FallbackPrototypes { space, label }
                }
                Some(_) => RegistryBuildError::UnknownLabel { space, label },
                None => RegistryBuildError::MissingSpace(space),
            });
        }

        Ok(Self {
            spaces: built,
            dim: dim.unwrap_or(0),
        })
    }

    /// The stored centroid vector for a scored label.
    pub fn centroid_for(&self, space: &str, label: &str) -> Result<&[f32], UnknownLabelError> {
        let entry = self.entry(space)?;
        entry.space.require_scored(label)?;
        let idx = entry
            .space
            .index_of(label)
            .ok_or_else(|| UnknownLabelError::NotMember {
                space: space.to_string(),
                label: label.to_string(),
            })?;
        Ok(entry.centroids[idx].vector())
    }

    /// Labels and centroids of one space, in declaration order.
    pub fn centroids(
        &self,
        space: &str,
    ) -> Result<impl Iterator<Item = (&str, &Centroid)>, UnknownLabelError> {
        let entry = self.entry(space)?;
        Ok(entry
            .space
            .labels
            .iter()
            .map(String::as_str)
            .zip(entry.centroids.iter()))
    }

    pub fn space(&self, name: &str) -> Option<&LabelSpace> {
        self.spaces
            .iter()
            .find(|s| s.space.name == name)
            .map(|s| &s.space)
    }

    pub fn spaces(&self) -> impl Iterator<Item = &LabelSpace> {
        self.spaces.iter().map(|s| &s.space)
    }

    /// Embedding dimensionality every centroid shares.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            spaces: self.spaces.len(),
            centroids: self.spaces.iter().map(|s| s.centroids.len()).sum(),
            prototypes: self
                .spaces
                .iter()
                .flat_map(|s| s.centroids.iter())
                .map(|c| c.prototypes)
                .sum(),
            dim: self.dim,
        }
    }

    fn entry(&self, space: &str) -> Result<&SpaceCentroids, UnknownLabelError> {
        self.spaces
            .iter()
            .find(|s| s.space.name == space)
            .ok_or_else(|| UnknownLabelError::Space(space.to_string()))
    }
}

fn check_spaces(spaces: &[LabelSpace]) -> Result<(), RegistryBuildError> {
    if spaces.is_empty() {
        return Err(RegistryBuildError::NoSpaces);
    }
    for (i, space) in spaces.iter().enumerate() {
        if spaces[..i].iter().any(|s| s.name == space.name) {
            return Err(RegistryBuildError::DuplicateSpace(space.name.clone()));
        }
    }
    Ok(())
}

/// Every corpus label must belong to the space, and the fallback has none.
fn check_corpus(space: &LabelSpace, prototypes: &PrototypeSet) -> Result<(), RegistryBuildError> {
    if !prototypes.has_space(&space.name) {
        return Err(RegistryBuildError::MissingSpace(space.name.clone()));
    }
    for (label, _) in prototypes.labels(&space.name) {
        if space.is_fallback(label) {
            return Err(RegistryBuildError::FallbackPrototypes {
                space: space.name.clone(),
                label: label.to_string(),
            });
        }
        if !space.contains(label) {
            return Err(RegistryBuildError::UnknownLabel {
                space: space.name.clone(),
                label: label.to_string(),
            });
        }
    }
    Ok(())
}

/// Element-wise arithmetic mean. `None` if the result has zero magnitude.
fn mean(vectors: &[Vec<f32>], dim: usize) -> Option<Centroid> {
    let mut sum = vec![0.0f64; dim];
    for v in vectors {
        for (acc, &val) in sum.iter_mut().zip(v) {
            *acc += f64::from(val);
        }
    }
    let count = vectors.len() as f64;
    let vector: Vec<f32> = sum.iter().map(|x| (x / count) as f32).collect();

    let norm = magnitude(&vector);
    if norm > 0.0 && norm.is_finite() {
        Some(Centroid {
            vector,
            norm,
            prototypes: vectors.len(),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingEmbedder;
    use crate::test_support::ScriptedAdapter;

    const T: Duration = Duration::from_secs(5);

    fn tone_space() -> LabelSpace {
        LabelSpace::new("tone", ["Warm", "Cold"], "None")
    }

    fn tone_corpus() -> PrototypeSet {
        let mut set = PrototypeSet::new();
        set.extend("tone", "Warm", ["sunny", "cosy"]);
        set.extend("tone", "Cold", ["icy"]);
        set
    }

    fn tone_adapter() -> ScriptedAdapter {
        ScriptedAdapter::new(3)
            .with("sunny", vec![2.0, 0.0, 0.0])
            .with("cosy", vec![0.0, 2.0, 0.0])
            .with("icy", vec![0.0, 0.0, 1.0])
    }

    #[tokio::test]
    async fn centroid_is_arithmetic_mean() {
        let reg = CentroidRegistry::build(&[tone_space()], &tone_corpus(), &tone_adapter(), T)
            .await
            .unwrap();
        assert_eq!(reg.dim(), 3);
        assert_eq!(reg.centroid_for("tone", "Warm").unwrap(), [1.0, 1.0, 0.0]);
        assert_eq!(reg.centroid_for("tone", "Cold").unwrap(), [0.0, 0.0, 1.0]);

        let s = reg.summary();
        assert_eq!((s.spaces, s.centroids, s.prototypes), (1, 2, 3));
    }

    #[tokio::test]
    async fn centroids_follow_declaration_order() {
        let reg = CentroidRegistry::build(&[tone_space()], &tone_corpus(), &tone_adapter(), T)
            .await
            .unwrap();
        let labels: Vec<&str> = reg.centroids("tone").unwrap().map(|(l, _)| l).collect();
        assert_eq!(labels, ["Warm", "Cold"]);
    }

    #[tokio::test]
    async fn empty_label_fails_build() {
        let mut corpus = PrototypeSet::new();
        corpus.extend("tone", "Warm", ["sunny"]);
        let err = CentroidRegistry::build(&[tone_space()], &corpus, &tone_adapter(), T)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryBuildError::EmptyLabel { ref label, .. } if label == "Cold"));
    }

    #[tokio::test]
    async fn adapter_failure_fails_build() {
        let adapter = ScriptedAdapter::new(3).failing();
        let err = CentroidRegistry::build(&[tone_space()], &tone_corpus(), &adapter, T)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryBuildError::Embedding {
                source: AdapterError::Backend(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn hung_adapter_times_out() {
        let adapter = ScriptedAdapter::new(3).hanging();
        let err = CentroidRegistry::build(
            &[tone_space()],
            &tone_corpus(),
            &adapter,
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            RegistryBuildError::Embedding {
                source: AdapterError::Timeout(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn fallback_prototypes_rejected() {
        let mut corpus = tone_corpus();
        corpus.insert("tone", "None", "whatever");
        let err = CentroidRegistry::build(&[tone_space()], &corpus, &tone_adapter(), T)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryBuildError::FallbackPrototypes { .. }));
    }

    #[tokio::test]
    async fn stray_label_rejected() {
        let mut corpus = tone_corpus();
        corpus.insert("tone", "Lukewarm", "meh");
        let err = CentroidRegistry::build(&[tone_space()], &corpus, &tone_adapter(), T)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryBuildError::UnknownLabel { .. }));
    }

    #[tokio::test]
    async fn missing_space_rejected() {
        let spaces = [tone_space(), LabelSpace::energy()];
        let err = CentroidRegistry::build(&spaces, &tone_corpus(), &tone_adapter(), T)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryBuildError::MissingSpace(ref s) if s == "energy"));
    }

    #[tokio::test]
    async fn duplicate_space_rejected() {
        let spaces = [tone_space(), tone_space()];
        let err = CentroidRegistry::build(&spaces, &tone_corpus(), &tone_adapter(), T)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryBuildError::DuplicateSpace(_)));
    }

    #[tokio::test]
    async fn dimension_mismatch_rejected() {
        let adapter = tone_adapter().with("icy", vec![0.0, 1.0]);
        let err = CentroidRegistry::build(&[tone_space()], &tone_corpus(), &adapter, T)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryBuildError::Dimension {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn vectors_must_match_declared_dim() {
        // Adapter claims 4 dimensions but every vector has 3.
        let adapter = ScriptedAdapter::new(4)
            .with("sunny", vec![2.0, 0.0, 0.0])
            .with("cosy", vec![0.0, 2.0, 0.0])
            .with("icy", vec![0.0, 0.0, 1.0]);
        let err = CentroidRegistry::build(&[tone_space()], &tone_corpus(), &adapter, T)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryBuildError::Dimension {
                expected: 4,
                actual: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn tiny_and_huge_prototypes_keep_their_direction() {
        let adapter = ScriptedAdapter::new(3)
            .with("sunny", vec![1e-25, 0.0, 0.0])
            .with("cosy", vec![1e-25, 0.0, 0.0])
            .with("icy", vec![0.0, 0.0, 1e20]);
        let reg = CentroidRegistry::build(&[tone_space()], &tone_corpus(), &adapter, T)
            .await
            .unwrap();
        let (_, warm) = reg.centroids("tone").unwrap().next().unwrap();
        assert!(warm.norm() > 0.0);
        assert!(reg.centroids("tone").unwrap().all(|(_, c)| c.norm().is_finite()));
    }

    #[tokio::test]
    async fn cancelling_prototypes_are_degenerate() {
        let adapter = tone_adapter()
            .with("sunny", vec![1.0, 0.0, 0.0])
            .with("cosy", vec![-1.0, 0.0, 0.0]);
        let err = CentroidRegistry::build(&[tone_space()], &tone_corpus(), &adapter, T)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryBuildError::Degenerate { .. }));
    }

    #[tokio::test]
    async fn builtin_corpus_builds_with_hashing_embedder() {
        let reg = CentroidRegistry::build(
            &LabelSpace::defaults(),
            &PrototypeSet::builtin(),
            &HashingEmbedder::default(),
            T,
        )
        .await
        .unwrap();
        let s = reg.summary();
        assert_eq!(s.spaces, 2);
        assert_eq!(s.centroids, 9);
        assert_eq!(s.dim, crate::hashing::DEFAULT_HASHING_DIM);
    }

    #[test]
    fn centroid_lookup_errors() {
        let mut map = HashMap::new();
        map.insert(("tone".into(), "Warm".into()), vec![1.0, 0.0]);
        map.insert(("tone".into(), "Cold".into()), vec![0.0, 1.0]);
        let reg = CentroidRegistry::from_centroids(&[tone_space()], map).unwrap();

        assert!(matches!(
            reg.centroid_for("tone", "None"),
            Err(UnknownLabelError::Fallback { .. })
        ));
        assert!(matches!(
            reg.centroid_for("tone", "Hot"),
            Err(UnknownLabelError::NotMember { .. })
        ));
        assert!(matches!(
            reg.centroid_for("mood", "Positive"),
            Err(UnknownLabelError::Space(_))
        ));
    }

    #[test]
    fn from_centroids_requires_every_label() {
        let mut map = HashMap::new();
        map.insert(("tone".into(), "Warm".into()), vec![1.0, 0.0]);
        assert!(matches!(
            CentroidRegistry::from_centroids(&[tone_space()], map),
            Err(RegistryBuildError::EmptyLabel { .. })
        ));
    }

    #[test]
    fn from_centroids_rejects_extras() {
        let mut map = HashMap::new();
        map.insert(("tone".into(), "Warm".into()), vec![1.0, 0.0]);
        map.insert(("tone".into(), "Cold".into()), vec![0.0, 1.0]);
        map.insert(("tone".into(), "None".into()), vec![0.5, 0.5]);
        assert!(matches!(
            CentroidRegistry::from_centroids(&[tone_space()], map),
            Err(RegistryBuildError::FallbackPrototypes { .. })
        ));
    }
}
