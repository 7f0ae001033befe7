//! Inference core: embedding adapters, prototype centroids, and the
//! mood/energy classifier built on top of them.

pub mod adapter;
pub mod classifier;
pub mod engine;
pub mod eval;
pub mod hashing;
pub mod prototypes;
pub mod registry;

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(feature = "onnx")]
pub use embedder::OnnxEmbedder;

#[cfg(feature = "http")]
mod remote;
#[cfg(feature = "http")]
pub use remote::RemoteEmbedder;

#[cfg(test)]
mod test_support;

pub use adapter::{AdapterError, EmbeddingAdapter};
pub use classifier::{Classification, Classifier, Decision, LabelScore, ScoreVector};
pub use engine::{InferenceEngine, InferenceError};
pub use eval::{EvalReport, EvalSample, evaluate, load_samples};
pub use hashing::{DEFAULT_HASHING_DIM, HashingEmbedder};
pub use prototypes::{PrototypeSet, PrototypeSummary};
pub use registry::{CentroidRegistry, RegistryBuildError, RegistrySummary};
