//! The embedding adapter seam: text in, fixed-dimension vector out.
//!
//! The inference core treats the embedding model as a black box behind
//! [`EmbeddingAdapter`]. Implementations must be deterministic for identical
//! text and safe to call from many tasks at once.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),

    #[error("unsupported input: {0}")]
    Unsupported(String),

    #[error("malformed embedding: {0}")]
    Malformed(String),

    #[error("embedding backend failed: {0}")]
    Backend(String),
}

/// Maps text to a vector of [`dim`](Self::dim) floats.
#[async_trait]
pub trait EmbeddingAdapter: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &str;

    /// Dimensionality of every vector this adapter produces.
    fn dim(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError>;

    /// Embed several texts, one vector per input in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AdapterError> {
        futures::future::try_join_all(texts.iter().map(|t| self.embed(t))).await
    }
}

/// Run an adapter future under a deadline.
///
/// Dropping the returned future cancels the pending adapter call.
pub async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, AdapterError>>,
) -> Result<T, AdapterError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::Timeout(limit)),
    }
}

/// Reject vectors of the wrong length or with non-finite components.
pub fn check_embedding(v: &[f32], dim: usize) -> Result<(), AdapterError> {
    if v.len() != dim {
        return Err(AdapterError::Malformed(format!(
            "expected {dim} dimensions, got {}",
            v.len()
        )));
    }
    if let Some(i) = v.iter().position(|x| !x.is_finite()) {
        return Err(AdapterError::Malformed(format!(
            "non-finite value at index {i}"
        )));
    }
    Ok(())
}
