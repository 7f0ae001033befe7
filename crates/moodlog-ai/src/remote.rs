//! HTTP embedding client for OpenAI-compatible `/embeddings` endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::{AdapterError, EmbeddingAdapter};

/// Remote embedding service adapter.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dim: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    /// `base_url` should be like `http://localhost:8080/v1` (no trailing slash).
    /// `dim` is the vector length the service is expected to return.
    pub fn new(base_url: String, model: String, dim: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dim,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

/// Reorder response items by `index` and check there is one per input.
fn into_vectors(resp: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>, AdapterError> {
    let mut data = resp.data;
    if data.len() != expected {
        return Err(AdapterError::Malformed(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingAdapter for RemoteEmbedder {
    fn name(&self) -> &str {
        "remote"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| AdapterError::Malformed("empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AdapterError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let url = self.endpoint();
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        debug!(url = %url, count = texts.len(), "requesting remote embeddings");
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Backend(format!("HTTP request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::Backend(format!(
                "server returned {}: {body}",
                status.as_u16()
            )));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(format!("JSON parse error: {e}")))?;
        into_vectors(parsed, texts.len())
    }
}
