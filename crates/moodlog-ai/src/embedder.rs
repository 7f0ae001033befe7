//! ONNX Runtime sentence embeddings for journal text.
//!
//! Runs a sentence-transformers model (all-MiniLM-L6-v2 by default, 384
//! dimensions) with attention-masked mean pooling and L2 normalization.
//! The model directory must contain `model.onnx` and `tokenizer.json`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::adapter::{AdapterError, EmbeddingAdapter};

/// Token limit for MiniLM; longer entries are truncated.
const MAX_TOKENS: usize = 256;

/// Synchronous model handle. Inference needs `&mut`, so the adapter wraps it.
struct OnnxModel {
    session: Session,
    tokenizer: Tokenizer,
    dim: usize,
}

impl OnnxModel {
    fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let dim = output_dim(session.outputs()[0].dtype()).unwrap_or(384);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

        info!(dim, model = %model_path.display(), "loaded embedding model");
        Ok(Self {
            session,
            tokenizer,
            dim,
        })
    }

    fn run(&mut self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let batch = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        // Flat [batch, seq_len] inputs; padding positions stay zero.
        let mut ids = vec![0i64; batch * seq_len];
        let mut mask = vec![0i64; batch * seq_len];
        let mut type_ids = vec![0i64; batch * seq_len];
        for (row, enc) in encodings.iter().enumerate() {
            let base = row * seq_len;
            let cells = enc
                .get_ids()
                .iter()
                .zip(enc.get_attention_mask())
                .zip(enc.get_type_ids());
            for (col, ((&id, &m), &t)) in cells.enumerate() {
                ids[base + col] = id as i64;
                mask[base + col] = m as i64;
                type_ids[base + col] = t as i64;
            }
        }

        let shape = [batch as i64, seq_len as i64];
        let outputs = self.session.run(ort::inputs![
            "input_ids" => Tensor::from_array((shape, ids.into_boxed_slice()))?,
            "attention_mask" => Tensor::from_array((shape, mask.clone().into_boxed_slice()))?,
            "token_type_ids" => Tensor::from_array((shape, type_ids.into_boxed_slice()))?,
        ])?;

        // Token embeddings: [batch, tokens, dim].
        let (out_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = out_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] as usize == batch && dims[2] as usize == self.dim,
            "unexpected output shape {dims:?}, expected [{batch}, _, {}]",
            self.dim
        );
        let tokens = dims[1] as usize;

        let vectors = (0..batch)
            .map(|row| {
                let mut pooled = vec![0.0f32; self.dim];
                let mut kept = 0.0f32;
                for tok in 0..tokens.min(seq_len) {
                    if mask[row * seq_len + tok] == 0 {
                        continue;
                    }
                    let offset = (row * tokens + tok) * self.dim;
                    for (p, &x) in pooled.iter_mut().zip(&data[offset..offset + self.dim]) {
                        *p += x;
                    }
                    kept += 1.0;
                }
                if kept > 0.0 {
                    pooled.iter_mut().for_each(|p| *p /= kept);
                }
                normalize(&mut pooled);
                pooled
            })
            .collect();

        Ok(vectors)
    }
}

/// [`EmbeddingAdapter`] over a local ONNX sentence-transformers model.
///
/// Cheap to clone; clones share one model. Inference runs on Tokio's blocking
/// pool, serialized by a mutex around the session.
#[derive(Clone)]
pub struct OnnxEmbedder {
    model: Arc<Mutex<OnnxModel>>,
    dim: usize,
}

impl OnnxEmbedder {
    /// Load a model from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model = OnnxModel::load(model_dir)?;
        let dim = model.dim;
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dim,
        })
    }

    async fn run_blocking(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AdapterError> {
        let model = Arc::clone(&self.model);
        let count = texts.len();
        let result = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| anyhow::anyhow!("embedding model lock poisoned"))?;
            model.run(&texts)
        })
        .await
        .map_err(|e| AdapterError::Backend(format!("embedding task failed: {e}")))?;

        let vectors = result.map_err(|e| AdapterError::Backend(format!("{e:#}")))?;
        debug!(count, "onnx embeddings computed");
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingAdapter for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        if text.trim().is_empty() {
            return Err(AdapterError::Unsupported("empty text".into()));
        }
        self.run_blocking(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AdapterError::Malformed("model returned no vector".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AdapterError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(AdapterError::Unsupported("empty text in batch".into()));
        }
        self.run_blocking(texts.iter().map(|t| t.to_string()).collect())
            .await
    }
}

/// L2-normalize a vector in place.
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Embedding dimension from the model's output type: the last axis.
fn output_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}
