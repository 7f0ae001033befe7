//! In-memory adapter for tests: a fixed text → vector table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::adapter::{AdapterError, EmbeddingAdapter};

pub struct ScriptedAdapter {
    dim: usize,
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
    failing: bool,
    hanging: bool,
}

impl ScriptedAdapter {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            table: HashMap::new(),
            calls: AtomicUsize::new(0),
            failing: false,
            hanging: false,
        }
    }

    pub fn with(mut self, text: &str, v: Vec<f32>) -> Self {
        self.table.insert(text.to_string(), v);
        self
    }

    /// Every call fails with a backend error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Every call never completes.
    pub fn hanging(mut self) -> Self {
        self.hanging = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hanging {
            std::future::pending::<()>().await;
        }
        if self.failing {
            return Err(AdapterError::Backend("model service overloaded".into()));
        }
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| AdapterError::Unsupported(format!("no vector scripted for {text:?}")))
    }
}
