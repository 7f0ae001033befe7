//! Engine configuration: decision thresholds per label space, adapter timeout,
//! and the optional prototype corpus location.
//!
//! Loaded from a JSON file; every field has a default so an empty object `{}`
//! is a valid configuration. Changing these values never requires code
//! changes, only rebuilding the centroid registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::labels::{ENERGY_SPACE, MOOD_SPACE};

/// Default lower bound on the best cosine score before falling back to Unknown.
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f32 = 0.20;

/// Default minimum gap between the top two scores before blending to Mixed.
pub const DEFAULT_AMBIGUITY_MARGIN: f32 = 0.03;

/// Default bound on a single embedding adapter call.
pub const DEFAULT_EMBED_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Decision thresholds for one label space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpacePolicy {
    /// Best score strictly below this returns the fallback label. In [-1, 1].
    #[serde(default = "default_low_confidence")]
    pub low_confidence_threshold: f32,
    /// A gap strictly below this between the top two scores triggers the
    /// space's blend label, if it has one. Non-negative.
    #[serde(default = "default_margin")]
    pub ambiguity_margin: f32,
}

impl Default for SpacePolicy {
    fn default() -> Self {
        Self {
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            ambiguity_margin: DEFAULT_AMBIGUITY_MARGIN,
        }
    }
}

impl SpacePolicy {
    pub fn new(low_confidence_threshold: f32, ambiguity_margin: f32) -> Self {
        Self {
            low_confidence_threshold,
            ambiguity_margin,
        }
    }

    fn validate(&self, space: &str) -> Result<(), ConfigError> {
        let t = self.low_confidence_threshold;
        if !(-1.0..=1.0).contains(&t) {
            return Err(ConfigError::Invalid(format!(
                "{space}: low_confidence_threshold {t} outside [-1, 1]"
            )));
        }
        let m = self.ambiguity_margin;
        if !m.is_finite() || m < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "{space}: ambiguity_margin {m} must be finite and >= 0"
            )));
        }
        Ok(())
    }
}

/// Top-level configuration consumed by the inference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub embed_timeout_ms: u64,
    /// space name → thresholds. Spaces not listed use [`SpacePolicy::default`].
    pub spaces: BTreeMap<String, SpacePolicy>,
    /// Prototype corpus JSON. `None` selects the built-in corpus.
    pub prototypes: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut spaces = BTreeMap::new();
        spaces.insert(MOOD_SPACE.to_string(), SpacePolicy::default());
        spaces.insert(ENERGY_SPACE.to_string(), SpacePolicy::default());
        Self {
            embed_timeout_ms: DEFAULT_EMBED_TIMEOUT_MS,
            spaces,
            prototypes: None,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    ///
    /// A relative `prototypes` path is resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(proto) = &config.prototypes
            && proto.is_relative()
            && let Some(dir) = path.parent()
        {
            config.prototypes = Some(dir.join(proto));
        }

        config.validate()?;
        debug!(path = %path.display(), spaces = config.spaces.len(), "loaded engine config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embed_timeout_ms == 0 {
            return Err(ConfigError::Invalid("embed_timeout_ms must be > 0".into()));
        }
        for (space, policy) in &self.spaces {
            policy.validate(space)?;
        }
        Ok(())
    }

    /// Thresholds for `space`, or the defaults if it is not configured.
    pub fn policy(&self, space: &str) -> SpacePolicy {
        self.spaces.get(space).copied().unwrap_or_default()
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }
}

fn default_low_confidence() -> f32 {
    DEFAULT_LOW_CONFIDENCE_THRESHOLD
}

fn default_margin() -> f32 {
    DEFAULT_AMBIGUITY_MARGIN
}
