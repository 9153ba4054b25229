//! Environment- and JSON-backed engine configuration.
//!
//! Every setting has a default. Override with `RERANK_*` environment variables or load a
//! JSON document with [`EngineConfig::from_json_str`].

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{DEFAULT_CACHE_SIZE, DEFAULT_MAX_LENGTH};

/// What happens to a shrunk working batch size when the next request starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSizePolicy {
    /// Keep the shrunk size for the engine's lifetime.
    #[default]
    Persist,
    /// Start every request from the initial (heuristic or explicit) size again.
    ResetPerRequest,
}

impl BatchSizePolicy {
    /// Parses `persist` / `reset` / `reset_per_request` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "persist" => Some(Self::Persist),
            "reset" | "reset_per_request" | "reset-per-request" => Some(Self::ResetPerRequest),
            _ => None,
        }
    }
}

/// Which model architecture loads from `model_path`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    /// Joint (query, document) sequence classifier.
    #[default]
    CrossEncoder,
    /// Separate embeddings compared by cosine similarity.
    BiEncoder,
}

impl ScorerKind {
    /// Parses `cross_encoder` / `bi_encoder` (case-insensitive, `-` accepted).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cross_encoder" | "cross" => Some(Self::CrossEncoder),
            "bi_encoder" | "bi" => Some(Self::BiEncoder),
            _ => None,
        }
    }
}

/// Engine configuration.
///
/// Consumed by [`crate::RerankerEngine`]; the engine never writes back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Explicit batch size. `None` auto-detects via the hardware profile.
    pub batch_size: Option<usize>,

    /// Maximum input length (tokens) passed to the scoring model. Default: `512`.
    pub max_length: usize,

    /// Attempt the compiled/accelerated execution path. Default: `true`.
    pub compile_model: bool,

    /// Issue canary calls before serving traffic. Default: `true`.
    pub warm_up: bool,

    /// Max cached (query, document) scores; `0` disables caching. Default: `1000`.
    pub cache_size: usize,

    /// Whether a backoff-shrunk batch size survives into the next request.
    pub batch_size_policy: BatchSizePolicy,

    /// Per sub-batch scoring deadline in milliseconds. `None` waits indefinitely.
    pub deadline_ms: Option<u64>,

    /// Model directory (`config.json`, `model.safetensors`, `tokenizer.json`).
    /// `None` selects the lexical stub scorer.
    pub model_path: Option<PathBuf>,

    /// Architecture of the model in `model_path`. Default: cross-encoder.
    pub scorer: ScorerKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            max_length: DEFAULT_MAX_LENGTH,
            compile_model: true,
            warm_up: true,
            cache_size: DEFAULT_CACHE_SIZE,
            batch_size_policy: BatchSizePolicy::Persist,
            deadline_ms: None,
            model_path: None,
            scorer: ScorerKind::CrossEncoder,
        }
    }
}

impl EngineConfig {
    const ENV_BATCH_SIZE: &'static str = "RERANK_BATCH_SIZE";
    const ENV_MAX_LENGTH: &'static str = "RERANK_MAX_LENGTH";
    const ENV_COMPILE_MODEL: &'static str = "RERANK_COMPILE_MODEL";
    const ENV_WARM_UP: &'static str = "RERANK_WARM_UP";
    const ENV_CACHE_SIZE: &'static str = "RERANK_CACHE_SIZE";
    const ENV_BATCH_POLICY: &'static str = "RERANK_BATCH_POLICY";
    const ENV_DEADLINE_MS: &'static str = "RERANK_DEADLINE_MS";
    const ENV_MODEL_PATH: &'static str = "RERANK_MODEL_PATH";
    const ENV_SCORER: &'static str = "RERANK_SCORER";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let batch_size = Self::parse_optional_usize_from_env(Self::ENV_BATCH_SIZE)?;
        let max_length = Self::parse_optional_usize_from_env(Self::ENV_MAX_LENGTH)?
            .unwrap_or(defaults.max_length);
        let compile_model =
            Self::parse_bool_from_env(Self::ENV_COMPILE_MODEL, defaults.compile_model)?;
        let warm_up = Self::parse_bool_from_env(Self::ENV_WARM_UP, defaults.warm_up)?;
        let cache_size = Self::parse_optional_usize_from_env(Self::ENV_CACHE_SIZE)?
            .unwrap_or(defaults.cache_size);
        let batch_size_policy = Self::parse_policy_from_env(defaults.batch_size_policy)?;
        let deadline_ms = Self::parse_optional_usize_from_env(Self::ENV_DEADLINE_MS)?
            .map(|ms| ms as u64);
        let model_path = Self::parse_optional_path_from_env(Self::ENV_MODEL_PATH);
        let scorer = Self::parse_scorer_from_env(defaults.scorer)?;

        let config = Self {
            batch_size,
            max_length,
            compile_model,
            warm_up,
            cache_size,
            batch_size_policy,
            deadline_ms,
            model_path,
            scorer,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&content)
    }

    /// Validates numeric invariants and the model path (does not load anything).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                name: "batch_size",
                reason: "must be a positive integer".to_string(),
            });
        }

        if self.max_length == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_length",
                reason: "must be a positive integer".to_string(),
            });
        }

        if self.deadline_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                name: "deadline_ms",
                reason: "must be a positive number of milliseconds".to_string(),
            });
        }

        if let Some(ref path) = self.model_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        Ok(())
    }

    /// The configured deadline as a [`Duration`].
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Returns `true` when caching is enabled (`cache_size > 0`).
    pub fn caching_enabled(&self) -> bool {
        self.cache_size > 0
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn with_compile_model(mut self, compile_model: bool) -> Self {
        self.compile_model = compile_model;
        self
    }

    pub fn with_warm_up(mut self, warm_up: bool) -> Self {
        self.warm_up = warm_up;
        self
    }

    pub fn with_batch_size_policy(mut self, policy: BatchSizePolicy) -> Self {
        self.batch_size_policy = policy;
        self
    }

    pub fn with_scorer(mut self, scorer: ScorerKind) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(deadline.as_millis().max(1) as u64);
        self
    }

    fn parse_optional_usize_from_env(var_name: &'static str) -> Result<Option<usize>, ConfigError> {
        match env::var(var_name) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::IntParseError {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(None),
        }
    }

    fn parse_bool_from_env(var_name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match env::var(var_name) {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                "" => Ok(default),
                _ => Err(ConfigError::InvalidValue {
                    name: var_name,
                    reason: format!("expected a boolean, got '{value}'"),
                }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_scorer_from_env(default: ScorerKind) -> Result<ScorerKind, ConfigError> {
        match env::var(Self::ENV_SCORER) {
            Ok(value) if value.trim().is_empty() => Ok(default),
            Ok(value) => ScorerKind::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
                name: Self::ENV_SCORER,
                reason: format!("expected 'cross_encoder' or 'bi_encoder', got '{value}'"),
            }),
            Err(_) => Ok(default),
        }
    }

    fn parse_policy_from_env(default: BatchSizePolicy) -> Result<BatchSizePolicy, ConfigError> {
        match env::var(Self::ENV_BATCH_POLICY) {
            Ok(value) if value.trim().is_empty() => Ok(default),
            Ok(value) => BatchSizePolicy::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
                name: Self::ENV_BATCH_POLICY,
                reason: format!("expected 'persist' or 'reset', got '{value}'"),
            }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}
