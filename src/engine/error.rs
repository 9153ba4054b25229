use thiserror::Error;

use crate::config::ConfigError;
use crate::model::ModelError;

/// Caller-facing hard failures. Partial scoring failures are never reported here; they
/// surface as [`super::UnscoredCause`] entries in the response.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("internal invariant violated: {reason}")]
    Internal { reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}
