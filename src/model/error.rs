use std::path::PathBuf;
use thiserror::Error;

use crate::backend::ScorerError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model directory not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("missing model file: {path}")]
    MissingFile { path: PathBuf },

    #[error("failed to load model: {reason}")]
    LoadFailed { reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("inference failed: {reason}")]
    InferenceFailed { reason: String },
}

impl From<candle_core::Error> for ModelError {
    fn from(err: candle_core::Error) -> Self {
        ModelError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::LoadFailed {
            reason: err.to_string(),
        }
    }
}

const OUT_OF_MEMORY_MARKERS: [&str; 4] = [
    "out of memory",
    "CUDA_ERROR_OUT_OF_MEMORY",
    "OutOfMemory",
    "failed to allocate",
];

/// Maps a candle failure onto the scorer contract; allocator failures are recoverable.
pub fn classify_candle_error(err: &candle_core::Error) -> ScorerError {
    let message = err.to_string();
    let lowered = message.to_ascii_lowercase();
    if OUT_OF_MEMORY_MARKERS
        .iter()
        .any(|marker| lowered.contains(&marker.to_ascii_lowercase()))
    {
        ScorerError::resource_exhausted(message)
    } else {
        ScorerError::computation_failed(message)
    }
}
