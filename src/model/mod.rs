//! Concrete [`RawScorer`](crate::backend::RawScorer) implementations.
//!
//! [`CrossEncoder`] runs a BERT/RoBERTa sequence classifier on candle;
//! [`BiEncoder`] compares mean-pooled sentence embeddings;
//! [`LexicalScorer`] is the model-free stand-in used when no model path is configured.

pub mod bert;
pub mod bi_encoder;
pub mod cross_encoder;
pub mod error;
pub mod lexical;
pub mod tokenizer;


pub use bi_encoder::BiEncoder;
pub use cross_encoder::CrossEncoder;
pub use error::{ModelError, classify_candle_error};
pub use lexical::LexicalScorer;

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::backend::RawScorer;
use crate::config::{EngineConfig, ScorerKind};
use crate::constants::DEFAULT_BI_ENCODER_MODEL;
use crate::device::HardwareProfile;

const REQUIRED_FILES: [&str; 3] = ["config.json", "model.safetensors", "tokenizer.json"];

/// Fails when the directory or one of its model files is missing.
pub fn check_model_dir(model_dir: &Path) -> Result<(), ModelError> {
    if !model_dir.is_dir() {
        return Err(ModelError::ModelNotFound {
            path: model_dir.to_path_buf(),
        });
    }
    for file in REQUIRED_FILES {
        let path = model_dir.join(file);
        if !path.exists() {
            return Err(ModelError::MissingFile { path });
        }
    }
    Ok(())
}

/// Builds the scorer selected by `config.model_path` and `config.scorer`.
pub fn load_scorer(
    config: &EngineConfig,
    profile: &HardwareProfile,
) -> Result<Arc<dyn RawScorer>, ModelError> {
    match (config.model_path.as_deref(), config.scorer) {
        (Some(model_dir), ScorerKind::CrossEncoder) => Ok(Arc::new(CrossEncoder::load(
            model_dir,
            profile,
            config.max_length,
        )?)),
        (Some(model_dir), ScorerKind::BiEncoder) => Ok(Arc::new(BiEncoder::load(
            model_dir,
            profile,
            config.max_length,
        )?)),
        (None, ScorerKind::BiEncoder) => {
            info!(
                expected_model = DEFAULT_BI_ENCODER_MODEL,
                "No model path configured for bi-encoder, using lexical scorer"
            );
            Ok(Arc::new(LexicalScorer::new()))
        }
        (None, ScorerKind::CrossEncoder) => {
            info!("No model path configured, using lexical scorer");
            Ok(Arc::new(LexicalScorer::new()))
        }
    }
}
