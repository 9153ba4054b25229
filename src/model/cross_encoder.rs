use candle_core::{DType, Device, Tensor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::bert::BertClassifier;
use super::error::{ModelError, classify_candle_error};
use super::check_model_dir;
use super::tokenizer::load_batch_tokenizer;
use crate::backend::{RawScorer, ScorerError};
use crate::device::{HardwareProfile, select_device};

/// Token ids, type ids and attention mask for one padded batch, row-major.
struct EncodedBatch {
    ids: Vec<u32>,
    type_ids: Vec<u32>,
    mask: Vec<u32>,
    rows: usize,
    seq_len: usize,
}

/// Cross-encoder reranker: scores `(query, document)` pairs with a sequence classifier.
///
/// Scores are raw logits. The compiled variant reloads the same weights at half
/// precision and is only available on an accelerator.
pub struct CrossEncoder {
    model: BertClassifier,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    model_dir: PathBuf,
    max_length: usize,
}

impl std::fmt::Debug for CrossEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossEncoder")
            .field("device", &format!("{:?}", self.device))
            .field("dtype", &self.model.dtype())
            .field("model_dir", &self.model_dir)
            .field("max_length", &self.max_length)
            .finish()
    }
}

impl CrossEncoder {
    pub fn load(
        model_dir: &Path,
        profile: &HardwareProfile,
        max_length: usize,
    ) -> Result<Self, ModelError> {
        check_model_dir(model_dir)?;

        let device = select_device(profile);
        info!(
            model_path = %model_dir.display(),
            device = ?device,
            max_length,
            "Loading cross-encoder"
        );

        let model = BertClassifier::load(model_dir, &device, DType::F32).map_err(|e| {
            ModelError::LoadFailed {
                reason: format!("Failed to load BERT model: {}", e),
            }
        })?;

        let tokenizer = load_batch_tokenizer(model_dir, max_length).map_err(|e| {
            ModelError::LoadFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            }
        })?;

        info!("Cross-encoder loaded");

        Ok(Self {
            model,
            tokenizer: Arc::new(tokenizer),
            device,
            model_dir: model_dir.to_path_buf(),
            max_length,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn dtype(&self) -> DType {
        self.model.dtype()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn encode(&self, query: &str, documents: &[String]) -> Result<EncodedBatch, ScorerError> {
        let pairs: Vec<(&str, &str)> = documents.iter().map(|d| (query, d.as_str())).collect();
        let encodings = self.tokenizer.encode_batch(pairs, true).map_err(|e| {
            ScorerError::computation_failed(format!("tokenization failed: {e}"))
        })?;

        let rows = encodings.len();
        let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
        let mut batch = EncodedBatch {
            ids: Vec::with_capacity(rows * seq_len),
            type_ids: Vec::with_capacity(rows * seq_len),
            mask: Vec::with_capacity(rows * seq_len),
            rows,
            seq_len,
        };

        for encoding in &encodings {
            batch.ids.extend_from_slice(encoding.get_ids());
            batch.type_ids.extend_from_slice(encoding.get_type_ids());
            batch.mask.extend_from_slice(encoding.get_attention_mask());
        }

        Ok(batch)
    }

    fn run(&self, batch: EncodedBatch) -> candle_core::Result<Vec<f32>> {
        let shape = (batch.rows, batch.seq_len);
        let input_ids = Tensor::from_vec(batch.ids, shape, &self.device)?;
        let type_ids = Tensor::from_vec(batch.type_ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(batch.mask, shape, &self.device)?;

        let logits = self
            .model
            .forward(&input_ids, &type_ids, Some(&attention_mask))?;

        logits.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()
    }
}

impl RawScorer for CrossEncoder {
    fn raw_score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ScorerError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let batch = self.encode(query, documents)?;
        debug!(
            rows = batch.rows,
            seq_len = batch.seq_len,
            dtype = ?self.model.dtype(),
            "Running cross-encoder batch"
        );

        self.run(batch).map_err(|e| classify_candle_error(&e))
    }

    fn compile(&self) -> Result<Arc<dyn RawScorer>, ScorerError> {
        if self.device.is_cpu() {
            return Err(ScorerError::compilation_unavailable(
                "half-precision execution requires an accelerator",
            ));
        }
        if self.model.dtype() == DType::F16 {
            return Err(ScorerError::compilation_unavailable("model already compiled"));
        }

        let model = BertClassifier::load(&self.model_dir, &self.device, DType::F16).map_err(|e| {
            ScorerError::compilation_unavailable(format!("half-precision load failed: {e}"))
        })?;

        Ok(Arc::new(Self {
            model,
            tokenizer: self.tokenizer.clone(),
            device: self.device.clone(),
            model_dir: self.model_dir.clone(),
            max_length: self.max_length,
        }))
    }

    fn name(&self) -> &str {
        "cross-encoder"
    }
}
