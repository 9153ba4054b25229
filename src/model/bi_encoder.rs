use candle_core::{D, DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::check_model_dir;
use super::error::{ModelError, classify_candle_error};
use super::tokenizer::load_batch_tokenizer;
use crate::backend::{RawScorer, ScorerError};
use crate::constants::{BI_ENCODER_CPU_BATCH, BI_ENCODER_GPU_BATCH};
use crate::device::{HardwareProfile, select_device};

/// Bi-encoder reranker: embeds the query and each document separately with a mean-pooled
/// BERT encoder and scores by cosine similarity.
///
/// Faster than [`super::CrossEncoder`] on large candidate sets, usually less precise.
/// Scores fall in `[-1, 1]`.
pub struct BiEncoder {
    model: Arc<BertModel>,
    dtype: DType,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    model_dir: PathBuf,
    max_length: usize,
    batch_size: usize,
    normalize_embeddings: bool,
}

impl std::fmt::Debug for BiEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiEncoder")
            .field("device", &format!("{:?}", self.device))
            .field("dtype", &self.dtype)
            .field("model_dir", &self.model_dir)
            .field("batch_size", &self.batch_size)
            .field("normalize_embeddings", &self.normalize_embeddings)
            .finish()
    }
}

fn load_encoder(model_dir: &Path, device: &Device, dtype: DType) -> candle_core::Result<BertModel> {
    let config_content = std::fs::read_to_string(model_dir.join("config.json"))?;
    let config: Config = serde_json::from_str(&config_content)
        .map_err(|e| candle_core::Error::Msg(format!("Failed to parse config: {}", e)))?;

    // SAFETY: the weights file is not modified while mapped.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[model_dir.join("model.safetensors")], dtype, device)?
    };

    if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
        BertModel::load(vb.pp("bert"), &config)
    } else {
        BertModel::load(vb, &config)
    }
}

/// Default embedding batch for a device.
pub fn default_batch_size(device: &Device) -> usize {
    if device.is_cpu() {
        BI_ENCODER_CPU_BATCH
    } else {
        BI_ENCODER_GPU_BATCH
    }
}

/// Cosine similarity of two embeddings; `0.0` when either is a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl BiEncoder {
    pub fn load(
        model_dir: &Path,
        profile: &HardwareProfile,
        max_length: usize,
    ) -> Result<Self, ModelError> {
        check_model_dir(model_dir)?;

        let device = select_device(profile);
        let batch_size = default_batch_size(&device);
        info!(
            model_path = %model_dir.display(),
            device = ?device,
            max_length,
            batch_size,
            "Loading bi-encoder"
        );

        let model = load_encoder(model_dir, &device, DType::F32).map_err(|e| {
            ModelError::LoadFailed {
                reason: format!("Failed to load BERT encoder: {}", e),
            }
        })?;

        let tokenizer = load_batch_tokenizer(model_dir, max_length).map_err(|e| {
            ModelError::LoadFailed {
                reason: format!("Failed to load tokenizer: {}", e),
            }
        })?;

        info!("Bi-encoder loaded");

        Ok(Self {
            model: Arc::new(model),
            dtype: DType::F32,
            tokenizer: Arc::new(tokenizer),
            device,
            model_dir: model_dir.to_path_buf(),
            max_length,
            batch_size,
            normalize_embeddings: true,
        })
    }

    /// Overrides the embedding batch (clamped to at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Toggles L2 normalization of pooled embeddings. On by default.
    pub fn with_normalize_embeddings(mut self, normalize: bool) -> Self {
        self.normalize_embeddings = normalize;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Embeds `texts` in chunks of the configured batch size.
    pub fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ScorerError> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.batch_size) {
            let encodings = self.tokenizer.encode_batch(chunk.to_vec(), true).map_err(|e| {
                ScorerError::computation_failed(format!("tokenization failed: {e}"))
            })?;

            let rows = encodings.len();
            let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
            let mut ids = Vec::with_capacity(rows * seq_len);
            let mut type_ids = Vec::with_capacity(rows * seq_len);
            let mut mask = Vec::with_capacity(rows * seq_len);
            for encoding in &encodings {
                ids.extend_from_slice(encoding.get_ids());
                type_ids.extend_from_slice(encoding.get_type_ids());
                mask.extend_from_slice(encoding.get_attention_mask());
            }

            debug!(rows, seq_len, dtype = ?self.dtype, "Running bi-encoder batch");
            let pooled = self
                .pooled(ids, type_ids, mask, (rows, seq_len))
                .map_err(|e| classify_candle_error(&e))?;
            embeddings.extend(pooled);
        }

        Ok(embeddings)
    }

    fn pooled(
        &self,
        ids: Vec<u32>,
        type_ids: Vec<u32>,
        mask: Vec<u32>,
        shape: (usize, usize),
    ) -> candle_core::Result<Vec<Vec<f32>>> {
        let input_ids = Tensor::from_vec(ids, shape, &self.device)?;
        let type_ids = Tensor::from_vec(type_ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(mask, shape, &self.device)?;

        let hidden = self
            .model
            .forward(&input_ids, &type_ids, Some(&attention_mask))?
            .to_dtype(DType::F32)?;

        // Padding positions do not contribute to the mean.
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::INFINITY)?;
        let mut pooled = summed.broadcast_div(&counts)?;

        if self.normalize_embeddings {
            let norm = pooled
                .sqr()?
                .sum_keepdim(D::Minus1)?
                .sqrt()?
                .clamp(1e-12, f64::INFINITY)?;
            pooled = pooled.broadcast_div(&norm)?;
        }

        pooled.to_vec2::<f32>()
    }
}

impl RawScorer for BiEncoder {
    fn raw_score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ScorerError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embed(&[query])?
            .pop()
            .ok_or_else(|| ScorerError::computation_failed("query produced no embedding"))?;

        let texts: Vec<&str> = documents.iter().map(String::as_str).collect();
        let document_embeddings = self.embed(&texts)?;

        Ok(document_embeddings
            .iter()
            .map(|doc| cosine_similarity(&query_embedding, doc))
            .collect())
    }

    fn compile(&self) -> Result<Arc<dyn RawScorer>, ScorerError> {
        if self.device.is_cpu() {
            return Err(ScorerError::compilation_unavailable(
                "half-precision execution requires an accelerator",
            ));
        }
        if self.dtype == DType::F16 {
            return Err(ScorerError::compilation_unavailable("model already compiled"));
        }

        let model = load_encoder(&self.model_dir, &self.device, DType::F16).map_err(|e| {
            ScorerError::compilation_unavailable(format!("half-precision load failed: {e}"))
        })?;

        Ok(Arc::new(Self {
            model: Arc::new(model),
            dtype: DType::F16,
            tokenizer: self.tokenizer.clone(),
            device: self.device.clone(),
            model_dir: self.model_dir.clone(),
            max_length: self.max_length,
            batch_size: self.batch_size,
            normalize_embeddings: self.normalize_embeddings,
        }))
    }

    fn name(&self) -> &str {
        "bi-encoder"
    }
}
