//! Cross-cutting, shared constants.
//!
//! The batch-size heuristic table lives here so it can be tested independently of the
//! planner's control logic.

/// One gigabyte as used by the heuristic memory buckets (10^9 bytes).
pub const GB: u64 = 1_000_000_000;

/// Initial batch size for a discrete GPU with at least [`HIGH_END_GPU_MEMORY`].
pub const DISCRETE_GPU_HIGH_BATCH: usize = 128;
/// Initial batch size for a discrete GPU with at least [`MID_RANGE_GPU_MEMORY`].
pub const DISCRETE_GPU_MID_BATCH: usize = 64;
/// Initial batch size for a small (or unmeasured) discrete GPU.
pub const DISCRETE_GPU_LOW_BATCH: usize = 32;
/// Initial batch size for an integrated accelerator (unified memory).
pub const INTEGRATED_BATCH: usize = 64;
/// Initial batch size when no accelerator is present.
pub const CPU_BATCH: usize = 16;

pub const HIGH_END_GPU_MEMORY: u64 = 24 * GB;
pub const MID_RANGE_GPU_MEMORY: u64 = 12 * GB;

/// Default number of cached (query, document) scores.
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Default maximum token length handed to the scoring model.
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Model the bi-encoder is tuned for; any BERT-family sentence embedder loads.
pub const DEFAULT_BI_ENCODER_MODEL: &str = "BAAI/bge-base-en-v1.5";
/// Bi-encoder embedding batch on an accelerator.
pub const BI_ENCODER_GPU_BATCH: usize = 256;
/// Bi-encoder embedding batch on CPU.
pub const BI_ENCODER_CPU_BATCH: usize = 64;

/// Query used by warm-up and compilation canary calls.
pub const CANARY_QUERY: &str = "This is a sample query for warming up the model";

/// Documents used by warm-up and compilation canary calls.
pub const CANARY_DOCUMENTS: [&str; 2] = [
    "This is a sample passage to warm up the reranking model",
    "Another sample passage for model initialization",
];
