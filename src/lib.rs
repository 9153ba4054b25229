//! Adaptive reranking: batching, out-of-memory backoff and score caching in front of a
//! document scoring model.
//!
//! # Public API Surface
//!
//! ## Engine
//! - [`RerankerEngine`] - per-request orchestration (`get_scores`, `rerank`)
//! - [`ScoreResponse`], [`UnscoredDocument`], [`UnscoredCause`], [`RequestStats`]
//! - [`EngineConfig`], [`BatchSizePolicy`]
//!
//! ## Building Blocks
//! - [`DeviceProfiler`], [`HardwareProfile`] - hardware capability detection
//! - [`ScoreCache`] - bounded LRU of (query, document) scores
//! - [`BatchPlanner`], [`BatchSchedule`] - batch sizing and halving backoff
//! - [`ScoringBackend`], [`RawScorer`] - compiled/fallback execution of a scorer
//!
//! ## Scorers
//! - [`CrossEncoder`] - candle BERT/RoBERTa cross-encoder
//! - [`BiEncoder`] - mean-pooled embedding cosine scorer
//! - [`LexicalScorer`] - model-free overlap scorer
//!
//! ## Test/Mock Support
//! [`MockScorer`] and [`StaticProbe`] are available behind
//! `#[cfg(any(test, feature = "mock"))]`.

pub mod backend;
pub mod cache;
pub mod config;
pub mod constants;
pub mod device;
pub mod engine;
pub mod hashing;
pub mod model;
pub mod planner;

#[cfg(any(test, feature = "mock"))]
pub use backend::{CompileBehavior, MockCall, MockPath, MockResponse, MockScorer};
pub use backend::{
    BackendState, BatchError, ExecutionPath, RawScorer, ScorerError, ScoringBackend,
    WarmupReport,
};
pub use cache::{CacheStats, CacheStatus, ScoreCache};
pub use config::{BatchSizePolicy, ConfigError, EngineConfig, ScorerKind};
#[cfg(any(test, feature = "mock"))]
pub use device::StaticProbe;
pub use device::{
    AcceleratorInfo, AcceleratorKind, DeviceProbe, DeviceProfiler, HardwareProfile, Precision,
    ProbeError, SystemProbe,
};
pub use engine::{
    EngineError, RequestStats, RerankerEngine, ScoreResponse, UnscoredCause, UnscoredDocument,
};
pub use hashing::{CacheKey, hash_pair, normalize_text};
pub use model::{BiEncoder, CrossEncoder, LexicalScorer, ModelError, load_scorer};
pub use planner::{
    Backoff, BatchPlanner, BatchReduction, BatchSchedule, BatchSizeSource, initial_batch_size,
};
