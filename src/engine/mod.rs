//! The reranker engine: cache lookup, batch planning with OOM backoff, scoring.
//!
//! One [`RerankerEngine::get_scores`] call:
//!
//! 1. looks every document up in the [`ScoreCache`] (hits never reach the backend),
//! 2. queues the distinct misses in a [`BatchSchedule`] seeded from the shared working
//!    batch size,
//! 3. scores batch by batch, halving the size on resource exhaustion and retrying only
//!    the unprocessed remainder,
//! 4. caches every computed score and assembles results in input order.
//!
//! Cache and working batch size sit behind one mutex that is held only while they are
//! read or mutated; scoring calls run outside it. Two concurrent requests may therefore
//! compute the same miss twice; the cache keeps the last write.

pub mod error;
pub mod types;


pub use error::EngineError;
pub use types::{RequestStats, ScoreResponse, UnscoredCause, UnscoredDocument};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::{
    BackendState, BatchError, ExecutionPath, RawScorer, ScoringBackend, WarmupReport,
};
use crate::cache::{CacheStats, ScoreCache};
use crate::config::EngineConfig;
use crate::device::{DeviceProfiler, HardwareProfile};
use crate::hashing::CacheKey;
use crate::model;
use crate::planner::{Backoff, BatchPlanner, BatchSchedule};

struct EngineState {
    cache: ScoreCache,
    planner: BatchPlanner,
}

/// A distinct cache miss and every input position that shares it.
#[derive(Debug)]
struct PendingDocument {
    key: CacheKey,
    text: String,
    indices: Vec<usize>,
}

pub struct RerankerEngine {
    config: EngineConfig,
    profile: HardwareProfile,
    backend: ScoringBackend,
    warmup: WarmupReport,
    state: Mutex<EngineState>,
}

impl std::fmt::Debug for RerankerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankerEngine")
            .field("profile", &self.profile)
            .field("backend", &self.backend)
            .field("working_batch_size", &self.working_batch_size())
            .field("cache_len", &self.cache_len())
            .finish()
    }
}

impl RerankerEngine {
    /// Profiles the host and builds an engine around `scorer`.
    pub async fn new(config: EngineConfig, scorer: Arc<dyn RawScorer>) -> Result<Self, EngineError> {
        Self::with_profiler(config, &DeviceProfiler::system(), scorer).await
    }

    pub async fn with_profiler(
        config: EngineConfig,
        profiler: &DeviceProfiler,
        scorer: Arc<dyn RawScorer>,
    ) -> Result<Self, EngineError> {
        let profile = profiler.profile();
        Self::with_profile(config, profile, scorer).await
    }

    /// Builds an engine for a known profile, then compiles and warms up the backend.
    pub async fn with_profile(
        config: EngineConfig,
        profile: HardwareProfile,
        scorer: Arc<dyn RawScorer>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let planner = BatchPlanner::new(&profile, config.batch_size, config.batch_size_policy);
        let cache = ScoreCache::new(config.cache_size);
        let backend = ScoringBackend::new(scorer, config.deadline());

        info!(
            accelerator = %profile.accelerator_kind(),
            initial_batch_size = planner.initial_batch_size(),
            batch_size_source = ?planner.source(),
            cache_size = config.cache_size,
            compile_model = config.compile_model,
            warm_up = config.warm_up,
            "Initializing reranker engine"
        );

        let warmup = backend.initialize(config.compile_model, config.warm_up).await;

        Ok(Self {
            config,
            profile,
            backend,
            warmup,
            state: Mutex::new(EngineState { cache, planner }),
        })
    }

    /// Builds the engine with the scorer named by the config: the cross-encoder at
    /// `model_path`, or the lexical scorer when no path is set.
    pub async fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let profile = DeviceProfiler::system().profile();

        let load_config = config.clone();
        let scorer = tokio::task::spawn_blocking(move || model::load_scorer(&load_config, &profile))
            .await
            .map_err(|e| EngineError::Internal {
                reason: format!("model loading task aborted: {e}"),
            })??;

        Self::with_profile(config, profile, scorer).await
    }

    /// Scores `documents` against `query`; `scores[i]` belongs to `documents[i]`.
    ///
    /// Only an empty query is a hard error. Documents that cannot be scored come back
    /// as `None` with a matching [`UnscoredDocument`].
    pub async fn get_scores<S: AsRef<str>>(
        &self,
        query: &str,
        documents: &[S],
    ) -> Result<ScoreResponse, EngineError> {
        let started = Instant::now();

        if query.trim().is_empty() {
            return Err(EngineError::InvalidRequest {
                reason: "query must not be empty".to_string(),
            });
        }
        if documents.is_empty() {
            return Ok(ScoreResponse::empty());
        }

        let mut scores: Vec<Option<f32>> = vec![None; documents.len()];
        let mut unscored: Vec<UnscoredDocument> = Vec::new();
        let mut stats = RequestStats {
            documents: documents.len(),
            ..Default::default()
        };

        let mut schedule = {
            let mut state = self.state.lock();
            let pending = Self::partition(&mut state.cache, query, documents, &mut scores, &mut stats);
            state.planner.schedule(pending)
        };

        if schedule.is_done() {
            debug!(documents = documents.len(), "All documents served from cache");
        } else {
            self.run_schedule(query, &mut schedule, &mut scores, &mut unscored, &mut stats)
                .await;
            stats.final_batch_size = schedule.working_batch_size();
        }

        let missing = scores.iter().filter(|s| s.is_none()).count();
        if missing != unscored.len() {
            return Err(EngineError::Internal {
                reason: format!(
                    "{missing} documents without score but {} unscored records",
                    unscored.len()
                ),
            });
        }

        unscored.sort_by_key(|u| u.index);
        stats.scored = documents.len() - unscored.len();
        stats.unscored = unscored.len();
        stats.elapsed = started.elapsed();

        info!(
            documents = stats.documents,
            cache_hits = stats.cache_hits,
            scored = stats.scored,
            unscored = stats.unscored,
            backend_calls = stats.backend_calls,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            docs_per_sec = stats.docs_per_sec(),
            "Scored documents"
        );

        Ok(ScoreResponse {
            scores,
            unscored,
            stats,
        })
    }

    /// `(index, score)` pairs for the scored documents, best first.
    pub async fn rerank<S: AsRef<str>>(
        &self,
        query: &str,
        documents: &[S],
    ) -> Result<Vec<(usize, f32)>, EngineError> {
        Ok(self.get_scores(query, documents).await?.ranked())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn profile(&self) -> &HardwareProfile {
        &self.profile
    }

    pub fn backend_state(&self) -> BackendState {
        self.backend.state()
    }

    pub fn execution_path(&self) -> ExecutionPath {
        self.backend.execution_path()
    }

    /// Outcome of compilation and warm-up at construction.
    pub fn warmup_report(&self) -> &WarmupReport {
        &self.warmup
    }

    pub fn compile_attempts(&self) -> u32 {
        self.backend.compile_attempts()
    }

    pub fn working_batch_size(&self) -> usize {
        self.state.lock().planner.working_batch_size()
    }

    pub fn initial_batch_size(&self) -> usize {
        self.state.lock().planner.initial_batch_size()
    }

    /// Restores the initial batch size (explicit reinitialization).
    pub fn reset_batch_size(&self) {
        self.state.lock().planner.reset();
    }

    pub fn cache_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.state.lock().cache.stats()
    }

    pub fn clear_cache(&self) {
        self.state.lock().cache.clear();
    }

    /// Splits documents into cache hits (written into `scores`) and distinct misses.
    fn partition<S: AsRef<str>>(
        cache: &mut ScoreCache,
        query: &str,
        documents: &[S],
        scores: &mut [Option<f32>],
        stats: &mut RequestStats,
    ) -> Vec<PendingDocument> {
        let mut pending: Vec<PendingDocument> = Vec::new();
        let mut positions: HashMap<CacheKey, usize> = HashMap::new();

        for (idx, document) in documents.iter().enumerate() {
            let document = document.as_ref();
            let key = CacheKey::new(query, document);

            if let Some(score) = cache.get(&key) {
                scores[idx] = Some(score);
                stats.cache_hits += 1;
                continue;
            }

            stats.cache_misses += 1;
            match positions.get(&key) {
                Some(&slot) => pending[slot].indices.push(idx),
                None => {
                    positions.insert(key, pending.len());
                    pending.push(PendingDocument {
                        key,
                        text: document.to_string(),
                        indices: vec![idx],
                    });
                }
            }
        }

        stats.unique_misses = pending.len();
        pending
    }

    async fn run_schedule(
        &self,
        query: &str,
        schedule: &mut BatchSchedule<PendingDocument>,
        scores: &mut [Option<f32>],
        unscored: &mut Vec<UnscoredDocument>,
        stats: &mut RequestStats,
    ) {
        let query: Arc<str> = Arc::from(query);

        while let Some(batch) = schedule.next_batch() {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            stats.backend_calls += 1;

            match self.backend.score(query.clone(), texts).await {
                Ok(batch_scores) => {
                    let mut state = self.state.lock();
                    for (item, score) in batch.iter().zip(batch_scores) {
                        state.cache.put(item.key, score);
                        for &idx in &item.indices {
                            scores[idx] = Some(score);
                        }
                    }
                }
                Err(BatchError::ResourceExhausted { reason }) => {
                    match schedule.on_resource_exhausted(batch) {
                        Backoff::Retry(reduction) => {
                            warn!(
                                old_size = reduction.from,
                                new_size = reduction.to,
                                cause = "resource_exhausted",
                                reason = %reason,
                                "Reducing batch size"
                            );
                            stats.batch_reductions += 1;
                            self.state.lock().planner.record_reduction(reduction);
                        }
                        Backoff::Exhausted(items) => {
                            Self::mark_unscored(unscored, items, UnscoredCause::ResourceExhausted)
                        }
                    }
                }
                Err(BatchError::ComputationFailed { reason }) => {
                    Self::mark_unscored(unscored, batch, UnscoredCause::ComputationFailed { reason })
                }
                Err(BatchError::DeadlineExceeded { timeout }) => Self::mark_unscored(
                    unscored,
                    batch,
                    UnscoredCause::DeadlineExceeded {
                        timeout_ms: timeout.as_millis() as u64,
                    },
                ),
            }
        }
    }

    fn mark_unscored(
        unscored: &mut Vec<UnscoredDocument>,
        items: Vec<PendingDocument>,
        cause: UnscoredCause,
    ) {
        for item in items {
            for index in item.indices {
                warn!(index, cause = %cause, "Document left unscored");
                unscored.push(UnscoredDocument {
                    index,
                    cause: cause.clone(),
                });
            }
        }
    }
}
