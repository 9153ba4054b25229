//! Scoring backend: wraps the external [`RawScorer`] with an optional compiled path.
//!
//! The compiled path is attempted once during [`ScoringBackend::initialize`] and
//! validated with a canary call. Any compiled failure (compile error, wrong-shaped
//! canary, runtime failure) demotes the backend to the fallback path for the rest of
//! its lifetime. Every call runs on a blocking thread; request sub-batches may be
//! bounded by a deadline, canaries are not.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod scorer;
pub mod state;

#[cfg(test)]
mod tests;

pub use error::{BatchError, ScorerError};
#[cfg(any(test, feature = "mock"))]
pub use mock::{CompileBehavior, MockCall, MockPath, MockResponse, MockScorer};
pub use scorer::RawScorer;
pub use state::BackendState;

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::constants::{CANARY_DOCUMENTS, CANARY_QUERY};

/// Which execution path served a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    Compiled,
    Fallback,
}

/// Summary of [`ScoringBackend::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmupReport {
    pub state: BackendState,
    /// Whether a canary call completed successfully.
    pub canary_ok: bool,
    pub duration: Duration,
}

struct Inner {
    state: BackendState,
    compiled: Option<Arc<dyn RawScorer>>,
}

pub struct ScoringBackend {
    fallback: Arc<dyn RawScorer>,
    inner: RwLock<Inner>,
    deadline: Option<Duration>,
    compile_attempts: AtomicU32,
}

impl std::fmt::Debug for ScoringBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringBackend")
            .field("scorer", &self.fallback.name())
            .field("state", &self.state())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl ScoringBackend {
    pub fn new(scorer: Arc<dyn RawScorer>, deadline: Option<Duration>) -> Self {
        Self {
            fallback: scorer,
            inner: RwLock::new(Inner {
                state: BackendState::Uninitialized,
                compiled: None,
            }),
            deadline,
            compile_attempts: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> BackendState {
        self.inner.read().state
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Number of compilation attempts made (0 or 1 per backend lifetime).
    pub fn compile_attempts(&self) -> u32 {
        self.compile_attempts.load(Ordering::Relaxed)
    }

    /// Attempts compilation (when `compile_model`) and runs warm-up canaries.
    ///
    /// Never fails: every problem ends in `ReadyFallback`. Calling it again on a ready
    /// backend is a no-op.
    pub async fn initialize(&self, compile_model: bool, warm_up: bool) -> WarmupReport {
        let started = Instant::now();

        if self.state().is_ready() {
            return WarmupReport {
                state: self.state(),
                canary_ok: false,
                duration: Duration::ZERO,
            };
        }
        self.transition(BackendState::Warming);

        let mut canary_ok = false;

        if compile_model {
            canary_ok = self.try_compile().await;
        } else {
            debug!("Compiled execution disabled by configuration");
            self.transition(BackendState::ReadyFallback);
        }

        if warm_up && !canary_ok {
            info!(scorer = self.fallback.name(), "Warming up scoring backend");
            match self.run_canary(self.fallback.clone()).await {
                Ok(()) => canary_ok = true,
                Err(e) => warn!(error = %e, "Warm-up failed, continuing without it"),
            }
        }

        let duration = started.elapsed();
        if warm_up || compile_model {
            info!(
                warmup_ms = duration.as_millis() as u64,
                state = %self.state(),
                canary_ok,
                "Scoring backend ready"
            );
        }

        WarmupReport {
            state: self.state(),
            canary_ok,
            duration,
        }
    }

    /// Scores one sub-batch on the active path, bounded by the configured deadline.
    ///
    /// A compiled-path computation failure demotes the backend; the error is still
    /// returned so the batch is not executed twice.
    pub async fn score(&self, query: Arc<str>, documents: Vec<String>) -> Result<Vec<f32>, BatchError> {
        let (path, scorer) = self.active();
        let result = self.invoke(scorer, query, documents, self.deadline).await;

        if path == ExecutionPath::Compiled
            && let Err(BatchError::ComputationFailed { ref reason }) = result
        {
            self.demote(reason);
        }
        result
    }

    /// The path the next call will use.
    pub fn execution_path(&self) -> ExecutionPath {
        self.active().0
    }

    async fn try_compile(&self) -> bool {
        self.compile_attempts.fetch_add(1, Ordering::Relaxed);
        info!(scorer = self.fallback.name(), "Compilation attempted");

        let fallback = self.fallback.clone();
        let compiled = tokio::task::spawn_blocking(move || fallback.compile())
            .await
            .unwrap_or_else(|e| Err(ScorerError::computation_failed(e.to_string())));

        let compiled = match compiled {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(error = %e, "Compilation unavailable, using fallback execution");
                self.transition(BackendState::ReadyFallback);
                return false;
            }
        };

        match self.run_canary(compiled.clone()).await {
            Ok(()) => {
                {
                    let mut inner = self.inner.write();
                    inner.compiled = Some(compiled);
                }
                self.transition(BackendState::ReadyCompiled);
                info!("Compilation succeeded");
                true
            }
            Err(e) => {
                warn!(error = %e, "Compiled canary failed, using fallback execution");
                self.transition(BackendState::ReadyFallback);
                false
            }
        }
    }

    async fn run_canary(&self, scorer: Arc<dyn RawScorer>) -> Result<(), BatchError> {
        let documents: Vec<String> = CANARY_DOCUMENTS.iter().map(|d| d.to_string()).collect();
        self.invoke(scorer, Arc::from(CANARY_QUERY), documents, None)
            .await
            .map(|_| ())
    }

    fn active(&self) -> (ExecutionPath, Arc<dyn RawScorer>) {
        let inner = self.inner.read();
        match (&inner.state, &inner.compiled) {
            (BackendState::ReadyCompiled, Some(compiled)) => {
                (ExecutionPath::Compiled, compiled.clone())
            }
            _ => (ExecutionPath::Fallback, self.fallback.clone()),
        }
    }

    fn transition(&self, next: BackendState) {
        let mut inner = self.inner.write();
        if inner.state.can_transition_to(next) {
            debug!(from = %inner.state, to = %next, "Backend state transition");
            inner.state = next;
        }
    }

    fn demote(&self, reason: &str) {
        let mut inner = self.inner.write();
        if inner.state == BackendState::ReadyCompiled {
            inner.state = BackendState::ReadyFallback;
            inner.compiled = None;
            warn!(reason = %reason, "Compiled execution demoted to fallback");
        }
    }

    /// Runs `scorer` on a blocking thread, optionally bounded by `deadline`.
    ///
    /// Canaries pass `None`: one-time initialization cost is not held to the request
    /// deadline.
    async fn invoke(
        &self,
        scorer: Arc<dyn RawScorer>,
        query: Arc<str>,
        documents: Vec<String>,
        deadline: Option<Duration>,
    ) -> Result<Vec<f32>, BatchError> {
        let expected = documents.len();
        let task = tokio::task::spawn_blocking(move || scorer.raw_score(&query, &documents));

        let joined = match deadline {
            Some(timeout) => match tokio::time::timeout(timeout, task).await {
                Ok(joined) => joined,
                Err(_) => return Err(BatchError::DeadlineExceeded { timeout }),
            },
            None => task.await,
        };

        match joined {
            Ok(Ok(scores)) if scores.len() == expected => Ok(scores),
            Ok(Ok(scores)) => Err(BatchError::ComputationFailed {
                reason: format!("expected {expected} scores, got {}", scores.len()),
            }),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(BatchError::ComputationFailed {
                reason: format!("scoring task aborted: {e}"),
            }),
        }
    }
}
