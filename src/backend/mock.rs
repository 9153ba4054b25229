//! Scriptable [`RawScorer`] for tests.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::error::ScorerError;
use super::scorer::RawScorer;

/// How [`MockScorer::compile`] behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompileBehavior {
    /// `compile()` fails with `CompilationUnavailable`.
    #[default]
    Unavailable,
    /// `compile()` succeeds and the compiled path scores normally.
    Succeeds,
    /// The compiled path returns one score too many.
    WrongShape,
    /// The compiled path passes the canary, then fails every later call.
    FailsAfterCanary,
}

/// A scripted answer for the next call, consumed before default behaviour applies.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    ResourceExhausted,
    ComputationFailed(String),
    Scores(Vec<f32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockPath {
    Compiled,
    Fallback,
}

/// A recorded `raw_score` call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub path: MockPath,
    pub query: String,
    pub documents: Vec<String>,
}

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<MockCall>>,
    script: Mutex<VecDeque<MockResponse>>,
    max_batch: Mutex<Option<usize>>,
    fail_documents: Mutex<HashSet<String>>,
    exhaust_documents: Mutex<HashSet<String>>,
    latency: Mutex<Option<Duration>>,
    compile_behavior: Mutex<CompileBehavior>,
    compile_calls: AtomicUsize,
    compiled_calls: AtomicUsize,
}

/// Deterministic scorer with failure injection and a call log.
///
/// Cloning shares the script and log; [`MockScorer::compile`] returns a handle on the
/// same state whose calls are tagged [`MockPath::Compiled`].
#[derive(Clone)]
pub struct MockScorer {
    state: Arc<MockState>,
    path: MockPath,
}

impl Default for MockScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockScorer")
            .field("path", &self.path)
            .field("calls", &self.call_count())
            .finish()
    }
}

impl MockScorer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            path: MockPath::Fallback,
        }
    }

    /// Any batch longer than `max` fails with `ResourceExhausted`.
    pub fn with_max_batch(self, max: usize) -> Self {
        *self.state.max_batch.lock() = Some(max);
        self
    }

    pub fn with_compile(self, behavior: CompileBehavior) -> Self {
        *self.state.compile_behavior.lock() = behavior;
        self
    }

    /// Sleeps this long inside every call.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.state.latency.lock() = Some(latency);
        self
    }

    /// Any batch containing `document` fails with `ComputationFailed`.
    pub fn fail_on(self, document: impl Into<String>) -> Self {
        self.state.fail_documents.lock().insert(document.into());
        self
    }

    /// Any batch containing `document` fails with `ResourceExhausted`, even alone.
    pub fn exhaust_on(self, document: impl Into<String>) -> Self {
        self.state.exhaust_documents.lock().insert(document.into());
        self
    }

    /// Queues a scripted response for the next call.
    pub fn push_response(&self, response: MockResponse) {
        self.state.script.lock().push_back(response);
    }

    /// The score the mock assigns to a pair when no failure applies.
    pub fn expected_score(query: &str, document: &str) -> f32 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(query.as_bytes());
        hasher.update(b"\x00");
        hasher.update(document.as_bytes());
        let hash = hasher.finalize();
        let bytes = hash.as_bytes();
        let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        value as f32 / u32::MAX as f32
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.calls.lock().len()
    }

    /// Calls whose query is not the warm-up canary query.
    pub fn request_calls(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.query != crate::constants::CANARY_QUERY)
            .collect()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.request_calls()
            .iter()
            .map(|c| c.documents.len())
            .collect()
    }

    pub fn compile_calls(&self) -> usize {
        self.state.compile_calls.load(Ordering::SeqCst)
    }

    pub fn calls_on(&self, path: MockPath) -> usize {
        self.state
            .calls
            .lock()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.calls.lock().clear();
    }

    fn compiled_failure(&self, n: usize) -> Option<Result<Vec<f32>, ScorerError>> {
        if self.path != MockPath::Compiled {
            return None;
        }

        let previous = self.state.compiled_calls.fetch_add(1, Ordering::SeqCst);
        match *self.state.compile_behavior.lock() {
            CompileBehavior::WrongShape => Some(Ok(vec![0.0; n + 1])),
            CompileBehavior::FailsAfterCanary if previous > 0 => Some(Err(
                ScorerError::computation_failed("compiled graph crashed"),
            )),
            _ => None,
        }
    }
}

impl RawScorer for MockScorer {
    fn raw_score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ScorerError> {
        self.state.calls.lock().push(MockCall {
            path: self.path,
            query: query.to_string(),
            documents: documents.to_vec(),
        });

        let latency = *self.state.latency.lock();
        if let Some(latency) = latency {
            std::thread::sleep(latency);
        }

        if let Some(result) = self.compiled_failure(documents.len()) {
            return result;
        }

        if let Some(response) = self.state.script.lock().pop_front() {
            return match response {
                MockResponse::ResourceExhausted => {
                    Err(ScorerError::resource_exhausted("scripted out of memory"))
                }
                MockResponse::ComputationFailed(reason) => Err(ScorerError::computation_failed(reason)),
                MockResponse::Scores(scores) => Ok(scores),
            };
        }

        if let Some(max) = *self.state.max_batch.lock()
            && documents.len() > max
        {
            return Err(ScorerError::resource_exhausted(format!(
                "batch of {} exceeds {max}",
                documents.len()
            )));
        }

        {
            let exhaust = self.state.exhaust_documents.lock();
            if documents.iter().any(|d| exhaust.contains(d)) {
                return Err(ScorerError::resource_exhausted("document too large"));
            }
        }

        {
            let fail = self.state.fail_documents.lock();
            if let Some(doc) = documents.iter().find(|d| fail.contains(*d)) {
                return Err(ScorerError::computation_failed(format!(
                    "cannot score '{doc}'"
                )));
            }
        }

        Ok(documents
            .iter()
            .map(|d| Self::expected_score(query, d))
            .collect())
    }

    fn compile(&self) -> Result<Arc<dyn RawScorer>, ScorerError> {
        self.state.compile_calls.fetch_add(1, Ordering::SeqCst);
        match *self.state.compile_behavior.lock() {
            CompileBehavior::Unavailable => Err(ScorerError::compilation_unavailable(
                "mock backend cannot compile",
            )),
            _ => Ok(Arc::new(MockScorer {
                state: self.state.clone(),
                path: MockPath::Compiled,
            })),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
