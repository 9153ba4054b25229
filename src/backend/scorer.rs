use std::sync::Arc;

use super::error::ScorerError;

/// The opaque scoring collaborator.
///
/// `raw_score` must return exactly one score per document, in input order. It may fail
/// with [`ScorerError::ResourceExhausted`] when the batch does not fit, or
/// [`ScorerError::ComputationFailed`] for anything else. Calls run on a blocking thread.
pub trait RawScorer: Send + Sync {
    fn raw_score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ScorerError>;

    /// Builds the accelerated execution path, if the collaborator has one.
    fn compile(&self) -> Result<Arc<dyn RawScorer>, ScorerError> {
        Err(ScorerError::compilation_unavailable(
            "scorer has no compiled execution path",
        ))
    }

    /// Short name used in log events.
    fn name(&self) -> &str {
        "scorer"
    }
}
