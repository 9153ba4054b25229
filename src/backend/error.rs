use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`super::RawScorer`] collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScorerError {
    /// The batch did not fit current memory; retry with a smaller batch.
    #[error("resource exhausted: {reason}")]
    ResourceExhausted { reason: String },

    /// Any other internal scoring failure.
    #[error("scoring computation failed: {reason}")]
    ComputationFailed { reason: String },

    /// No compiled/accelerated execution path can be built.
    #[error("compilation unavailable: {reason}")]
    CompilationUnavailable { reason: String },
}

impl ScorerError {
    pub fn resource_exhausted(reason: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            reason: reason.into(),
        }
    }

    pub fn computation_failed(reason: impl Into<String>) -> Self {
        Self::ComputationFailed {
            reason: reason.into(),
        }
    }

    pub fn compilation_unavailable(reason: impl Into<String>) -> Self {
        Self::CompilationUnavailable {
            reason: reason.into(),
        }
    }
}

/// Outcome of one sub-batch after the backend applied shape checks, deadlines and
/// compiled-path demotion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("resource exhausted: {reason}")]
    ResourceExhausted { reason: String },

    #[error("scoring computation failed: {reason}")]
    ComputationFailed { reason: String },

    #[error("deadline of {timeout:?} exceeded")]
    DeadlineExceeded { timeout: Duration },
}

impl From<ScorerError> for BatchError {
    fn from(err: ScorerError) -> Self {
        match err {
            ScorerError::ResourceExhausted { reason } => BatchError::ResourceExhausted { reason },
            ScorerError::ComputationFailed { reason }
            | ScorerError::CompilationUnavailable { reason } => {
                BatchError::ComputationFailed { reason }
            }
        }
    }
}
