use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a document has no score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnscoredCause {
    /// Out of resources even at batch size 1.
    ResourceExhausted,
    ComputationFailed { reason: String },
    DeadlineExceeded { timeout_ms: u64 },
}

impl fmt::Display for UnscoredCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnscoredCause::ResourceExhausted => f.write_str("resource exhausted at batch size 1"),
            UnscoredCause::ComputationFailed { reason } => write!(f, "computation failed: {reason}"),
            UnscoredCause::DeadlineExceeded { timeout_ms } => {
                write!(f, "deadline of {timeout_ms}ms exceeded")
            }
        }
    }
}

/// Diagnostic record for one unscored input position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnscoredDocument {
    pub index: usize,
    pub cause: UnscoredCause,
}

/// Per-request counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestStats {
    pub documents: usize,
    pub cache_hits: usize,
    /// Input positions that needed computation (duplicates included).
    pub cache_misses: usize,
    /// Distinct (query, document) pairs sent to the backend.
    pub unique_misses: usize,
    pub backend_calls: usize,
    pub batch_reductions: usize,
    pub scored: usize,
    pub unscored: usize,
    /// Working batch size when the request finished (0 if no batch ran).
    pub final_batch_size: usize,
    pub elapsed: Duration,
}

impl RequestStats {
    /// Documents returned with a score per second of wall time.
    pub fn docs_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.documents - self.unscored) as f64 / secs
        } else {
            0.0
        }
    }
}

/// Scores aligned to the request's documents.
///
/// `scores[i]` belongs to `documents[i]`; `None` marks an unscored document, explained by
/// the matching entry in `unscored`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreResponse {
    pub scores: Vec<Option<f32>>,
    pub unscored: Vec<UnscoredDocument>,
    pub stats: RequestStats,
}

impl ScoreResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// `true` when every document was scored.
    pub fn is_complete(&self) -> bool {
        self.unscored.is_empty()
    }

    pub fn scored_count(&self) -> usize {
        self.scores.iter().filter(|s| s.is_some()).count()
    }

    /// `(index, score)` for scored documents, best first.
    pub fn ranked(&self) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> = self
            .scores
            .iter()
            .enumerate()
            .filter_map(|(idx, score)| score.map(|s| (idx, s)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}
