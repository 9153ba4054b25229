use std::collections::HashSet;

use crate::backend::{RawScorer, ScorerError};

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "need", "dare", "ought", "used", "to", "of", "in", "for", "on", "with", "at", "by",
    "from", "as", "into", "through", "during", "before", "after", "above", "below", "between",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why", "how",
    "all", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "just", "and", "but", "if", "or", "because",
    "until", "while", "what", "which", "who", "whom", "this", "that", "these", "those", "am",
    "it", "its",
];

/// Term-overlap scorer used when no model is configured.
///
/// Blends query-term recall with Jaccard similarity and squashes the result into
/// `(0, 1)` with a logistic curve centred at 0.5.
#[derive(Debug, Clone)]
pub struct LexicalScorer {
    stop_words: HashSet<&'static str>,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalScorer {
    pub fn new() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    pub fn score(&self, query: &str, document: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let query_terms = self.terms(&query_lower);

        if query_terms.is_empty() {
            let len_ratio = (query.len().min(document.len()) as f32)
                / (query.len().max(document.len()).max(1) as f32);
            return len_ratio * 0.3;
        }

        let document_lower = document.to_lowercase();
        let document_terms = self.terms(&document_lower);

        let matches = query_terms.intersection(&document_terms).count();
        let recall = matches as f32 / query_terms.len() as f32;

        let union = query_terms.union(&document_terms).count();
        let jaccard = if union > 0 {
            matches as f32 / union as f32
        } else {
            0.0
        };

        let base_score = 0.6 * recall + 0.4 * jaccard;
        let normalized = 1.0 / (1.0 + (-8.0 * (base_score - 0.5)).exp());

        normalized.clamp(0.0, 1.0)
    }

    fn terms<'a>(&self, text: &'a str) -> HashSet<&'a str> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !self.stop_words.contains(w))
            .collect()
    }
}

impl RawScorer for LexicalScorer {
    fn raw_score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, ScorerError> {
        Ok(documents.iter().map(|d| self.score(query, d)).collect())
    }

    fn name(&self) -> &str {
        "lexical"
    }
}
