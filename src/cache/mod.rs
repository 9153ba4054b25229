//! In-memory score memoization.

pub mod score_cache;
pub mod types;

#[cfg(test)]
mod tests;

pub use score_cache::ScoreCache;
pub use types::{CacheStats, CacheStatus};
