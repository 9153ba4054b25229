//! Batch-size planning with out-of-memory backoff.
//!
//! [`BatchPlanner`] owns the engine-wide working batch size. Each request gets a
//! [`BatchSchedule`] seeded from it; halvings inside the request are reported back
//! through [`BatchPlanner::record_reduction`]. The size never grows automatically; under
//! [`BatchSizePolicy::ResetPerRequest`] it returns to the initial size when the next
//! request begins.

pub mod heuristics;
pub mod schedule;


pub use heuristics::{MemoryBucket, heuristic_batch_size, initial_batch_size};
pub use schedule::{Backoff, BatchReduction, BatchSchedule};

use tracing::debug;

use crate::config::BatchSizePolicy;
use crate::device::HardwareProfile;

/// Where the initial batch size came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSizeSource {
    Explicit,
    Heuristic,
}

/// Partitions `pending_count` items into consecutive batches of `working_batch_size`,
/// the last one holding the remainder.
///
/// A `working_batch_size` of 0 is treated as 1.
pub fn plan(pending_count: usize, working_batch_size: usize) -> Vec<usize> {
    let size = working_batch_size.max(1);
    let mut lengths = vec![size; pending_count / size];
    let remainder = pending_count % size;
    if remainder > 0 {
        lengths.push(remainder);
    }
    lengths
}

/// `max(1, floor(size / 2))`.
#[inline]
pub fn halve(size: usize) -> usize {
    (size / 2).max(1)
}

/// Engine-wide batch-size state.
#[derive(Debug, Clone)]
pub struct BatchPlanner {
    initial: usize,
    working: usize,
    source: BatchSizeSource,
    policy: BatchSizePolicy,
}

impl BatchPlanner {
    /// Seeds the working size from `explicit`, or from the heuristic table for `profile`.
    pub fn new(profile: &HardwareProfile, explicit: Option<usize>, policy: BatchSizePolicy) -> Self {
        let (initial, source) = match explicit {
            Some(size) => (size.max(1), BatchSizeSource::Explicit),
            None => (initial_batch_size(profile), BatchSizeSource::Heuristic),
        };

        debug!(
            initial_batch_size = initial,
            source = ?source,
            policy = ?policy,
            "Batch planner initialized"
        );

        Self {
            initial,
            working: initial,
            source,
            policy,
        }
    }

    #[inline]
    pub fn initial_batch_size(&self) -> usize {
        self.initial
    }

    #[inline]
    pub fn working_batch_size(&self) -> usize {
        self.working
    }

    #[inline]
    pub fn source(&self) -> BatchSizeSource {
        self.source
    }

    #[inline]
    pub fn policy(&self) -> BatchSizePolicy {
        self.policy
    }

    /// Batch lengths for `pending_count` items at the current working size.
    pub fn plan(&self, pending_count: usize) -> Vec<usize> {
        plan(pending_count, self.working)
    }

    /// Returns the size a new request starts with, applying the reset policy.
    pub fn begin_request(&mut self) -> usize {
        if self.policy == BatchSizePolicy::ResetPerRequest && self.working != self.initial {
            debug!(
                from = self.working,
                to = self.initial,
                "Resetting working batch size for new request"
            );
            self.working = self.initial;
        }
        self.working
    }

    /// Starts a schedule over `items` at the request's starting size.
    pub fn schedule<T>(&mut self, items: Vec<T>) -> BatchSchedule<T> {
        let size = self.begin_request();
        BatchSchedule::new(items, size)
    }

    /// Folds a request-local halving into the engine-wide size.
    ///
    /// The shared size only moves down, so concurrent requests cannot grow it back.
    pub fn record_reduction(&mut self, reduction: BatchReduction) {
        self.working = self.working.min(reduction.to).max(1);
    }

    /// Restores the initial size (explicit engine reinitialization only).
    pub fn reset(&mut self) {
        self.working = self.initial;
    }
}
