use std::collections::VecDeque;

use super::{halve, plan};

/// A single halving of the working batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReduction {
    pub from: usize,
    pub to: usize,
}

/// What to do after a batch reported resource exhaustion.
#[derive(Debug, PartialEq)]
pub enum Backoff<T> {
    /// The batch went back to the front of the queue at the smaller size.
    Retry(BatchReduction),
    /// Already at size 1; the item cannot be scored.
    Exhausted(Vec<T>),
}

/// Per-request queue of pending items driven by the halving backoff protocol.
///
/// Items leave the queue in their original order; a failed batch is pushed back to the
/// front so the remainder is re-partitioned at the new size without reordering.
#[derive(Debug)]
pub struct BatchSchedule<T> {
    pending: VecDeque<T>,
    working: usize,
    reductions: Vec<BatchReduction>,
}

impl<T> BatchSchedule<T> {
    pub fn new(items: Vec<T>, working_batch_size: usize) -> Self {
        Self {
            pending: items.into(),
            working: working_batch_size.max(1),
            reductions: Vec::new(),
        }
    }

    #[inline]
    pub fn working_batch_size(&self) -> usize {
        self.working
    }

    /// Items not yet handed out.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    /// Batch lengths for the remaining items at the current size.
    pub fn plan(&self) -> Vec<usize> {
        plan(self.pending.len(), self.working)
    }

    /// Takes the next batch (at most `working_batch_size` items).
    pub fn next_batch(&mut self) -> Option<Vec<T>> {
        if self.pending.is_empty() {
            return None;
        }
        let take = self.working.min(self.pending.len());
        Some(self.pending.drain(..take).collect())
    }

    /// Applies the backoff protocol to a batch that ran out of resources.
    pub fn on_resource_exhausted(&mut self, batch: Vec<T>) -> Backoff<T> {
        if self.working <= 1 {
            return Backoff::Exhausted(batch);
        }

        let reduction = BatchReduction {
            from: self.working,
            to: halve(self.working),
        };
        self.working = reduction.to;
        self.reductions.push(reduction);

        for item in batch.into_iter().rev() {
            self.pending.push_front(item);
        }

        Backoff::Retry(reduction)
    }

    pub fn reductions(&self) -> &[BatchReduction] {
        &self.reductions
    }
}
