//! Bounded least-recently-used store of (query, document) scores.
//!
//! Entries live in a slab with an intrusive doubly linked recency list, so `get` and
//! `put` are O(1). The head is the most recently used entry, the tail is the next victim.

use std::collections::HashMap;

use super::types::{CacheStats, CacheStatus};
use crate::hashing::CacheKey;

const NIL: usize = usize::MAX;

#[derive(Debug, Clone)]
struct Node {
    key: CacheKey,
    score: f32,
    prev: usize,
    next: usize,
}

/// LRU score cache with a fixed capacity; capacity `0` disables caching.
pub struct ScoreCache {
    capacity: usize,
    index: HashMap<CacheKey, usize>,
    nodes: Vec<Node>,
    head: usize,
    tail: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ScoreCache {
    pub fn new(capacity: usize) -> Self {
        // Preallocation is capped; a huge configured capacity fills in lazily.
        let prealloc = capacity.min(4096);
        Self {
            capacity,
            index: HashMap::with_capacity(prealloc),
            nodes: Vec::with_capacity(prealloc),
            head: NIL,
            tail: NIL,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the score and marks the entry most recently used.
    pub fn get(&mut self, key: &CacheKey) -> Option<f32> {
        self.lookup(key).0
    }

    /// Like [`ScoreCache::get`] but also reports the [`CacheStatus`].
    pub fn lookup(&mut self, key: &CacheKey) -> (Option<f32>, CacheStatus) {
        if !self.is_enabled() {
            return (None, CacheStatus::Disabled);
        }

        match self.index.get(key).copied() {
            Some(slot) => {
                self.hits += 1;
                self.move_to_front(slot);
                (Some(self.nodes[slot].score), CacheStatus::Hit)
            }
            None => {
                self.misses += 1;
                (None, CacheStatus::Miss)
            }
        }
    }

    /// Reads a score without touching recency or counters.
    pub fn peek(&self, key: &CacheKey) -> Option<f32> {
        self.index.get(key).map(|&slot| self.nodes[slot].score)
    }

    #[inline]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.index.contains_key(key)
    }

    /// Inserts or overwrites. A new key at capacity first evicts the LRU entry.
    ///
    /// Returns the evicted key, if any.
    pub fn put(&mut self, key: CacheKey, score: f32) -> Option<CacheKey> {
        if !self.is_enabled() {
            return None;
        }

        if let Some(&slot) = self.index.get(&key) {
            self.nodes[slot].score = score;
            self.move_to_front(slot);
            return None;
        }

        if self.index.len() >= self.capacity {
            let victim = self.tail;
            self.unlink(victim);
            let evicted = self.nodes[victim].key;
            self.index.remove(&evicted);
            self.evictions += 1;

            self.nodes[victim] = Node {
                key,
                score,
                prev: NIL,
                next: NIL,
            };
            self.index.insert(key, victim);
            self.push_front(victim);
            return Some(evicted);
        }

        let slot = self.nodes.len();
        self.nodes.push(Node {
            key,
            score,
            prev: NIL,
            next: NIL,
        });
        self.index.insert(key, slot);
        self.push_front(slot);
        None
    }

    /// The entry that the next insertion of a new key would evict.
    pub fn lru_key(&self) -> Option<CacheKey> {
        (self.tail != NIL).then(|| self.nodes[self.tail].key)
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<CacheKey> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while cursor != NIL {
            keys.push(self.nodes[cursor].key);
            cursor = self.nodes[cursor].next;
        }
        keys
    }

    /// Drops every entry; counters are kept.
    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            len: self.len(),
            capacity: self.capacity,
        }
    }

    fn move_to_front(&mut self, slot: usize) {
        if self.head == slot {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);

        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = NIL;
    }

    fn push_front(&mut self, slot: usize) {
        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = self.head;

        if self.head != NIL {
            self.nodes[self.head].prev = slot;
        }
        self.head = slot;

        if self.tail == NIL {
            self.tail = slot;
        }
    }
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_CACHE_SIZE)
    }
}

impl std::fmt::Debug for ScoreCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreCache")
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
