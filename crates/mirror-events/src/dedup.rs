//! Bounded LRU set of recently seen event IDs.
//!
//! The deduplicator is advisory: the reducer is idempotent on its own, so
//! forgetting an ID (eviction, `clear`, `resize`) only costs a redundant
//! re-application, never a corrupted store.

use indexmap::IndexSet;
use tracing::debug;

use mirror_core::EventId;

/// Default number of event IDs remembered.
pub const DEFAULT_DEDUP_MAX_SIZE: usize = 1000;

/// Counters describing deduplicator activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// IDs currently remembered.
    pub size: usize,
    /// `is_duplicate` calls that found the ID.
    pub hits: u64,
    /// `is_duplicate` calls that recorded a new ID.
    pub misses: u64,
    /// IDs dropped to stay within `max_size`.
    pub evictions: u64,
}

/// Access-ordered set of event IDs; the front is least recently used.
#[derive(Clone, Debug)]
pub struct Deduplicator {
    seen: IndexSet<EventId>,
    max_size: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_MAX_SIZE)
    }
}

impl Deduplicator {
    /// Create a deduplicator remembering at most `max_size` IDs (minimum 1).
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            seen: IndexSet::with_capacity(max_size.min(DEFAULT_DEDUP_MAX_SIZE)),
            max_size,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Whether `id` was seen before. Either way it ends up most recently used.
    pub fn is_duplicate(&mut self, id: &EventId) -> bool {
        if let Some(index) = self.seen.get_index_of(id) {
            let last = self.seen.len() - 1;
            self.seen.move_index(index, last);
            self.hits += 1;
            return true;
        }
        self.insert_new(id.clone());
        self.misses += 1;
        false
    }

    /// Record `id` as seen without counting a hit or miss.
    pub fn add(&mut self, id: EventId) {
        if let Some(index) = self.seen.get_index_of(&id) {
            let last = self.seen.len() - 1;
            self.seen.move_index(index, last);
        } else {
            self.insert_new(id);
        }
    }

    /// Forget `id`. Returns whether it was present.
    pub fn remove(&mut self, id: &EventId) -> bool {
        self.seen.shift_remove(id)
    }

    /// Membership test that does not refresh recency.
    pub fn contains(&self, id: &EventId) -> bool {
        self.seen.contains(id)
    }

    /// IDs currently remembered.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no IDs are remembered.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Configured bound.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Forget every ID and reset counters.
    pub fn clear(&mut self) {
        self.seen.clear();
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    /// Change the bound, evicting least recently used IDs if it shrank.
    pub fn resize(&mut self, max_size: usize) {
        self.max_size = max_size.max(1);
        self.evict_overflow();
    }

    /// Current counters.
    pub fn stats(&self) -> DedupStats {
        DedupStats {
            size: self.seen.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    fn insert_new(&mut self, id: EventId) {
        let _ = self.seen.insert(id);
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.seen.len() > self.max_size {
            let Some(evicted) = self.seen.shift_remove_index(0) else {
                break;
            };
            self.evictions += 1;
            debug!(
                event_id = %evicted,
                max_size = self.max_size,
                "evicted least recently seen event id"
            );
        }
    }
}
