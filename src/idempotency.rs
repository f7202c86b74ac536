//! Per-subscriber duplicate-delivery suppression.
//!
//! JetStream redelivers a message whenever an ack is lost or delayed past
//! `ack_wait`; subscribers must treat a repeat delivery of an id they've
//! already handled as a no-op rather than re-running business logic.
//! Bounded per spec.md §4.6: 10,000 ids tracked, oldest 1,000 evicted in
//! one batch on overflow, matching the original Python client's
//! `_processed_events` deque-with-eviction.

use std::sync::Mutex;

use indexmap::IndexSet;

const CAPACITY: usize = 10_000;
const EVICT_BATCH: usize = 1_000;

/// Thread-safe bounded cache of processed event ids for one subscription.
pub struct IdempotencyCache {
    seen: Mutex<IndexSet<String>>,
}

impl IdempotencyCache {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(IndexSet::with_capacity(CAPACITY)),
        }
    }

    /// Returns `true` if `id` was already recorded (this delivery should be
    /// skipped), `false` if it's new (record it and proceed). Marks `id`
    /// as seen as a side effect in the `false` case, so callers don't need
    /// a separate `mark` call on the common path.
    pub fn check_and_mark(&self, id: &str) -> bool {
        let mut seen = self.seen.lock().expect("idempotency cache mutex poisoned");

        if seen.contains(id) {
            return true;
        }

        if seen.len() >= CAPACITY {
            let evict = EVICT_BATCH.min(seen.len());
            seen.drain(0..evict);
        }

        seen.insert(id.to_string());
        false
    }

    /// Number of ids currently tracked. Exposed for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.seen.lock().expect("idempotency cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new()
    }
}
