//! Cache Statistics Module
//!
//! Tracks interception outcomes: hits, misses, and calls through to the
//! underlying operation.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Lock-free counters shared by every interceptor that reports into them.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    second_check_hits: AtomicU64,
    invocations: AtomicU64,
    faults: AtomicU64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// A value was served without taking the key's lock.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Second Check Hit ==
    /// Another caller populated the entry while this one waited for the lock.
    pub fn record_second_check_hit(&self) {
        self.second_check_hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Invocation ==
    pub fn record_invocation(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Fault ==
    pub fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            second_check_hits: self.second_check_hits.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Served straight from cache
    pub hits: u64,
    /// Had to take the key's lock
    pub misses: u64,
    /// Served from cache after waiting for the lock
    pub second_check_hits: u64,
    /// Calls through to the underlying operation
    pub invocations: u64,
    /// Underlying calls that failed
    pub faults: u64,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Share of calls answered from cache, or 0.0 if there were none.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.second_check_hits;
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}
