//! Namespace statistics sink
//!
//! Counters are updated with atomic increment/decrement, never under a record
//! lock, so they are eventually-consistent aggregates rather than values tied
//! to any single record operation.
//!
//! # Memory Ordering
//!
//! All counters use Relaxed ordering: they are purely observational and do not
//! synchronize any other memory operations.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Sink for namespace-level record statistics
///
/// The record-replace core never owns global counters; it only holds a
/// reference to a sink.
pub trait StatsSink: Send + Sync {
    /// A new index entry was created
    fn object_created(&self);

    /// An index entry was destroyed
    fn object_destroyed(&self);

    /// Memory used by a record's bins changed from `prior` to `current` bytes
    fn adjust_memory(&self, prior: u64, current: u64);

    /// A record's expirability changed
    fn expiration_transition(&self, was_expirable: bool, is_expirable: bool);
}

/// Outcome counters for replace operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceCounter {
    /// Remote record was applied
    Applied,
    /// Local record won conflict resolution
    Rejected,
    /// Remote record fell under a truncation horizon
    Truncated,
    /// Replace failed (admission, allocation, decode or write)
    Failed,
}

/// Atomic namespace statistics
#[derive(Debug, Default)]
pub struct NamespaceStats {
    objects: AtomicU64,
    non_expirable_objects: AtomicI64,
    memory_data_bytes: AtomicI64,
    replace_applied: AtomicU64,
    replace_rejected: AtomicU64,
    replace_truncated: AtomicU64,
    replace_failed: AtomicU64,
}

/// Point-in-time copy of [`NamespaceStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Live index entries
    pub objects: u64,
    /// Live records that never expire
    pub non_expirable_objects: i64,
    /// Bytes of memory-resident bin data
    pub memory_data_bytes: i64,
    /// Replaces applied
    pub replace_applied: u64,
    /// Replaces rejected by conflict resolution
    pub replace_rejected: u64,
    /// Replaces skipped by truncation
    pub replace_truncated: u64,
    /// Replaces failed
    pub replace_failed: u64,
}

impl NamespaceStats {
    /// Create zeroed statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a replace outcome
    pub fn record_replace(&self, counter: ReplaceCounter) {
        let target = match counter {
            ReplaceCounter::Applied => &self.replace_applied,
            ReplaceCounter::Rejected => &self.replace_rejected,
            ReplaceCounter::Truncated => &self.replace_truncated,
            ReplaceCounter::Failed => &self.replace_failed,
        };
        target.fetch_add(1, Ordering::Relaxed);
    }

    /// Live index entries
    pub fn objects(&self) -> u64 {
        self.objects.load(Ordering::Relaxed)
    }

    /// Bytes of memory-resident bin data
    pub fn memory_data_bytes(&self) -> i64 {
        self.memory_data_bytes.load(Ordering::Relaxed)
    }

    /// Copy all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            objects: self.objects.load(Ordering::Relaxed),
            non_expirable_objects: self.non_expirable_objects.load(Ordering::Relaxed),
            memory_data_bytes: self.memory_data_bytes.load(Ordering::Relaxed),
            replace_applied: self.replace_applied.load(Ordering::Relaxed),
            replace_rejected: self.replace_rejected.load(Ordering::Relaxed),
            replace_truncated: self.replace_truncated.load(Ordering::Relaxed),
            replace_failed: self.replace_failed.load(Ordering::Relaxed),
        }
    }
}

impl StatsSink for NamespaceStats {
    fn object_created(&self) {
        self.objects.fetch_add(1, Ordering::Relaxed);
    }

    fn object_destroyed(&self) {
        let prev = self.objects.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(prev > 0, "object count underflow");
    }

    fn adjust_memory(&self, prior: u64, current: u64) {
        let delta = current as i64 - prior as i64;
        if delta != 0 {
            self.memory_data_bytes.fetch_add(delta, Ordering::Relaxed);
        }
    }

    fn expiration_transition(&self, was_expirable: bool, is_expirable: bool) {
        match (was_expirable, is_expirable) {
            (true, false) => {
                self.non_expirable_objects.fetch_add(1, Ordering::Relaxed);
            }
            (false, true) => {
                self.non_expirable_objects.fetch_sub(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}
