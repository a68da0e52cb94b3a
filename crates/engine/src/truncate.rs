//! Truncation horizons
//!
//! Truncating a namespace or set records a last-update-time horizon. Records
//! whose LUT is strictly below the horizon are treated as deleted; a replace
//! that would create such a record is a successful no-op.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Namespace-wide and per-set truncation horizons
#[derive(Debug, Default)]
pub struct TruncationRegistry {
    namespace_lut: AtomicU64,
    sets: RwLock<FxHashMap<String, u64>>,
}

impl TruncationRegistry {
    /// No horizons
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate the whole namespace before `lut`
    pub fn truncate_namespace(&self, lut: u64) {
        self.namespace_lut.fetch_max(lut, Ordering::Relaxed);
    }

    /// Truncate one set before `lut`
    pub fn truncate_set(&self, set_name: &str, lut: u64) {
        let mut sets = self.sets.write();
        let horizon = sets.entry(set_name.to_string()).or_insert(0);
        *horizon = (*horizon).max(lut);
    }

    /// Effective horizon for records of `set_name`
    pub fn horizon(&self, set_name: Option<&str>) -> u64 {
        let ns = self.namespace_lut.load(Ordering::Relaxed);
        let set = set_name
            .and_then(|name| self.sets.read().get(name).copied())
            .unwrap_or(0);
        ns.max(set)
    }

    /// Whether a record with last update time `lut` falls under a horizon
    pub fn is_truncated(&self, lut: u64, set_name: Option<&str>) -> bool {
        lut < self.horizon(set_name)
    }
}
