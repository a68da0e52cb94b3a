//! Cross-datacenter change notification
//!
//! Replica writes are reported to the cross-datacenter shipper. The
//! notification is captured while the record is locked and submitted after
//! the lock is released, so the shipper never runs under a record lock.

use parking_lot::Mutex;
use strata_core::{Digest, Generation, SetId};
use strata_storage::Record;

/// Snapshot of a record for the shipper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitInfo {
    /// Record digest
    pub digest: Digest,
    /// Generation at capture time
    pub generation: Generation,
    /// Last update time at capture time
    pub last_update_time: u64,
    /// Last update time before the change being reported
    pub prev_last_update_time: u64,
    /// Void time at capture time
    pub void_time: u32,
    /// Set of the record
    pub set_id: Option<SetId>,
}

impl SubmitInfo {
    /// Capture a locked record's state
    pub fn capture(record: &Record, prev_last_update_time: u64) -> Self {
        SubmitInfo {
            digest: *record.digest(),
            generation: record.meta.generation,
            last_update_time: record.meta.last_update_time,
            prev_last_update_time,
            void_time: record.meta.void_time,
            set_id: record.set_id,
        }
    }
}

/// Receiver of change notifications
pub trait ChangeNotifier: Send + Sync {
    /// Submit a captured notification; never called under a record lock
    fn submit(&self, info: SubmitInfo);
}

/// Notifier that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn submit(&self, _info: SubmitInfo) {}
}

/// Notifier that keeps submissions in memory
#[derive(Debug, Default)]
pub struct XdrLog {
    entries: Mutex<Vec<SubmitInfo>>,
}

impl XdrLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all submissions so far
    pub fn drain(&self) -> Vec<SubmitInfo> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Number of pending submissions
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChangeNotifier for XdrLog {
    fn submit(&self, info: SubmitInfo) {
        self.entries.lock().push(info);
    }
}
