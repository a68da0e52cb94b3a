//! Per-namespace set registry
//!
//! Set names are interned into small `SetId`s the first time a record of the
//! set is created. Ids are never reused or removed. Each set also carries a
//! live-object counter.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use strata_core::limits::{validate_set_name, MAX_SETS};
use strata_core::{Error, LimitError, SetId};
use thiserror::Error;

/// Set registration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetError {
    /// Set name is malformed
    #[error("invalid set name: {0}")]
    InvalidName(#[from] LimitError),

    /// Registry already holds the maximum number of sets
    #[error("set table full ({0} sets)")]
    TableFull(usize),
}

impl From<SetError> for Error {
    fn from(e: SetError) -> Self {
        match e {
            SetError::InvalidName(e) => Error::BadParam(e.to_string()),
            SetError::TableFull(_) => Error::OutOfSpace,
        }
    }
}

#[derive(Debug)]
struct SetEntry {
    name: String,
    objects: AtomicU64,
}

#[derive(Debug, Default)]
struct Inner {
    by_name: FxHashMap<String, SetId>,
    entries: Vec<SetEntry>,
}

/// Interns set names for one namespace
#[derive(Debug, Default)]
pub struct SetRegistry {
    inner: RwLock<Inner>,
}

impl SetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a set id, registering the name if it is new
    pub fn get_or_insert(&self, name: &str) -> Result<SetId, SetError> {
        if let Some(id) = self.get(name) {
            return Ok(id);
        }

        validate_set_name(name)?;

        let mut inner = self.inner.write();
        // Another thread may have registered it while we waited.
        if let Some(id) = inner.by_name.get(name) {
            return Ok(*id);
        }
        if inner.entries.len() >= MAX_SETS {
            return Err(SetError::TableFull(MAX_SETS));
        }

        let id = SetId(inner.entries.len() as u16 + 1);
        inner.entries.push(SetEntry {
            name: name.to_string(),
            objects: AtomicU64::new(0),
        });
        inner.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up a set id without registering
    pub fn get(&self, name: &str) -> Option<SetId> {
        self.inner.read().by_name.get(name).copied()
    }

    /// Name of a registered set
    pub fn name(&self, id: SetId) -> Option<String> {
        let inner = self.inner.read();
        Self::entry(&inner, id).map(|e| e.name.clone())
    }

    /// Number of registered sets
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if no set is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count a committed record joining the set
    pub fn incr_objects(&self, id: SetId) {
        if let Some(e) = Self::entry(&self.inner.read(), id) {
            e.objects.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count a committed record leaving the set
    pub fn decr_objects(&self, id: SetId) {
        if let Some(e) = Self::entry(&self.inner.read(), id) {
            e.objects.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Live records in the set
    pub fn objects(&self, id: SetId) -> u64 {
        Self::entry(&self.inner.read(), id)
            .map(|e| e.objects.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn entry(inner: &Inner, id: SetId) -> Option<&SetEntry> {
        usize::from(id.0)
            .checked_sub(1)
            .and_then(|idx| inner.entries.get(idx))
    }
}
