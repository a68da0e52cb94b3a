//! Index entry store
//!
//! Fixed-capacity arena of record slots plus a digest map pointing into it.
//!
//! # Design
//!
//! - Arena: one slot per record, allocated up front (`index_capacity`)
//! - Free list: vacant slot numbers, reused LIFO
//! - Digest map: DashMap with Fx hashing, sharded internally
//! - Per-slot `parking_lot::Mutex`: the only per-record exclusion
//! - Per-slot atomic reference count: lock holders plus lookups waiting
//!   on the lock
//! - Instance counter: every created record gets a fresh incarnation id
//!
//! # Reference counting
//!
//! A reference is taken while the digest map shard is held, so a slot found
//! through the map cannot be reclaimed before its reference is counted. The
//! shard is dropped before waiting on the slot lock. `delete` unlinks a record
//! from the map while its lock is held; the release that brings the count of
//! an unlinked record to zero reclaims the slot, exactly once.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use strata_core::{Digest, Error, Result, StorageLayout};
use tracing::trace;

use crate::record::Record;
use crate::stats::StatsSink;

type DigestMap = DashMap<Digest, u32, BuildHasherDefault<FxHasher>>;

/// Hook run on a record's last release after it was deleted
///
/// Drops whatever the record still owns outside the slot: device footprint,
/// memory accounting, set membership counts.
pub trait Reclaim: Send + Sync {
    /// Release resources held by `record`
    fn reclaim(&self, record: &mut Record);
}

/// Reclaim hook that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReclaim;

impl Reclaim for NoReclaim {
    fn reclaim(&self, _record: &mut Record) {}
}

struct Slot {
    record: Mutex<Record>,
    refs: AtomicU32,
}

/// Fixed-capacity record arena with a digest map
pub struct IndexStore {
    slots: Box<[Slot]>,
    free: Mutex<Vec<u32>>,
    tree: DigestMap,
    layout: StorageLayout,
    next_instance: AtomicU64,
    stats: Arc<dyn StatsSink>,
    reclaimer: Arc<dyn Reclaim>,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("capacity", &self.capacity())
            .field("live_records", &self.live_records())
            .field("layout", &self.layout)
            .finish()
    }
}

impl IndexStore {
    /// Create a store with `capacity` slots
    pub fn new(
        capacity: u32,
        layout: StorageLayout,
        stats: Arc<dyn StatsSink>,
        reclaimer: Arc<dyn Reclaim>,
    ) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                record: Mutex::new(Record::vacant()),
                refs: AtomicU32::new(0),
            })
            .collect();

        IndexStore {
            slots,
            free: Mutex::new((0..capacity).rev().collect()),
            tree: DigestMap::default(),
            layout,
            next_instance: AtomicU64::new(1),
            stats,
            reclaimer,
        }
    }

    /// Layout new records are created with
    pub fn layout(&self) -> StorageLayout {
        self.layout
    }

    /// Look up `digest`, creating a fresh record if absent
    ///
    /// Returns the locked record and whether it was created. Fails with
    /// `OutOfSpace` when the arena has no vacant slot.
    pub fn get_or_create(&self, digest: &Digest) -> Result<(IndexRef<'_>, bool)> {
        loop {
            if let Some(slot) = self.pin(digest) {
                if let Some(r) = self.lock_pinned(slot) {
                    return Ok((r, false));
                }
                continue;
            }

            match self.tree.entry(*digest) {
                Entry::Occupied(e) => {
                    let slot = *e.get();
                    self.slots[slot as usize].refs.fetch_add(1, Ordering::AcqRel);
                    drop(e);
                    if let Some(r) = self.lock_pinned(slot) {
                        return Ok((r, false));
                    }
                }
                Entry::Vacant(e) => {
                    let slot = self.free.lock().pop().ok_or(Error::OutOfSpace)?;
                    let s = &self.slots[slot as usize];
                    let mut guard = s.record.lock();
                    *guard = Record::new(*digest, self.layout);
                    guard.set_instance(self.next_instance.fetch_add(1, Ordering::Relaxed));
                    s.refs.store(1, Ordering::Release);
                    e.insert(slot);
                    self.stats.object_created();
                    trace!(target: "strata::index", %digest, slot, "created record");
                    return Ok((
                        IndexRef {
                            store: self,
                            slot,
                            guard: Some(guard),
                        },
                        true,
                    ));
                }
            }
        }
    }

    /// Look up and lock an existing record
    pub fn get(&self, digest: &Digest) -> Result<IndexRef<'_>> {
        loop {
            let slot = self.pin(digest).ok_or(Error::NotFound)?;
            if let Some(r) = self.lock_pinned(slot) {
                return Ok(r);
            }
        }
    }

    /// Unlink a locked record from the digest map
    ///
    /// The slot is reclaimed once the last reference is released.
    pub fn delete(&self, r: &mut IndexRef<'_>) {
        debug_assert!(std::ptr::eq(self, r.store), "index ref from another store");
        if !r.is_linked() {
            return;
        }
        let slot = r.slot;
        self.tree.remove_if(r.digest(), |_, s| *s == slot);
        r.set_linked(false);
        trace!(target: "strata::index", digest = %r.digest(), slot, "deleted record");
    }

    /// Whether the record for `digest` is currently locked
    pub fn is_locked(&self, digest: &Digest) -> bool {
        self.tree
            .get(digest)
            .map(|e| self.slots[*e as usize].record.is_locked())
            .unwrap_or(false)
    }

    /// Current reference count of the record for `digest`
    pub fn ref_count(&self, digest: &Digest) -> Option<u32> {
        self.tree
            .get(digest)
            .map(|e| self.slots[*e as usize].refs.load(Ordering::Acquire))
    }

    /// Whether `digest` has a live record
    pub fn contains(&self, digest: &Digest) -> bool {
        self.tree.contains_key(digest)
    }

    /// Records reachable through the digest map
    pub fn live_records(&self) -> usize {
        self.tree.len()
    }

    /// Vacant slots
    pub fn free_slots(&self) -> usize {
        self.free.lock().len()
    }

    /// Total slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Count a reference to the slot `digest` maps to, under the shard lock
    fn pin(&self, digest: &Digest) -> Option<u32> {
        self.tree.get(digest).map(|e| {
            let slot = *e;
            self.slots[slot as usize].refs.fetch_add(1, Ordering::AcqRel);
            slot
        })
    }

    /// Lock a pinned slot; `None` if it was deleted while we waited
    fn lock_pinned(&self, slot: u32) -> Option<IndexRef<'_>> {
        let r = IndexRef {
            store: self,
            slot,
            guard: Some(self.slots[slot as usize].record.lock()),
        };
        if r.is_linked() {
            Some(r)
        } else {
            drop(r);
            None
        }
    }

    fn release_locked(&self, slot: u32, mut guard: MutexGuard<'_, Record>) {
        let prev = self.slots[slot as usize].refs.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "reference count underflow");

        if prev == 1 && !guard.is_linked() {
            self.reclaimer.reclaim(&mut guard);
            self.stats.object_destroyed();
            trace!(target: "strata::index", digest = %guard.digest(), slot, "reclaimed slot");
            *guard = Record::vacant();
            drop(guard);
            self.free.lock().push(slot);
        }
    }
}

/// Locked reference to a record
///
/// Dereferences to the [`Record`]. Dropping the reference unlocks the record
/// and releases its reference; an explicit [`release`](IndexRef::release)
/// does the same.
pub struct IndexRef<'a> {
    store: &'a IndexStore,
    slot: u32,
    guard: Option<MutexGuard<'a, Record>>,
}

impl<'a> IndexRef<'a> {
    /// Unlock and release
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for IndexRef<'_> {
    type Target = Record;

    fn deref(&self) -> &Record {
        match &self.guard {
            Some(g) => g,
            None => unreachable!("index ref used after release"),
        }
    }
}

impl DerefMut for IndexRef<'_> {
    fn deref_mut(&mut self) -> &mut Record {
        match &mut self.guard {
            Some(g) => g,
            None => unreachable!("index ref used after release"),
        }
    }
}

impl Drop for IndexRef<'_> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            self.store.release_locked(self.slot, guard);
        }
    }
}

impl std::fmt::Debug for IndexRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexRef")
            .field("slot", &self.slot)
            .field("record", &**self)
            .finish()
    }
}
