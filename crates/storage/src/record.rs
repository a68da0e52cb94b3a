//! Index records
//!
//! A `Record` is the in-memory index entry for one digest: replication
//! metadata, set membership, flags and the bin container. Records live in
//! slots of the [`IndexStore`](crate::index::IndexStore) arena and are only
//! reachable through a locked [`IndexRef`](crate::index::IndexRef).
//!
//! # Metadata snapshots
//!
//! The applier overwrites metadata before the durable write so the storage
//! engine sees the new generation and times. If the write fails the
//! overwrite is undone from an [`IndexMetadata`] snapshot taken just before.

use strata_core::{Digest, Generation, SetId, StorageLayout};

use crate::bins::BinStorage;

/// Replication metadata carried by every record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordMeta {
    /// Mutation counter
    pub generation: Generation,
    /// Last update time
    pub last_update_time: u64,
    /// Expiry in void-time seconds, 0 = never
    pub void_time: u32,
}

impl RecordMeta {
    /// Whether the record has an expiry
    #[inline]
    pub fn is_expirable(&self) -> bool {
        self.void_time != 0
    }
}

/// Immutable copy of the metadata fields the applier overwrites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMetadata(RecordMeta);

impl IndexMetadata {
    /// The stashed metadata
    #[inline]
    pub fn meta(&self) -> &RecordMeta {
        &self.0
    }
}

/// Per-record flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordFlags {
    /// Record is a member of a secondary index
    pub in_sindex: bool,
    /// Record's user key is stored
    pub key_stored: bool,
    /// Record is being dropped by a migration; writes are refused
    pub drop_pending: bool,
    /// Record has been durably written at least once
    pub committed: bool,
}

/// In-memory index entry for one digest
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    digest: Digest,
    /// Replication metadata
    pub meta: RecordMeta,
    /// Set the record belongs to, if any
    pub set_id: Option<SetId>,
    /// Flag bits
    pub flags: RecordFlags,
    /// Bin container
    pub bins: BinStorage,
    linked: bool,
    instance: u64,
}

impl Record {
    /// Fresh record for `digest`, generation zero and no bins
    pub fn new(digest: Digest, layout: StorageLayout) -> Self {
        Record {
            digest,
            meta: RecordMeta::default(),
            set_id: None,
            flags: RecordFlags::default(),
            bins: BinStorage::empty(layout),
            linked: true,
            instance: 0,
        }
    }

    /// Placeholder held by free arena slots
    pub(crate) fn vacant() -> Self {
        Record {
            digest: Digest::new([0; strata_core::limits::DIGEST_SIZE]),
            meta: RecordMeta::default(),
            set_id: None,
            flags: RecordFlags::default(),
            bins: BinStorage::OnDevice { n_bins: 0 },
            linked: false,
            instance: 0,
        }
    }

    /// The record's digest
    #[inline]
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Whether the digest map still points at this record
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub(crate) fn set_linked(&mut self, linked: bool) {
        self.linked = linked;
    }

    /// Incarnation id assigned by the index store at creation
    ///
    /// A digest that is deleted and created again gets a new instance, so
    /// device blocks can be matched to the record that wrote them.
    #[inline]
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub(crate) fn set_instance(&mut self, instance: u64) {
        self.instance = instance;
    }

    /// Whether the record has expired as of `now` (void-time seconds)
    pub fn is_expired(&self, now: u32) -> bool {
        self.meta.void_time != 0 && self.meta.void_time < now
    }

    /// Snapshot the overwritable metadata
    pub fn stash_metadata(&self) -> IndexMetadata {
        IndexMetadata(self.meta)
    }

    /// Restore metadata from a snapshot
    pub fn unwind_metadata(&mut self, snapshot: &IndexMetadata) {
        self.meta = snapshot.0;
    }

    /// Overwrite generation, last update time and void time
    pub fn replace_metadata(&mut self, generation: Generation, last_update_time: u64, void_time: u32) {
        self.meta = RecordMeta {
            generation,
            last_update_time,
            void_time,
        };
    }

    /// Reconcile the stored key with the one carried by an incoming write
    ///
    /// A key that arrives when none is stored is kept; a stored key is dropped
    /// when the write carries none. Key bytes are only held by multi-bin
    /// memory containers, other layouts track the flag alone.
    pub fn finalize_key(&mut self, key: Option<&[u8]>) {
        match (self.flags.key_stored, key) {
            (false, Some(key)) => {
                self.bins.store_key(key);
                self.flags.key_stored = true;
            }
            (true, None) => {
                self.bins.drop_key();
                self.flags.key_stored = false;
            }
            _ => {}
        }
    }

    /// Memory charged to this record's bins and key
    #[inline]
    pub fn mem_size(&self) -> u64 {
        self.bins.mem_size()
    }
}
