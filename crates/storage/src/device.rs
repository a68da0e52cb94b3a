//! Storage engine contract
//!
//! The replace path never touches device blocks directly. It opens a
//! [`StorageRecord`] handle for the record, attaches the raw pickle, and asks
//! the engine to write it. The pickle is stored verbatim; decoded bins are
//! never re-encoded for the write.
//!
//! Every handle obtained from `create` or `open` must be passed to `close`.

use strata_core::{Digest, StorageError, WriteBuffer};

use crate::record::{Record, RecordMeta};

/// Per-operation handle on a record's device representation
#[derive(Debug, Clone)]
pub struct StorageRecord<'a> {
    digest: Digest,
    is_create: bool,
    write_buffer: WriteBuffer,
    pickle: Option<&'a [u8]>,
    n_bins: u16,
}

impl<'a> StorageRecord<'a> {
    /// New handle; engines construct these in `create` and `open`
    pub fn new(digest: Digest, is_create: bool) -> Self {
        StorageRecord {
            digest,
            is_create,
            write_buffer: WriteBuffer::Master,
            pickle: None,
            n_bins: 0,
        }
    }

    /// Digest of the record
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Whether the handle was opened for a newly created record
    pub fn is_create(&self) -> bool {
        self.is_create
    }

    /// Write-buffer class for the next write
    pub fn write_buffer(&self) -> WriteBuffer {
        self.write_buffer
    }

    /// Select the write-buffer class
    pub fn set_write_buffer(&mut self, write_buffer: WriteBuffer) {
        self.write_buffer = write_buffer;
    }

    /// Attach a pre-encoded pickle to be written as-is
    pub fn set_pickle(&mut self, pickle: &'a [u8], n_bins: u16) {
        self.pickle = Some(pickle);
        self.n_bins = n_bins;
    }

    /// Attached pickle, if any
    pub fn pickle(&self) -> Option<&'a [u8]> {
        self.pickle
    }

    /// Bin count of the attached pickle
    pub fn n_bins(&self) -> u16 {
        self.n_bins
    }
}

/// A record as read back from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlock {
    /// Metadata written with the record
    pub meta: RecordMeta,
    /// Bins in the pickle
    pub n_bins: u16,
    /// Raw pickle
    pub pickle: Vec<u8>,
}

/// Persistent storage for records
pub trait StorageEngine: Send + Sync {
    /// Open a handle for a record that has just been created in the index
    fn create<'a>(&self, digest: &Digest) -> StorageRecord<'a>;

    /// Open a handle for an existing record
    fn open<'a>(&self, digest: &Digest) -> StorageRecord<'a>;

    /// Durably write `record`'s metadata with the handle's attached pickle
    fn write(&self, rd: &StorageRecord<'_>, record: &Record) -> Result<(), StorageError>;

    /// Read a record's block back, `None` if nothing is stored
    fn read(&self, digest: &Digest) -> Result<Option<StoredBlock>, StorageError>;

    /// Close a handle
    fn close(&self, rd: StorageRecord<'_>);

    /// Drop a record's device footprint
    ///
    /// Only removes what `instance` wrote; a block written by a later record
    /// for the same digest is left alone.
    fn destroy(&self, digest: &Digest, instance: u64);
}
