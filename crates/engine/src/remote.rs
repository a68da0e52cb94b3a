//! Incoming remote records
//!
//! A `RemoteRecord` is a copy of a record sent by another node: header fields
//! plus the opaque pickle. The pickle is only decoded when bins must be
//! materialized locally.

use strata_core::{Bin, Digest, Generation, NodeId, Origin, PartitionId};
use strata_storage::PickleCodec;

/// A record received from another node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// Record digest
    pub digest: Digest,
    /// Generation on the sender
    pub generation: Generation,
    /// Last update time on the sender
    pub last_update_time: u64,
    /// Expiry, 0 = never
    pub void_time: u32,
    /// Bins encoded in `pickle`
    pub n_bins: u16,
    /// Encoded bins
    pub pickle: Vec<u8>,
    /// Set name, if the record belongs to a set
    pub set_name: Option<String>,
    /// User key, if the sender stores it
    pub key: Option<Vec<u8>>,
    /// Why the record was sent
    pub origin: Origin,
    /// Sending node
    pub source: NodeId,
}

impl RemoteRecord {
    /// Start building a remote record for `digest`
    pub fn builder(digest: Digest, origin: Origin) -> RemoteRecordBuilder {
        RemoteRecordBuilder {
            record: RemoteRecord {
                digest,
                generation: Generation::new(1),
                last_update_time: 0,
                void_time: 0,
                n_bins: 0,
                pickle: Vec::new(),
                set_name: None,
                key: None,
                origin,
                source: NodeId(0),
            },
        }
    }

    /// Partition the record belongs to
    pub fn partition_id(&self) -> PartitionId {
        self.digest.partition_id()
    }

    /// Stored user key as a slice
    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }
}

/// Builder for [`RemoteRecord`]
#[derive(Debug, Clone)]
pub struct RemoteRecordBuilder {
    record: RemoteRecord,
}

impl RemoteRecordBuilder {
    /// Set the generation
    pub fn generation(mut self, generation: u16) -> Self {
        self.record.generation = Generation::new(generation);
        self
    }

    /// Set the last update time
    pub fn last_update_time(mut self, lut: u64) -> Self {
        self.record.last_update_time = lut;
        self
    }

    /// Set the void time
    pub fn void_time(mut self, void_time: u32) -> Self {
        self.record.void_time = void_time;
        self
    }

    /// Encode `bins` as the pickle
    pub fn bins(mut self, codec: &dyn PickleCodec, bins: &[Bin]) -> Self {
        self.record.pickle = codec.pack(bins);
        self.record.n_bins = bins.len() as u16;
        self
    }

    /// Use a raw pickle with an announced bin count
    pub fn raw_pickle(mut self, pickle: Vec<u8>, n_bins: u16) -> Self {
        self.record.pickle = pickle;
        self.record.n_bins = n_bins;
        self
    }

    /// Set the set name
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.record.set_name = Some(name.into());
        self
    }

    /// Set the user key
    pub fn key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.record.key = Some(key.into());
        self
    }

    /// Set the sending node
    pub fn source(mut self, node: NodeId) -> Self {
        self.record.source = node;
        self
    }

    /// Finish
    pub fn build(self) -> RemoteRecord {
        self.record
    }
}
