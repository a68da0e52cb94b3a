//! Identifier and metadata types shared by every layer
//!
//! This module defines:
//! - Digest: content-derived record identifier
//! - Generation: 16-bit wrapping mutation counter
//! - SetId / NodeId / PartitionId: small copyable identifiers
//! - ConflictResolutionPolicy: how two copies of a record are ranked
//! - StorageLayout: where bins live and how many a record may hold
//! - Origin / WriteBuffer: why a remote record arrived and where it is written

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

use crate::limits::{DIGEST_SIZE, MAX_BINS, N_PARTITIONS};

/// Content-derived record identifier
///
/// A digest uniquely identifies a record within a namespace. It never changes
/// for the life of the record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// Wrap raw digest bytes
    pub const fn new(bytes: [u8; DIGEST_SIZE]) -> Self {
        Digest(bytes)
    }

    /// Derive the digest of a user key within a set
    ///
    /// The set name participates so the same user key in two sets maps to two
    /// distinct records.
    pub fn compute(set_name: &str, key: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(set_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(key);
        let hash = hasher.finalize();

        let mut bytes = [0u8; DIGEST_SIZE];
        bytes.copy_from_slice(&hash[..DIGEST_SIZE]);
        Digest(bytes)
    }

    /// Raw digest bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// Partition this digest belongs to
    #[inline]
    pub fn partition_id(&self) -> PartitionId {
        let raw = u16::from(self.0[0]) | (u16::from(self.0[1]) << 8);
        PartitionId(raw & (N_PARTITIONS - 1))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// Partition identifier, `0..N_PARTITIONS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionId(u16);

impl PartitionId {
    /// Create a partition id, masking into range
    pub const fn new(id: u16) -> Self {
        PartitionId(id & (N_PARTITIONS - 1))
    }

    /// Raw partition number
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cluster node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Interned set identifier, unique within a namespace (starts at 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub u16);

/// Per-record mutation counter
///
/// Generations are 16 bits wide and wrap. Ordering between two generations is
/// only meaningful through [`Generation::is_behind`], which treats the counter
/// as a ring: `a` is behind `b` when `b` is less than half the ring ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Generation(u16);

impl Generation {
    /// Generation of a freshly created, never written record
    pub const ZERO: Generation = Generation(0);

    /// Wrap a raw generation
    pub const fn new(raw: u16) -> Self {
        Generation(raw)
    }

    /// Raw counter value
    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Next generation, wrapping at 2^16
    #[inline]
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }

    /// Wrap-aware "less than"
    ///
    /// `self` is behind `other` iff `self - other (mod 2^16) > 2^15`.
    /// Generations exactly half the ring apart are behind neither way.
    #[inline]
    pub fn is_behind(self, other: Generation) -> bool {
        self.0.wrapping_sub(other.0) > 0x8000
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the local and a remote copy of a record are ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictResolutionPolicy {
    /// Direct generation comparison, last-update-time breaks ties
    Generation,
    /// Last-update-time, wrap-aware generation breaks ties
    LastUpdateTime,
    /// Strong-consistency comparison
    Consistency,
}

impl Default for ConflictResolutionPolicy {
    fn default() -> Self {
        ConflictResolutionPolicy::Generation
    }
}

impl fmt::Display for ConflictResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictResolutionPolicy::Generation => "generation",
            ConflictResolutionPolicy::LastUpdateTime => "last-update-time",
            ConflictResolutionPolicy::Consistency => "consistency",
        };
        f.write_str(name)
    }
}

/// Where a namespace keeps bins, and whether records are single-bin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageLayout {
    /// Bins are resident in memory (otherwise only on the device)
    pub bins_in_memory: bool,
    /// Records hold at most one unnamed-container bin
    pub single_bin: bool,
}

impl StorageLayout {
    /// Memory-resident, multi-bin
    pub const MEMORY: StorageLayout = StorageLayout {
        bins_in_memory: true,
        single_bin: false,
    };

    /// Memory-resident, single-bin
    pub const MEMORY_SINGLE_BIN: StorageLayout = StorageLayout {
        bins_in_memory: true,
        single_bin: true,
    };

    /// Device-resident, multi-bin
    pub const DEVICE: StorageLayout = StorageLayout {
        bins_in_memory: false,
        single_bin: false,
    };

    /// Device-resident, single-bin
    pub const DEVICE_SINGLE_BIN: StorageLayout = StorageLayout {
        bins_in_memory: false,
        single_bin: true,
    };

    /// Maximum bins a record may hold under this layout
    #[inline]
    pub fn max_bins(&self) -> usize {
        if self.single_bin {
            1
        } else {
            MAX_BINS
        }
    }
}

/// Why a remote record arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Replica write from the partition's master
    Replication,
    /// Partition migration
    Migration,
    /// Duplicate resolution on behalf of a client transaction
    DuplicateResolution,
}

impl Origin {
    /// Device write-buffer class used for records of this origin
    pub fn write_buffer(self) -> WriteBuffer {
        match self {
            Origin::Replication => WriteBuffer::Prole,
            Origin::Migration => WriteBuffer::Uncached,
            Origin::DuplicateResolution => WriteBuffer::Master,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Origin::Replication => "replication",
            Origin::Migration => "migration",
            Origin::DuplicateResolution => "duplicate-resolution",
        };
        f.write_str(name)
    }
}

/// Device write-buffer class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteBuffer {
    /// Master writes (and duplicate resolution)
    Master,
    /// Replica writes
    Prole,
    /// Migration writes, not kept in the post-write cache
    Uncached,
}
