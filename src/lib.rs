//! Strata replica - record replacement for a replicated key-value store
//!
//! When a copy of a record arrives from another node (a replica write, a
//! partition migration, or duplicate resolution), the local node decides
//! whether that copy outranks its own and, if so, overwrites it.
//!
//! # Quick Start
//!
//! ```ignore
//! use strata_replica::{Namespace, NamespaceConfig, RemoteRecord, Origin, Bin, Digest, FlatCodec};
//!
//! let ns = Namespace::from_config(NamespaceConfig::new("users"))?;
//!
//! let rr = RemoteRecord::builder(Digest::compute("users", b"alice"), Origin::Migration)
//!     .generation(3)
//!     .last_update_time(1_700_000_000_000)
//!     .bins(&FlatCodec, &[Bin::new("age", 31i64)])
//!     .build();
//!
//! ns.replace_if_better(&rr)?;
//! ```
//!
//! # Architecture
//!
//! - `strata-core`: identifiers, bins, policies and the error taxonomy
//! - `strata-storage`: index store, records, pickle codec, storage engines
//! - `strata-engine`: conflict resolution, the record applier and the
//!   replace orchestrator

pub use strata_core::{
    clock, Bin, BinValue, ConflictResolutionPolicy, Digest, Error, Generation, NodeId, Origin,
    ParticleType, PartitionId, Result, ResultCode, SetId, StorageError, StorageLayout,
    WriteBuffer,
};
pub use strata_engine::*;
pub use strata_storage::{
    FlatCodec, IndexRef, IndexStore, MemoryDevice, NamespaceStats, PickleCodec, Record,
    StatsSink, StatsSnapshot, StorageEngine,
};
