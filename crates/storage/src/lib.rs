//! Storage layer for the record-replace core
//!
//! This crate implements the per-namespace record storage with:
//! - IndexStore: fixed arena of locked record slots behind a DashMap digest map
//! - Record / BinStorage: index entries and their bin containers
//! - StorageEngine: device contract, with MemoryDevice as the in-process engine
//! - PickleCodec: bin payload encoding (FlatCodec)
//! - SetRegistry: set name interning
//! - StatsSink / NamespaceStats: namespace counters
//!
//! # Locking
//!
//! The per-slot mutex is the only per-record exclusion. Digest map shards are
//! never held while waiting on a slot lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bins;
pub mod codec;
pub mod device;
pub mod index;
pub mod memory_device;
pub mod record;
pub mod sets;
pub mod stats;

pub use bins::BinStorage;
pub use codec::{get_codec, CodecError, FlatCodec, PickleCodec};
pub use device::{StorageEngine, StorageRecord, StoredBlock};
pub use index::{IndexRef, IndexStore, NoReclaim, Reclaim};
pub use memory_device::MemoryDevice;
pub use record::{IndexMetadata, Record, RecordFlags, RecordMeta};
pub use sets::{SetError, SetRegistry};
pub use stats::{NamespaceStats, ReplaceCounter, StatsSink, StatsSnapshot};
