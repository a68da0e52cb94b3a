//! Core types for the Strata record-replace core
//!
//! This crate defines the foundational types used throughout the system:
//! - Digest, Generation, SetId, NodeId, PartitionId: identifiers
//! - ConflictResolutionPolicy: how two copies of a record are ranked
//! - StorageLayout: memory vs device residency, single vs multi bin
//! - Origin / WriteBuffer: why a remote record arrived, where it is written
//! - Bin / BinValue: record data
//! - Error / StorageError / ResultCode: error taxonomy
//! - limits: size limits for bins and sets
//! - clock: void-time conversions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod error;
pub mod limits;
pub mod types;
pub mod value;

pub use error::{Error, Result, ResultCode, StorageError};
pub use limits::LimitError;
pub use types::{
    ConflictResolutionPolicy, Digest, Generation, NodeId, Origin, PartitionId, SetId,
    StorageLayout, WriteBuffer,
};
pub use value::{Bin, BinValue, ParticleType};
