//! Record-replace engine
//!
//! This crate decides whether a remote copy of a record replaces the local
//! one, and applies the replacement:
//! - resolve: conflict resolution between local and remote copies
//! - apply: the record applier, generic over storage layout
//! - replace: the replace orchestrator on `Namespace`
//! - namespace: wiring of the index store and collaborators
//!
//! Collaborator seams (traits with in-process implementations):
//! - SecondaryIndex / BinIndex
//! - PartitionOwnership / PartitionTable
//! - ChangeNotifier / XdrLog
//! - TruncationRegistry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod apply;
pub mod config;
pub mod namespace;
pub mod partition;
pub mod remote;
pub mod replace;
pub mod resolve;
pub mod sindex;
pub mod truncate;
pub mod xdr;

pub use apply::{apply_remote, ApplyContext};
pub use config::{ConfigError, NamespaceConfig, CONFIG_FILE_NAME};
pub use namespace::{Namespace, NamespaceBuilder, RecordView};
pub use partition::{AcceptAll, PartitionOwners, PartitionOwnership, PartitionTable};
pub use remote::{RemoteRecord, RemoteRecordBuilder};
pub use replace::ReplaceStatus;
pub use resolve::{resolve, Resolution};
pub use sindex::{BinIndex, IndexKey, SecondaryIndex};
pub use truncate::TruncationRegistry;
pub use xdr::{ChangeNotifier, NoopNotifier, SubmitInfo, XdrLog};
