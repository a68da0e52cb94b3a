//! Partition ownership
//!
//! Replica writes are only accepted from a node the local node recognises as
//! a source for the partition: the partition's master (when the local node
//! is a replica) or one of its replicas (when the local node is master and
//! is receiving a replica-originated copy).

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use strata_core::{Error, NodeId, PartitionId, Result};

/// Decides whether a node may send replica writes for a partition
pub trait PartitionOwnership: Send + Sync {
    /// Check that `node` is a legitimate source for `partition`
    ///
    /// Returns whether the sender is a replica rather than the master.
    /// Fails with `Forbidden` for any other node.
    fn check_source(&self, partition: PartitionId, node: NodeId) -> Result<bool>;
}

/// Master and replica list for one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOwners {
    /// Master node
    pub master: NodeId,
    /// Replica nodes
    pub replicas: Vec<NodeId>,
}

/// Partition table keyed by partition id
#[derive(Debug, Default)]
pub struct PartitionTable {
    owners: DashMap<PartitionId, PartitionOwners, BuildHasherDefault<FxHasher>>,
}

impl PartitionTable {
    /// Empty table; every replica write is refused
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign owners for a partition
    pub fn assign(&self, partition: PartitionId, master: NodeId, replicas: Vec<NodeId>) {
        self.owners.insert(partition, PartitionOwners { master, replicas });
    }

    /// Forget a partition's owners
    pub fn clear(&self, partition: PartitionId) {
        self.owners.remove(&partition);
    }

    /// Owners of a partition
    pub fn owners(&self, partition: PartitionId) -> Option<PartitionOwners> {
        self.owners.get(&partition).map(|o| o.clone())
    }
}

impl PartitionOwnership for PartitionTable {
    fn check_source(&self, partition: PartitionId, node: NodeId) -> Result<bool> {
        let owners = self
            .owners
            .get(&partition)
            .ok_or_else(|| Error::Forbidden(format!("partition {} has no owners", partition)))?;

        if owners.master == node {
            Ok(false)
        } else if owners.replicas.contains(&node) {
            Ok(true)
        } else {
            Err(Error::Forbidden(format!(
                "node {} is not a source for partition {}",
                node, partition
            )))
        }
    }
}

/// Ownership that accepts every sender as the master
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PartitionOwnership for AcceptAll {
    fn check_source(&self, _partition: PartitionId, _node: NodeId) -> Result<bool> {
        Ok(false)
    }
}
