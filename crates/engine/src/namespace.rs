//! Namespace wiring
//!
//! A `Namespace` owns one index store and the collaborators the replace path
//! talks to. Collaborators are injected through [`NamespaceBuilder`]; anything
//! not supplied gets the in-process default.
//!
//! # Example
//!
//! ```ignore
//! use strata_engine::{Namespace, NamespaceConfig};
//!
//! let ns = Namespace::builder(NamespaceConfig::new("users"))
//!     .partitions(table)
//!     .notifier(shipper)
//!     .build()?;
//! let status = ns.replace_if_better(&remote)?;
//! ```

use std::sync::Arc;
use strata_core::clock::now_void_time;
use strata_core::{
    Bin, ConflictResolutionPolicy, Digest, Error, Generation, Result, SetId, StorageLayout,
};
use strata_storage::{
    get_codec, IndexStore, MemoryDevice, NamespaceStats, PickleCodec, Reclaim, Record,
    SetRegistry, StatsSink, StatsSnapshot, StorageEngine,
};
use tracing::{debug, warn};

use crate::apply::{load_bins, ApplyContext};
use crate::config::{ConfigError, NamespaceConfig};
use crate::partition::{AcceptAll, PartitionOwnership};
use crate::sindex::{BinIndex, SecondaryIndex};
use crate::truncate::TruncationRegistry;
use crate::xdr::{ChangeNotifier, NoopNotifier};

/// Releases what a deleted record owns once its last reference goes
struct RecordReclaimer {
    device: Arc<dyn StorageEngine>,
    stats: Arc<NamespaceStats>,
    sets: Arc<SetRegistry>,
}

impl Reclaim for RecordReclaimer {
    fn reclaim(&self, record: &mut Record) {
        let released = record.bins.destroy();
        self.stats.adjust_memory(released, 0);

        if record.flags.committed {
            if let Some(set_id) = record.set_id {
                self.sets.decr_objects(set_id);
            }
            // Leaving the namespace counts as becoming expirable.
            self.stats
                .expiration_transition(record.meta.is_expirable(), true);
        }

        self.device.destroy(record.digest(), record.instance());
    }
}

/// Copy of a record's committed state
#[derive(Debug, Clone, PartialEq)]
pub struct RecordView {
    /// Record digest
    pub digest: Digest,
    /// Generation
    pub generation: Generation,
    /// Last update time
    pub last_update_time: u64,
    /// Void time, 0 = never expires
    pub void_time: u32,
    /// Set name
    pub set_name: Option<String>,
    /// Bins, decoded from the device for device-resident namespaces
    pub bins: Vec<Bin>,
    /// Stored user key bytes (memory-resident multi-bin only)
    pub key: Option<Vec<u8>>,
    /// Whether a key is stored
    pub key_stored: bool,
    /// Whether the record is in a secondary index
    pub in_sindex: bool,
}

/// Record store for one namespace
pub struct Namespace {
    pub(crate) name: String,
    pub(crate) layout: StorageLayout,
    pub(crate) policy: ConflictResolutionPolicy,
    pub(crate) strong_consistency: bool,
    pub(crate) index: IndexStore,
    pub(crate) device: Arc<dyn StorageEngine>,
    pub(crate) codec: Arc<dyn PickleCodec>,
    pub(crate) stats: Arc<NamespaceStats>,
    pub(crate) sets: Arc<SetRegistry>,
    pub(crate) sindex: Arc<dyn SecondaryIndex>,
    pub(crate) truncation: TruncationRegistry,
    pub(crate) partitions: Arc<dyn PartitionOwnership>,
    pub(crate) notifier: Arc<dyn ChangeNotifier>,
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("policy", &self.policy)
            .field("index", &self.index)
            .finish()
    }
}

impl Namespace {
    /// Start building a namespace from config
    pub fn builder(config: NamespaceConfig) -> NamespaceBuilder {
        NamespaceBuilder::new(config)
    }

    /// Namespace with default collaborators
    pub fn from_config(config: NamespaceConfig) -> std::result::Result<Self, ConfigError> {
        NamespaceBuilder::new(config).build()
    }

    /// Namespace name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage layout
    pub fn layout(&self) -> StorageLayout {
        self.layout
    }

    /// Policy for migration and duplicate resolution
    pub fn conflict_resolution_policy(&self) -> ConflictResolutionPolicy {
        self.policy
    }

    /// Policy for replica writes
    pub fn replication_policy(&self) -> ConflictResolutionPolicy {
        if self.strong_consistency {
            ConflictResolutionPolicy::Consistency
        } else {
            ConflictResolutionPolicy::LastUpdateTime
        }
    }

    /// Index store
    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    /// Set registry
    pub fn sets(&self) -> &SetRegistry {
        &self.sets
    }

    /// Register a set name, returning its id
    pub fn register_set(&self, name: &str) -> Result<SetId> {
        Ok(self.sets.get_or_insert(name)?)
    }

    /// Read a record's committed state
    ///
    /// Absent and expired records are `NotFound`.
    pub fn read(&self, digest: &Digest) -> Result<RecordView> {
        let r = self.index.get(digest)?;
        if r.is_expired(now_void_time()) {
            return Err(Error::NotFound);
        }

        let bins = if self.layout.bins_in_memory {
            r.bins.as_slice().to_vec()
        } else {
            load_bins(&self.apply_context(), &r)?
        };

        Ok(RecordView {
            digest: *r.digest(),
            generation: r.meta.generation,
            last_update_time: r.meta.last_update_time,
            void_time: r.meta.void_time,
            set_name: r.set_id.and_then(|id| self.sets.name(id)),
            bins,
            key: r.bins.key().map(<[u8]>::to_vec),
            key_stored: r.flags.key_stored,
            in_sindex: r.flags.in_sindex,
        })
    }

    /// Remove a record
    ///
    /// Secondary-index entries are removed first; the slot is reclaimed when
    /// the last reference is released. If the bins needed to find those
    /// entries cannot be loaded, the record is left in place and the error
    /// returned.
    pub fn drop_record(&self, digest: &Digest) -> Result<()> {
        let mut r = self.index.get(digest)?;

        if r.flags.in_sindex {
            let bins = if self.layout.bins_in_memory {
                r.bins.as_slice().to_vec()
            } else {
                load_bins(&self.apply_context(), &r).map_err(|e| {
                    warn!(
                        target: "strata::replace",
                        ns = %self.name,
                        %digest,
                        error = %e,
                        "drop: failed to load bins for secondary index"
                    );
                    e
                })?
            };
            self.sindex.remove_record(digest, r.set_id, &bins);
            r.flags.in_sindex = false;
        }

        self.index.delete(&mut r);
        debug!(target: "strata::replace", ns = %self.name, %digest, "dropped record");
        Ok(())
    }

    /// Mark a record as being dropped by a migration
    ///
    /// Replaces targeting it fail with `Forbidden` until it is dropped.
    pub fn mark_drop_pending(&self, digest: &Digest) -> Result<()> {
        let mut r = self.index.get(digest)?;
        r.flags.drop_pending = true;
        Ok(())
    }

    /// Truncate a set, or the whole namespace, before `before_lut`
    pub fn truncate(&self, set_name: Option<&str>, before_lut: u64) {
        match set_name {
            Some(name) => self.truncation.truncate_set(name, before_lut),
            None => self.truncation.truncate_namespace(before_lut),
        }
    }

    /// Truncation horizons
    pub fn truncation(&self) -> &TruncationRegistry {
        &self.truncation
    }

    /// Snapshot of namespace counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn apply_context(&self) -> ApplyContext<'_> {
        ApplyContext {
            namespace: &self.name,
            layout: self.layout,
            device: self.device.as_ref(),
            codec: self.codec.as_ref(),
            stats: self.stats.as_ref(),
            sets: &self.sets,
            sindex: self.sindex.as_ref(),
        }
    }
}

/// Builder for [`Namespace`]
pub struct NamespaceBuilder {
    config: NamespaceConfig,
    device: Option<Arc<dyn StorageEngine>>,
    codec: Option<Arc<dyn PickleCodec>>,
    sindex: Option<Arc<dyn SecondaryIndex>>,
    partitions: Option<Arc<dyn PartitionOwnership>>,
    notifier: Option<Arc<dyn ChangeNotifier>>,
    stats: Option<Arc<NamespaceStats>>,
}

impl NamespaceBuilder {
    /// Builder with default collaborators
    pub fn new(config: NamespaceConfig) -> Self {
        Self {
            config,
            device: None,
            codec: None,
            sindex: None,
            partitions: None,
            notifier: None,
            stats: None,
        }
    }

    /// Storage engine (default: a `MemoryDevice` sized from config)
    pub fn device(mut self, device: Arc<dyn StorageEngine>) -> Self {
        self.device = Some(device);
        self
    }

    /// Pickle codec (default: the codec named by `codec` in config)
    pub fn codec(mut self, codec: Arc<dyn PickleCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Secondary indexes (default: an empty `BinIndex`)
    pub fn secondary_index(mut self, sindex: Arc<dyn SecondaryIndex>) -> Self {
        self.sindex = Some(sindex);
        self
    }

    /// Partition ownership (default: accept every sender as master)
    pub fn partitions(mut self, partitions: Arc<dyn PartitionOwnership>) -> Self {
        self.partitions = Some(partitions);
        self
    }

    /// Change notifier (default: discard)
    pub fn notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Statistics sink, shared with the caller
    pub fn stats(mut self, stats: Arc<NamespaceStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Validate config and build
    pub fn build(self) -> std::result::Result<Namespace, ConfigError> {
        let config = self.config;
        config.validate()?;
        let layout = config.layout()?;

        let device = self.device.unwrap_or_else(|| {
            Arc::new(MemoryDevice::new(
                config.max_record_size,
                config.device_capacity,
            ))
        });
        let codec: Arc<dyn PickleCodec> = match self.codec {
            Some(codec) => codec,
            None => Arc::from(get_codec(&config.codec).map_err(|_| {
                ConfigError::UnknownCodec(config.codec.clone())
            })?),
        };
        let stats = self.stats.unwrap_or_default();
        let sets = Arc::new(SetRegistry::new());

        let reclaimer = Arc::new(RecordReclaimer {
            device: Arc::clone(&device),
            stats: Arc::clone(&stats),
            sets: Arc::clone(&sets),
        });
        let index = IndexStore::new(
            config.index_capacity,
            layout,
            Arc::clone(&stats) as Arc<dyn StatsSink>,
            reclaimer,
        );

        let policy = if config.strong_consistency {
            ConflictResolutionPolicy::Consistency
        } else {
            config.conflict_resolution_policy
        };

        Ok(Namespace {
            name: config.name,
            layout,
            policy,
            strong_consistency: config.strong_consistency,
            index,
            device,
            codec,
            stats,
            sets,
            sindex: self.sindex.unwrap_or_else(|| Arc::new(BinIndex::new())),
            truncation: TruncationRegistry::new(),
            partitions: self.partitions.unwrap_or_else(|| Arc::new(AcceptAll)),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
        })
    }
}
