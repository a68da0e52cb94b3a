//! Secondary indexes on bin values
//!
//! The replace path only maintains membership; query execution lives
//! elsewhere. `BinIndex` supports point lookups so membership can be checked.
//!
//! An index covers one bin of one set (or of records with no set). Integer
//! and string values are indexed; other particle types are ignored.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use strata_core::{Bin, BinValue, Digest, SetId};

/// Secondary-index membership maintenance
pub trait SecondaryIndex: Send + Sync {
    /// Whether any index covers records of `set_id`
    fn set_has_index(&self, set_id: Option<SetId>) -> bool;

    /// Move a record's entries from `old_bins` to `new_bins`
    ///
    /// Values present in both are left untouched. Returns whether the record
    /// is still referenced by any index afterwards.
    fn update_membership(
        &self,
        digest: &Digest,
        set_id: Option<SetId>,
        old_bins: &[Bin],
        new_bins: &[Bin],
    ) -> bool;

    /// Drop every entry for a record
    fn remove_record(&self, digest: &Digest, set_id: Option<SetId>, bins: &[Bin]);
}

/// Indexed value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    /// Integer bin value
    Integer(i64),
    /// String bin value
    String(String),
}

impl IndexKey {
    /// Key for an indexable bin value
    pub fn from_value(value: &BinValue) -> Option<Self> {
        match value {
            BinValue::Integer(v) => Some(IndexKey::Integer(*v)),
            BinValue::String(v) => Some(IndexKey::String(v.clone())),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Index {
    set_id: Option<SetId>,
    bin: String,
    entries: FxHashMap<IndexKey, BTreeSet<Digest>>,
}

impl Index {
    fn key_in(&self, bins: &[Bin]) -> Option<IndexKey> {
        bins.iter()
            .find(|b| b.name == self.bin)
            .and_then(|b| IndexKey::from_value(&b.value))
    }

    fn insert(&mut self, key: IndexKey, digest: Digest) {
        self.entries.entry(key).or_default().insert(digest);
    }

    fn remove(&mut self, key: &IndexKey, digest: &Digest) {
        if let Some(digests) = self.entries.get_mut(key) {
            digests.remove(digest);
            if digests.is_empty() {
                self.entries.remove(key);
            }
        }
    }
}

/// Secondary indexes over integer and string bins
#[derive(Debug, Default)]
pub struct BinIndex {
    indexes: RwLock<Vec<Index>>,
}

impl BinIndex {
    /// No indexes
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `bin` for records of `set_id`; no-op if it already exists
    pub fn create_index(&self, set_id: Option<SetId>, bin: &str) {
        let mut indexes = self.indexes.write();
        if indexes.iter().any(|i| i.set_id == set_id && i.bin == bin) {
            return;
        }
        indexes.push(Index {
            set_id,
            bin: bin.to_string(),
            entries: FxHashMap::default(),
        });
    }

    /// Drop the index on `bin` for `set_id`
    pub fn drop_index(&self, set_id: Option<SetId>, bin: &str) {
        self.indexes
            .write()
            .retain(|i| !(i.set_id == set_id && i.bin == bin));
    }

    /// Digests whose `bin` holds `key`
    pub fn lookup(&self, set_id: Option<SetId>, bin: &str, key: &IndexKey) -> Vec<Digest> {
        self.indexes
            .read()
            .iter()
            .find(|i| i.set_id == set_id && i.bin == bin)
            .and_then(|i| i.entries.get(key))
            .map(|digests| digests.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Total entries across all indexes
    pub fn entry_count(&self) -> usize {
        self.indexes
            .read()
            .iter()
            .flat_map(|i| i.entries.values())
            .map(BTreeSet::len)
            .sum()
    }
}

impl SecondaryIndex for BinIndex {
    fn set_has_index(&self, set_id: Option<SetId>) -> bool {
        self.indexes.read().iter().any(|i| i.set_id == set_id)
    }

    fn update_membership(
        &self,
        digest: &Digest,
        set_id: Option<SetId>,
        old_bins: &[Bin],
        new_bins: &[Bin],
    ) -> bool {
        let mut indexed = false;
        let mut indexes = self.indexes.write();

        for index in indexes.iter_mut().filter(|i| i.set_id == set_id) {
            let old = index.key_in(old_bins);
            let new = index.key_in(new_bins);
            indexed |= new.is_some();
            if old == new {
                continue;
            }
            if let Some(old) = old {
                index.remove(&old, digest);
            }
            if let Some(new) = new {
                index.insert(new, *digest);
            }
        }

        indexed
    }

    fn remove_record(&self, digest: &Digest, set_id: Option<SetId>, bins: &[Bin]) {
        let mut indexes = self.indexes.write();
        for index in indexes.iter_mut().filter(|i| i.set_id == set_id) {
            if let Some(key) = index.key_in(bins) {
                index.remove(&key, digest);
            }
        }
    }
}
