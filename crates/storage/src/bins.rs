//! Bin container
//!
//! `BinStorage` is the tagged representation of a record's bins. Which
//! variant a record uses is fixed by the namespace's [`StorageLayout`]:
//!
//! | layout | variant |
//! |---|---|
//! | device-resident | `OnDevice` (only the count is tracked) |
//! | memory, single-bin | `Single` |
//! | memory, multi-bin | `Bins`, or `BinsWithKey` once a key is stored |
//!
//! Single-bin records never use the general container.

use strata_core::{Bin, StorageLayout};

/// A record's bins
#[derive(Debug, Clone, PartialEq)]
pub enum BinStorage {
    /// Bins live on the device only
    OnDevice {
        /// Bins in the stored record
        n_bins: u16,
    },
    /// Single-bin record, zero or one bin
    Single(Option<Bin>),
    /// Multi-bin record without a stored key
    Bins(Vec<Bin>),
    /// Multi-bin record with its user key stored alongside the bins
    BinsWithKey {
        /// The bins
        bins: Vec<Bin>,
        /// Stored user key
        key: Box<[u8]>,
    },
}

impl BinStorage {
    /// Empty container for a layout
    pub fn empty(layout: StorageLayout) -> Self {
        match (layout.bins_in_memory, layout.single_bin) {
            (false, _) => BinStorage::OnDevice { n_bins: 0 },
            (true, true) => BinStorage::Single(None),
            (true, false) => BinStorage::Bins(Vec::new()),
        }
    }

    /// Memory-resident bins (empty for device-resident records)
    pub fn as_slice(&self) -> &[Bin] {
        match self {
            BinStorage::OnDevice { .. } => &[],
            BinStorage::Single(bin) => bin.as_ref().map(std::slice::from_ref).unwrap_or(&[]),
            BinStorage::Bins(bins) => bins.as_slice(),
            BinStorage::BinsWithKey { bins, .. } => bins.as_slice(),
        }
    }

    /// Number of bins in the record
    pub fn n_bins(&self) -> u16 {
        match self {
            BinStorage::OnDevice { n_bins } => *n_bins,
            other => other.as_slice().len() as u16,
        }
    }

    /// Stored user key, if any
    pub fn key(&self) -> Option<&[u8]> {
        match self {
            BinStorage::BinsWithKey { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Replace the bins, keeping any stored key
    ///
    /// Returns the previous bins. For `OnDevice` only the count changes.
    pub fn replace(&mut self, mut new_bins: Vec<Bin>, n_bins: u16) -> Vec<Bin> {
        match self {
            BinStorage::OnDevice { n_bins: count } => {
                *count = n_bins;
                Vec::new()
            }
            BinStorage::Single(slot) => {
                debug_assert!(new_bins.len() <= 1, "single-bin record given many bins");
                let old = slot.take();
                *slot = new_bins.pop();
                old.into_iter().collect()
            }
            BinStorage::Bins(bins) | BinStorage::BinsWithKey { bins, .. } => {
                std::mem::replace(bins, new_bins)
            }
        }
    }

    /// Attach a key to a multi-bin memory container
    ///
    /// No-op for other variants; they never carry key bytes.
    pub fn store_key(&mut self, key: &[u8]) {
        let bins = match self {
            BinStorage::Bins(bins) => std::mem::take(bins),
            BinStorage::BinsWithKey { key: stored, .. } => {
                *stored = key.into();
                return;
            }
            _ => return,
        };
        *self = BinStorage::BinsWithKey {
            bins,
            key: key.into(),
        };
    }

    /// Detach a stored key, returning it
    pub fn drop_key(&mut self) -> Option<Box<[u8]>> {
        match std::mem::replace(self, BinStorage::Bins(Vec::new())) {
            BinStorage::BinsWithKey { bins, key } => {
                *self = BinStorage::Bins(bins);
                Some(key)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    /// Memory charged for the bins and stored key
    pub fn mem_size(&self) -> u64 {
        let bins: usize = self.as_slice().iter().map(Bin::mem_size).sum();
        let key = self.key().map(<[u8]>::len).unwrap_or(0);
        (bins + key) as u64
    }

    /// Destroy all bins and any stored key, returning the memory released
    pub fn destroy(&mut self) -> u64 {
        let released = self.mem_size();
        match self {
            BinStorage::OnDevice { n_bins } => *n_bins = 0,
            BinStorage::Single(slot) => *slot = None,
            BinStorage::Bins(bins) => bins.clear(),
            BinStorage::BinsWithKey { .. } => *self = BinStorage::Bins(Vec::new()),
        }
        released
    }
}
