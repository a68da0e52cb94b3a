//! Conflict resolution
//!
//! Ranks the local and a remote copy of a record. Pure and deterministic:
//! no clock reads, no randomness, same answer for the same inputs.
//!
//! | Policy | First key | Tie-break |
//! |---|---|---|
//! | `Generation` | generation, direct numeric | LUT |
//! | `LastUpdateTime` | LUT | generation, wrap-aware |
//! | `Consistency` | LUT | generation, wrap-aware |
//!
//! Generation priority compares raw counters on purpose: after a split brain
//! where one side restarts at generation 0, the side with more history wins.

use std::cmp::Ordering;
use strata_core::{ConflictResolutionPolicy, Generation};

/// Outcome of comparing the local and remote copies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Keep the local record
    LocalWins,
    /// Replace the local record with the remote one
    RemoteWins,
    /// Neither copy ranks higher
    Tie,
}

impl Resolution {
    fn from_remote_ordering(remote_vs_local: Ordering) -> Self {
        match remote_vs_local {
            Ordering::Greater => Resolution::RemoteWins,
            Ordering::Less => Resolution::LocalWins,
            Ordering::Equal => Resolution::Tie,
        }
    }
}

/// Compare local and remote copies under `policy`
pub fn resolve(
    policy: ConflictResolutionPolicy,
    local_gen: Generation,
    local_lut: u64,
    remote_gen: Generation,
    remote_lut: u64,
) -> Resolution {
    let ordering = match policy {
        ConflictResolutionPolicy::Generation => remote_gen
            .get()
            .cmp(&local_gen.get())
            .then(remote_lut.cmp(&local_lut)),
        ConflictResolutionPolicy::LastUpdateTime | ConflictResolutionPolicy::Consistency => {
            remote_lut
                .cmp(&local_lut)
                .then_with(|| wrapping_cmp(remote_gen, local_gen))
        }
    };
    Resolution::from_remote_ordering(ordering)
}

fn wrapping_cmp(a: Generation, b: Generation) -> Ordering {
    if b.is_behind(a) {
        Ordering::Greater
    } else if a.is_behind(b) {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}
