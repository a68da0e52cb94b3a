//! Record applier
//!
//! Overwrites a locked local record with an admitted remote copy. One routine
//! covers all four layouts:
//!
//! | | memory | device |
//! |---|---|---|
//! | single-bin | decode 0/1 bin, no secondary index, key untouched | no decode, key flag reconciled |
//! | multi-bin | decode, secondary index, key bytes reconciled | decode and load old bins only when the set is indexed, key flag reconciled |
//!
//! # Failure atomicity
//!
//! Decoding and the durable write are the only fallible steps. Decoding runs
//! before any mutation. Metadata is overwritten before the write (the device
//! persists it) and restored from a snapshot if the write fails. Everything
//! after a successful write is infallible.

use strata_core::limits::validate_bin_count;
use strata_core::{Bin, Error, Result, StorageLayout};
use strata_storage::{
    IndexMetadata, PickleCodec, Record, SetRegistry, StatsSink, StorageEngine, StorageRecord,
};
use tracing::{debug, warn};

use crate::remote::RemoteRecord;
use crate::sindex::SecondaryIndex;

/// Collaborators the applier needs
pub struct ApplyContext<'a> {
    /// Namespace name, for logging
    pub namespace: &'a str,
    /// Namespace storage layout
    pub layout: StorageLayout,
    /// Storage engine
    pub device: &'a dyn StorageEngine,
    /// Pickle codec
    pub codec: &'a dyn PickleCodec,
    /// Namespace statistics
    pub stats: &'a dyn StatsSink,
    /// Set registry
    pub sets: &'a SetRegistry,
    /// Secondary indexes
    pub sindex: &'a dyn SecondaryIndex,
}

/// Bins a replace needs in memory, loaded before any mutation
struct Staged {
    old_bins: Option<Vec<Bin>>,
    new_bins: Vec<Bin>,
    indexed: bool,
}

/// Apply `rr` to `record`, writing through `rd`
///
/// `rd` must already carry the remote pickle. On error `record` is exactly as
/// it was before the call.
pub fn apply_remote(
    ctx: &ApplyContext<'_>,
    rr: &RemoteRecord,
    record: &mut Record,
    rd: &StorageRecord<'_>,
) -> Result<()> {
    validate_bin_count(usize::from(rr.n_bins), ctx.layout.max_bins())?;

    let staged = stage(ctx, rr, record)?;
    let memory_bytes = record.mem_size();

    let snapshot = record.stash_metadata();
    record.replace_metadata(rr.generation, rr.last_update_time, rr.void_time);

    if let Err(e) = ctx.device.write(rd, record) {
        debug!(
            target: "strata::replace",
            ns = ctx.namespace,
            digest = %rr.digest,
            error = %e,
            "record replace: failed write"
        );
        record.unwind_metadata(&snapshot);
        return Err(Error::Storage(e));
    }

    transition_stats(ctx, record, &snapshot);

    if !ctx.layout.single_bin {
        if staged.indexed {
            let old_bins = staged
                .old_bins
                .as_deref()
                .unwrap_or_else(|| record.bins.as_slice());
            record.flags.in_sindex = ctx.sindex.update_membership(
                record.digest(),
                record.set_id,
                old_bins,
                &staged.new_bins,
            );
        } else {
            // A dropped index leaves the flag behind.
            record.flags.in_sindex = false;
        }
    }

    let resident = if ctx.layout.bins_in_memory {
        staged.new_bins
    } else {
        Vec::new()
    };
    drop(record.bins.replace(resident, rr.n_bins));

    if !(ctx.layout.bins_in_memory && ctx.layout.single_bin) {
        record.finalize_key(rr.key());
    }

    if ctx.layout.bins_in_memory {
        ctx.stats.adjust_memory(memory_bytes, record.mem_size());
    }

    Ok(())
}

/// Decode the incoming bins and, when the secondary index needs them, load
/// the old ones. Never mutates the record.
fn stage(ctx: &ApplyContext<'_>, rr: &RemoteRecord, record: &Record) -> Result<Staged> {
    let layout = ctx.layout;
    let indexed = !layout.single_bin && ctx.sindex.set_has_index(record.set_id);

    let old_bins = if !layout.bins_in_memory && indexed && record.flags.in_sindex {
        Some(load_bins(ctx, record)?)
    } else {
        None
    };

    let needs_decode = layout.bins_in_memory || indexed;
    let new_bins = if needs_decode && rr.n_bins != 0 {
        ctx.codec.unpack(&rr.pickle, rr.n_bins).map_err(|e| {
            warn!(
                target: "strata::replace",
                ns = ctx.namespace,
                digest = %rr.digest,
                error = %e,
                "record replace: failed unpickle bins"
            );
            Error::from(e)
        })?
    } else {
        Vec::new()
    };

    Ok(Staged {
        old_bins,
        new_bins,
        indexed,
    })
}

/// Read and decode a device-resident record's current bins
pub(crate) fn load_bins(ctx: &ApplyContext<'_>, record: &Record) -> Result<Vec<Bin>> {
    let block = match ctx.device.read(record.digest())? {
        Some(block) => block,
        None => return Ok(Vec::new()),
    };
    if block.n_bins == 0 {
        return Ok(Vec::new());
    }
    ctx.codec.unpack(&block.pickle, block.n_bins).map_err(|e| {
        warn!(
            target: "strata::replace",
            ns = ctx.namespace,
            digest = %record.digest(),
            error = %e,
            "record replace: failed load bins"
        );
        Error::from(e)
    })
}

/// Committed-state statistics
///
/// A record's first commit counts it into its set and, if it never expires,
/// into the non-expirable count. Later commits only track expiry changes.
fn transition_stats(ctx: &ApplyContext<'_>, record: &mut Record, old: &IndexMetadata) {
    let is_expirable = record.meta.is_expirable();

    if record.flags.committed {
        ctx.stats
            .expiration_transition(old.meta().is_expirable(), is_expirable);
        return;
    }

    record.flags.committed = true;
    if let Some(set_id) = record.set_id {
        ctx.sets.incr_objects(set_id);
    }
    // A record entering the namespace moves from "expirable" (absent) to
    // its own state.
    ctx.stats.expiration_transition(true, is_expirable);
}
