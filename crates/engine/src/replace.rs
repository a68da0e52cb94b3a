//! Record replace orchestration
//!
//! Decides whether an incoming remote record overwrites the local copy and
//! drives the applier when it does.
//!
//! ```text
//! Start → AcquireOrCreate → AdmissionCheck → Resolve
//!       → { LocalWins | Tie: reject, RemoteWins: Apply }
//!       → Apply { Ok: Commit, Err: Rollback } → Release
//! ```
//!
//! # Rejections
//!
//! | Origin | Tie | Local wins |
//! |---|---|---|
//! | Replication | `RecordExists`, local state notified | `RecordExists`, local state notified |
//! | Migration | `RecordExists` | `RecordExists` |
//! | Duplicate resolution | `RecordExists` | `Generation` |
//!
//! A replica write that loses still reports the local state to the change
//! notifier, since a migration may already have moved past this record
//! without notifying.
//!
//! Notifications are always submitted after the record lock is released.

use strata_core::{Error, Origin, Result};
use strata_storage::{IndexRef, ReplaceCounter};
use tracing::{debug, trace};

use crate::apply::apply_remote;
use crate::namespace::Namespace;
use crate::remote::RemoteRecord;
use crate::resolve::{resolve, Resolution};
use crate::xdr::SubmitInfo;

/// Successful replace outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStatus {
    /// The remote record was written
    Applied {
        /// Whether the record did not exist locally before
        created: bool,
    },
    /// The record would be created under a truncation horizon; nothing written
    Truncated,
}

impl Namespace {
    /// Replace the local record with `rr` if `rr` ranks higher
    ///
    /// Exactly one terminal outcome is returned per call. Retrying is safe:
    /// resolution re-decides against whatever the local state is then.
    pub fn replace_if_better(&self, rr: &RemoteRecord) -> Result<ReplaceStatus> {
        let outcome = self.replace(rr);
        let counter = match &outcome {
            Ok(ReplaceStatus::Applied { .. }) => ReplaceCounter::Applied,
            Ok(ReplaceStatus::Truncated) => ReplaceCounter::Truncated,
            Err(Error::RecordExists) | Err(Error::Generation) => ReplaceCounter::Rejected,
            Err(_) => ReplaceCounter::Failed,
        };
        self.stats.record_replace(counter);
        outcome
    }

    fn replace(&self, rr: &RemoteRecord) -> Result<ReplaceStatus> {
        let (mut r, created) = self.index.get_or_create(&rr.digest)?;

        let mut policy = self.policy;
        if rr.origin == Origin::Replication {
            let from_replica = match self.partitions.check_source(rr.partition_id(), rr.source) {
                Ok(from_replica) => from_replica,
                Err(e) => return Err(self.replace_failed(r, created, e)),
            };
            trace!(
                target: "strata::replace",
                ns = %self.name,
                digest = %rr.digest,
                source = %rr.source,
                from_replica,
                "record replace: replica write accepted"
            );
            policy = self.replication_policy();
        }

        if !created && r.flags.drop_pending {
            return Err(self.replace_failed(
                r,
                created,
                Error::Forbidden("record is being dropped".to_string()),
            ));
        }

        if !created {
            let resolution = resolve(
                policy,
                r.meta.generation,
                r.meta.last_update_time,
                rr.generation,
                rr.last_update_time,
            );
            if resolution != Resolution::RemoteWins {
                debug!(
                    target: "strata::replace",
                    ns = %self.name,
                    digest = %rr.digest,
                    origin = %rr.origin,
                    ?resolution,
                    local_gen = %r.meta.generation,
                    remote_gen = %rr.generation,
                    "record replace: local record kept"
                );
                return Err(self.reject(r, rr.origin, resolution));
            }
        }

        if created {
            if let Some(set_name) = &rr.set_name {
                match self.sets.get_or_insert(set_name) {
                    Ok(set_id) => r.set_id = Some(set_id),
                    Err(e) => return Err(self.replace_failed(r, created, e.into())),
                }
            }

            r.meta.last_update_time = rr.last_update_time;

            if self
                .truncation
                .is_truncated(rr.last_update_time, rr.set_name.as_deref())
            {
                debug!(
                    target: "strata::replace",
                    ns = %self.name,
                    digest = %rr.digest,
                    "record replace: truncated"
                );
                self.abandon(r, created);
                return Ok(ReplaceStatus::Truncated);
            }
        }

        let mut rd = if created {
            self.device.create(&rr.digest)
        } else {
            self.device.open(&rr.digest)
        };
        rd.set_pickle(&rr.pickle, rr.n_bins);
        rd.set_write_buffer(rr.origin.write_buffer());

        let prev_lut = r.meta.last_update_time;

        if let Err(e) = apply_remote(&self.apply_context(), rr, &mut r, &rd) {
            self.device.close(rd);
            return Err(self.replace_failed(r, created, e));
        }

        let submit =
            (rr.origin == Origin::Replication).then(|| SubmitInfo::capture(&r, prev_lut));

        trace!(
            target: "strata::replace",
            ns = %self.name,
            digest = %rr.digest,
            generation = %r.meta.generation,
            created,
            "record replaced"
        );

        self.device.close(rd);
        r.release();

        if let Some(info) = submit {
            self.notifier.submit(info);
        }

        Ok(ReplaceStatus::Applied { created })
    }

    /// Reject a remote record that did not beat the local one
    fn reject(&self, r: IndexRef<'_>, origin: Origin, resolution: Resolution) -> Error {
        match origin {
            Origin::Replication => {
                let info = SubmitInfo::capture(&r, r.meta.last_update_time);
                r.release();
                self.notifier.submit(info);
                Error::RecordExists
            }
            Origin::Migration => self.replace_failed(r, false, Error::RecordExists),
            Origin::DuplicateResolution => {
                let error = if resolution == Resolution::Tie {
                    Error::RecordExists
                } else {
                    Error::Generation
                };
                self.replace_failed(r, false, error)
            }
        }
    }

    fn replace_failed(&self, r: IndexRef<'_>, created: bool, error: Error) -> Error {
        self.abandon(r, created);
        error
    }

    /// Undo a creation (if any) and release the reference
    fn abandon(&self, mut r: IndexRef<'_>, created: bool) {
        if created {
            self.index.delete(&mut r);
        }
        r.release();
    }
}
