//! Replica writes: partition admission and change notification.

use crate::common::*;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock, Weak};
use strata_replica::PartitionId;

/// Notifier that checks the record lock is free when it is called
#[derive(Default)]
struct LockCheck {
    ns: OnceLock<Weak<Namespace>>,
    seen: Mutex<Vec<(SubmitInfo, bool)>>,
}

impl ChangeNotifier for LockCheck {
    fn submit(&self, info: SubmitInfo) {
        let locked = self
            .ns
            .get()
            .and_then(Weak::upgrade)
            .map(|ns| ns.index().is_locked(&info.digest))
            .unwrap_or(true);
        self.seen.lock().push((info, locked));
    }
}

fn watched() -> (Arc<Namespace>, Arc<LockCheck>) {
    let watcher = Arc::new(LockCheck::default());
    let ns = Arc::new(
        Namespace::builder(NamespaceConfig::for_testing())
            .notifier(watcher.clone())
            .build()
            .unwrap(),
    );
    watcher.ns.set(Arc::downgrade(&ns)).unwrap();
    (ns, watcher)
}

#[test]
fn notifications_run_outside_the_record_lock() {
    let (ns, watcher) = watched();

    ns.replace_if_better(&remote(Origin::Replication, b"n", 1, 10))
        .unwrap();
    assert_eq!(
        ns.replace_if_better(&remote(Origin::Replication, b"n", 1, 5)),
        Err(Error::RecordExists)
    );

    let seen = watcher.seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|(_, locked)| !locked));
}

#[test]
fn applied_replica_write_reports_previous_lut() {
    let t = TestNs::memory();
    t.ns.replace_if_better(&remote(Origin::Migration, b"r", 1, 100))
        .unwrap();
    t.ns.replace_if_better(&remote(Origin::Replication, b"r", 2, 200))
        .unwrap();

    let entries = t.xdr.drain();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].generation, Generation::new(2));
    assert_eq!(entries[0].last_update_time, 200);
    assert_eq!(entries[0].prev_last_update_time, 100);
    assert_eq!(entries[0].set_id, t.ns.sets().get(SET));
}

#[test]
fn only_replica_writes_notify() {
    let t = TestNs::memory();
    t.ns.replace_if_better(&remote(Origin::Migration, b"a", 1, 1))
        .unwrap();
    t.ns.replace_if_better(&remote(Origin::DuplicateResolution, b"a", 2, 2))
        .unwrap();
    let _ = t.ns.replace_if_better(&remote(Origin::Migration, b"a", 1, 1));
    assert!(t.xdr.is_empty());
}

#[test]
fn replica_tie_notifies_local_state() {
    let t = TestNs::memory();
    t.ns.replace_if_better(&remote(Origin::Migration, b"t", 4, 40))
        .unwrap();
    assert_eq!(
        t.ns.replace_if_better(&remote(Origin::Replication, b"t", 4, 40)),
        Err(Error::RecordExists)
    );
    let entries = t.xdr.drain();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].generation, Generation::new(4));
}

#[test]
fn replica_write_ignores_generation_policy() {
    let t = TestNs::memory();
    t.ns.replace_if_better(&remote(Origin::Migration, b"p", 9, 10))
        .unwrap();
    assert_eq!(
        t.ns.replace_if_better(&remote(Origin::Replication, b"p", 1, 11)),
        Ok(ReplaceStatus::Applied { created: false })
    );
}

fn table_namespace(table: Arc<PartitionTable>) -> TestNs {
    let t = TestNs::memory();
    TestNs {
        ns: Namespace::builder(NamespaceConfig::for_testing())
            .device(t.device.clone())
            .notifier(t.xdr.clone())
            .partitions(table)
            .build()
            .unwrap(),
        ..t
    }
}

#[test]
fn unknown_sender_is_forbidden() {
    let table = Arc::new(PartitionTable::new());
    let t = table_namespace(table.clone());
    let d = digest(b"q");
    let partition: PartitionId = d.partition_id();
    table.assign(partition, NodeId(1), vec![NodeId(2)]);

    let mut rr = remote(Origin::Replication, b"q", 1, 1);
    rr.source = NodeId(9);
    assert!(matches!(t.ns.replace_if_better(&rr), Err(Error::Forbidden(_))));
    assert!(!t.ns.index().contains(&d));
    assert!(t.xdr.is_empty());

    rr.source = NodeId(1);
    assert!(t.ns.replace_if_better(&rr).is_ok());

    let mut rr = remote(Origin::Replication, b"q", 2, 2);
    rr.source = NodeId(2);
    assert!(t.ns.replace_if_better(&rr).is_ok());
    t.assert_handles_closed();
}

#[test]
fn partition_check_only_applies_to_replica_writes() {
    let t = table_namespace(Arc::new(PartitionTable::new()));
    assert!(t
        .ns
        .replace_if_better(&remote(Origin::Migration, b"m", 1, 1))
        .is_ok());
    assert!(matches!(
        t.ns.replace_if_better(&remote(Origin::Replication, b"m", 2, 2)),
        Err(Error::Forbidden(_))
    ));
    assert_eq!(t.generation(b"m"), Some(Generation::new(1)));
}
