//! Reference counts, device handles and statistics across replace paths.

use crate::common::*;

/// Drive one record through every terminal outcome
fn every_outcome(t: &TestNs) {
    let _ = t.ns.replace_if_better(&remote(Origin::Migration, b"k", 1, 10));
    let _ = t.ns.replace_if_better(&remote(Origin::Migration, b"k", 1, 10));
    let _ = t
        .ns
        .replace_if_better(&remote(Origin::DuplicateResolution, b"k", 0, 10));
    let _ = t.ns.replace_if_better(&remote(Origin::Replication, b"k", 1, 5));
    let _ = t.ns.replace_if_better(&remote(Origin::Replication, b"k", 2, 20));
    t.device.fail_next_write(StorageError::DeviceOverload);
    let _ = t.ns.replace_if_better(&remote(Origin::Migration, b"k", 3, 30));
}

#[test]
fn references_and_handles_released_on_every_path() {
    for (storage, single_bin) in LAYOUTS {
        let t = TestNs::with_layout(storage, single_bin);
        every_outcome(&t);

        assert_eq!(t.ns.index().ref_count(&digest(b"k")), Some(0));
        assert!(!t.ns.index().is_locked(&digest(b"k")));
        t.assert_handles_closed();
    }
}

#[test]
fn outcome_counters() {
    let t = TestNs::memory();
    every_outcome(&t);

    let stats = t.ns.stats();
    assert_eq!(stats.replace_applied, 2);
    assert_eq!(stats.replace_rejected, 3);
    assert_eq!(stats.replace_failed, 1);
    assert_eq!(stats.replace_truncated, 0);
    assert_eq!(stats.objects, 1);
}

#[test]
fn set_object_count_tracks_first_commit_only() {
    let t = TestNs::device();
    for gen in 1..=5 {
        t.ns.replace_if_better(&remote(Origin::Migration, b"k", gen, u64::from(gen)))
            .unwrap();
    }
    let set = t.ns.sets().get(SET).unwrap();
    assert_eq!(t.ns.sets().objects(set), 1);

    t.ns.drop_record(&digest(b"k")).unwrap();
    assert_eq!(t.ns.sets().objects(set), 0);
    assert_eq!(t.device.record_count(), 0);
}

#[test]
fn expirable_transitions() {
    let t = TestNs::memory();
    let far = strata_replica::clock::now_void_time() + 3600;

    t.ns.replace_if_better(&remote(Origin::Migration, b"e", 1, 1))
        .unwrap();
    assert_eq!(t.ns.stats().non_expirable_objects, 1);

    let rr = RemoteRecord::builder(digest(b"e"), Origin::Migration)
        .generation(2)
        .last_update_time(2)
        .void_time(far)
        .bins(&FlatCodec, &[Bin::new("v", 2i64)])
        .build();
    t.ns.replace_if_better(&rr).unwrap();
    assert_eq!(t.ns.stats().non_expirable_objects, 0);
    assert_eq!(t.ns.read(&digest(b"e")).unwrap().void_time, far);

    t.ns.drop_record(&digest(b"e")).unwrap();
    assert_eq!(t.ns.stats().non_expirable_objects, 0);
}

#[test]
fn memory_accounting_follows_bin_size() {
    let t = TestNs::memory();
    let small = remote_with_bins(Origin::Migration, b"m", 1, 1, &[Bin::new("s", "a")]);
    t.ns.replace_if_better(&small).unwrap();
    let after_small = t.ns.stats().memory_data_bytes;
    assert!(after_small > 0);

    let long = "b".repeat(4096);
    let large = remote_with_bins(Origin::Migration, b"m", 2, 2, &[Bin::new("s", long.as_str())]);
    t.ns.replace_if_better(&large).unwrap();
    assert!(t.ns.stats().memory_data_bytes >= after_small + 4000);

    t.ns.drop_record(&digest(b"m")).unwrap();
    assert_eq!(t.ns.stats().memory_data_bytes, 0);
}

#[test]
fn device_namespace_keeps_no_bins_in_memory() {
    let t = TestNs::device();
    let long = "c".repeat(4096);
    t.ns.replace_if_better(&remote_with_bins(
        Origin::Migration,
        b"d",
        1,
        1,
        &[Bin::new("s", long.as_str())],
    ))
    .unwrap();
    assert_eq!(t.ns.stats().memory_data_bytes, 0);
    assert_eq!(
        t.ns.read(&digest(b"d")).unwrap().bins,
        vec![Bin::new("s", long.as_str())]
    );
}

#[test]
fn secondary_index_follows_replacements() {
    for storage in ["memory", "device"] {
        let t = TestNs::with_layout(storage, false);
        let set = t.ns.register_set(SET).unwrap();
        t.sindex.create_index(Some(set), "age");

        let v1 = remote_with_bins(Origin::Migration, b"s", 1, 1, &[Bin::new("age", 30i64)]);
        t.ns.replace_if_better(&v1).unwrap();
        assert!(t.ns.read(&v1.digest).unwrap().in_sindex);

        let v2 = remote_with_bins(Origin::Migration, b"s", 2, 2, &[Bin::new("age", 31i64)]);
        t.ns.replace_if_better(&v2).unwrap();
        assert!(t
            .sindex
            .lookup(Some(set), "age", &strata_replica::IndexKey::Integer(30))
            .is_empty());
        assert_eq!(
            t.sindex
                .lookup(Some(set), "age", &strata_replica::IndexKey::Integer(31)),
            vec![v1.digest]
        );

        let v3 = remote_with_bins(Origin::Migration, b"s", 3, 3, &[Bin::new("name", "x")]);
        t.ns.replace_if_better(&v3).unwrap();
        assert!(!t.ns.read(&v1.digest).unwrap().in_sindex);
        assert_eq!(t.sindex.entry_count(), 0);
    }
}

#[test]
fn drop_pending_record_is_forbidden() {
    let t = TestNs::memory();
    t.ns.replace_if_better(&remote(Origin::Migration, b"x", 1, 1))
        .unwrap();
    t.ns.mark_drop_pending(&digest(b"x")).unwrap();

    let err = t
        .ns
        .replace_if_better(&remote(Origin::Migration, b"x", 2, 2))
        .unwrap_err();
    assert_eq!(err.result_code().as_u8(), 22);
    assert_eq!(t.generation(b"x"), Some(Generation::new(1)));
    t.assert_handles_closed();
}
