//! End-to-end replace scenarios.

use crate::common::*;

#[test]
fn tie_under_generation_policy_keeps_local() {
    let t = TestNs::memory();
    t.ns.replace_if_better(&remote(Origin::Migration, b"a", 5, 100))
        .unwrap();

    let result = t
        .ns
        .replace_if_better(&remote(Origin::Migration, b"a", 5, 100));
    assert_eq!(result, Err(Error::RecordExists));
    assert_eq!(result.unwrap_err().result_code().as_u8(), 5);
    assert_eq!(t.generation(b"a"), Some(Generation::new(5)));
    t.assert_handles_closed();
}

#[test]
fn creation_stores_all_bins_in_every_layout() {
    for (storage, single_bin) in LAYOUTS {
        let t = TestNs::with_layout(storage, single_bin);
        let bins = if single_bin {
            vec![Bin::new("v", 7i64)]
        } else {
            vec![Bin::new("a", 1i64), Bin::new("b", "two")]
        };
        let rr = remote_with_bins(Origin::Migration, b"new", 1, 10, &bins);

        assert_eq!(
            t.ns.replace_if_better(&rr),
            Ok(ReplaceStatus::Applied { created: true }),
            "{} single_bin={}",
            storage,
            single_bin
        );

        let view = t.ns.read(&rr.digest).unwrap();
        assert_eq!(view.generation, Generation::new(1));
        assert_eq!(view.bins, bins);
        assert_eq!(view.set_name.as_deref(), Some(SET));
        assert_eq!(t.ns.stats().objects, 1);
        t.assert_handles_closed();
    }
}

#[test]
fn device_write_failure_leaves_local_record() {
    let t = TestNs::with_layout("device", true);
    t.ns.replace_if_better(&remote(Origin::Migration, b"c", 3, 50))
        .unwrap();

    t.device.fail_next_write(StorageError::DeviceOverload);
    let result = t
        .ns
        .replace_if_better(&remote(Origin::Migration, b"c", 4, 60));

    assert_eq!(result, Err(Error::Storage(StorageError::DeviceOverload)));
    let view = t.ns.read(&digest(b"c")).unwrap();
    assert_eq!(view.generation, Generation::new(3));
    assert_eq!(view.last_update_time, 50);
    assert_eq!(view.bins, vec![Bin::new("v", 3i64)]);
    assert_eq!(t.ns.stats().replace_failed, 1);
    t.assert_handles_closed();
}

#[test]
fn replica_loss_notifies_local_state() {
    let t = TestNs::memory();
    t.ns.replace_if_better(&remote(Origin::Migration, b"d", 2, 500))
        .unwrap();
    assert!(t.xdr.is_empty());

    let result = t
        .ns
        .replace_if_better(&remote(Origin::Replication, b"d", 9, 400));
    assert_eq!(result, Err(Error::RecordExists));

    let entries = t.xdr.drain();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].digest, digest(b"d"));
    assert_eq!(entries[0].generation, Generation::new(2));
    assert_eq!(entries[0].last_update_time, 500);
    assert_eq!(entries[0].prev_last_update_time, 500);
    t.assert_handles_closed();
}

#[test]
fn remote_win_overwrites() {
    for (storage, single_bin) in LAYOUTS {
        let t = TestNs::with_layout(storage, single_bin);
        t.ns.replace_if_better(&remote(Origin::Migration, b"w", 1, 10))
            .unwrap();
        assert_eq!(
            t.ns.replace_if_better(&remote(Origin::Migration, b"w", 2, 20)),
            Ok(ReplaceStatus::Applied { created: false })
        );
        let view = t.ns.read(&digest(b"w")).unwrap();
        assert_eq!(view.generation, Generation::new(2));
        assert_eq!(view.bins, vec![Bin::new("v", 2i64)]);
        assert_eq!(t.ns.stats().objects, 1);
    }
}

#[test]
fn last_update_time_policy_ignores_generation() {
    let t = TestNs::new(
        NamespaceConfig::for_testing()
            .with_conflict_resolution_policy(ConflictResolutionPolicy::LastUpdateTime),
    );
    t.ns.replace_if_better(&remote(Origin::Migration, b"l", 9, 100))
        .unwrap();

    assert_eq!(
        t.ns.replace_if_better(&remote(Origin::Migration, b"l", 1, 101)),
        Ok(ReplaceStatus::Applied { created: false })
    );
    assert_eq!(t.generation(b"l"), Some(Generation::new(1)));
}

#[test]
fn generation_policy_does_not_wrap() {
    let t = TestNs::memory();
    t.ns.replace_if_better(&remote(Origin::Migration, b"g", 0xFFF0, 10))
        .unwrap();

    // A wrap-aware comparison would rank 2 ahead of 0xFFF0.
    assert_eq!(
        t.ns.replace_if_better(&remote(Origin::DuplicateResolution, b"g", 2, 10)),
        Err(Error::Generation)
    );
}

#[test]
fn strong_consistency_compares_lut_then_wrapped_generation() {
    let t = TestNs::new(NamespaceConfig::for_testing().with_strong_consistency(true));
    t.ns.replace_if_better(&remote(Origin::Migration, b"s", 0xFFF0, 10))
        .unwrap();

    assert_eq!(
        t.ns.replace_if_better(&remote(Origin::Migration, b"s", 2, 10)),
        Ok(ReplaceStatus::Applied { created: false })
    );
    assert_eq!(
        t.ns.replace_if_better(&remote(Origin::Migration, b"s", 50, 9)),
        Err(Error::RecordExists)
    );
}

#[test]
fn write_buffer_follows_origin() {
    let t = TestNs::device();
    t.ns.replace_if_better(&remote(Origin::Migration, b"m", 1, 1))
        .unwrap();
    t.ns.replace_if_better(&remote(Origin::Replication, b"r", 1, 1))
        .unwrap();
    t.ns.replace_if_better(&remote(Origin::DuplicateResolution, b"x", 1, 1))
        .unwrap();

    assert_eq!(t.device.writes(WriteBuffer::Uncached), 1);
    assert_eq!(t.device.writes(WriteBuffer::Prole), 1);
    assert_eq!(t.device.writes(WriteBuffer::Master), 1);
}

#[test]
fn stored_key_is_kept_for_memory_multi_bin() {
    let t = TestNs::memory();
    let rr = RemoteRecord::builder(digest(b"key"), Origin::Migration)
        .generation(1)
        .set_name(SET)
        .key(&b"key"[..])
        .bins(&FlatCodec, &[Bin::new("a", 1i64)])
        .build();
    t.ns.replace_if_better(&rr).unwrap();

    let view = t.ns.read(&rr.digest).unwrap();
    assert!(view.key_stored);
    assert_eq!(view.key.as_deref(), Some(&b"key"[..]));
}
