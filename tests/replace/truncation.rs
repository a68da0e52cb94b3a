//! Creations older than a truncation horizon are dropped silently.

use crate::common::*;

#[test]
fn namespace_truncation_skips_old_creates() {
    for (storage, single_bin) in LAYOUTS {
        let t = TestNs::with_layout(storage, single_bin);
        t.ns.truncate(None, 1000);

        let rr = remote(Origin::Migration, b"old", 1, 999);
        assert_eq!(t.ns.replace_if_better(&rr), Ok(ReplaceStatus::Truncated));
        assert!(!t.ns.index().contains(&rr.digest));
        assert_eq!(t.device.record_count(), 0);
        assert_eq!(t.ns.stats().objects, 0);
        assert_eq!(t.ns.stats().replace_truncated, 1);
        t.assert_handles_closed();

        assert_eq!(
            t.ns.replace_if_better(&remote(Origin::Migration, b"old", 1, 1000)),
            Ok(ReplaceStatus::Applied { created: true })
        );
    }
}

#[test]
fn set_truncation_only_affects_that_set() {
    let t = TestNs::memory();
    t.ns.truncate(Some(SET), 500);

    assert_eq!(
        t.ns.replace_if_better(&remote(Origin::Migration, b"a", 1, 100)),
        Ok(ReplaceStatus::Truncated)
    );

    let other = RemoteRecord::builder(Digest::compute("other", b"a"), Origin::Migration)
        .generation(1)
        .last_update_time(100)
        .set_name("other")
        .build();
    assert_eq!(
        t.ns.replace_if_better(&other),
        Ok(ReplaceStatus::Applied { created: true })
    );
}

#[test]
fn truncation_does_not_apply_to_existing_records() {
    let t = TestNs::memory();
    t.ns.replace_if_better(&remote(Origin::Migration, b"e", 1, 10))
        .unwrap();
    t.ns.truncate(None, 1000);

    assert_eq!(
        t.ns.replace_if_better(&remote(Origin::Migration, b"e", 2, 20)),
        Ok(ReplaceStatus::Applied { created: false })
    );
}

#[test]
fn horizon_only_moves_forward() {
    let t = TestNs::memory();
    t.ns.truncate(None, 1000);
    t.ns.truncate(None, 10);
    assert_eq!(t.ns.truncation().horizon(None), 1000);
    assert_eq!(t.ns.truncation().horizon(Some(SET)), 1000);
}

#[test]
fn truncated_replica_write_is_not_notified() {
    let t = TestNs::memory();
    t.ns.truncate(None, 50);
    assert_eq!(
        t.ns.replace_if_better(&remote(Origin::Replication, b"r", 1, 1)),
        Ok(ReplaceStatus::Truncated)
    );
    assert!(t.xdr.is_empty());
}
