//! Concurrent replaces of the same and of different records.

use crate::common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

#[test]
fn same_digest_converges_to_highest_generation() {
    for (storage, single_bin) in LAYOUTS {
        let t = Arc::new(TestNs::with_layout(storage, single_bin));
        let barrier = Arc::new(Barrier::new(THREADS));
        let applied = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let t = Arc::clone(&t);
                let barrier = Arc::clone(&barrier);
                let applied = Arc::clone(&applied);
                thread::spawn(move || {
                    barrier.wait();
                    for round in 0..50u16 {
                        let gen = round * THREADS as u16 + i as u16 + 1;
                        match t
                            .ns
                            .replace_if_better(&remote(Origin::Migration, b"hot", gen, 1))
                        {
                            Ok(_) => {
                                applied.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(Error::RecordExists) => {}
                            Err(e) => panic!("unexpected error: {:?}", e),
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let top = 50 * THREADS as u16;
        let view = t.ns.read(&digest(b"hot")).unwrap();
        assert_eq!(view.generation, Generation::new(top));
        assert_eq!(view.bins, vec![Bin::new("v", i64::from(top))]);

        let stats = t.ns.stats();
        assert_eq!(stats.objects, 1);
        assert_eq!(stats.replace_applied as usize, applied.load(Ordering::Relaxed));
        assert_eq!(
            stats.replace_applied + stats.replace_rejected,
            (50 * THREADS) as u64
        );
        assert_eq!(t.ns.index().ref_count(&digest(b"hot")), Some(0));
        t.assert_handles_closed();
    }
}

#[test]
fn racing_creates_make_one_record() {
    let t = Arc::new(TestNs::device());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let t = Arc::clone(&t);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                t.ns.replace_if_better(&remote(Origin::Migration, b"once", 1, 1))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results
        .iter()
        .filter(|r| **r == Ok(ReplaceStatus::Applied { created: true }))
        .count();
    assert_eq!(created, 1);
    assert!(results
        .iter()
        .all(|r| r.is_ok() || *r == Err(Error::RecordExists)));
    assert_eq!(t.ns.index().live_records(), 1);
    assert_eq!(t.ns.stats().objects, 1);
    let set = t.ns.sets().get(SET).unwrap();
    assert_eq!(t.ns.sets().objects(set), 1);
}

#[test]
fn distinct_digests_in_parallel() {
    let t = Arc::new(TestNs::memory());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let t = Arc::clone(&t);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for n in 0..100u32 {
                    let key = format!("{}-{}", i, n);
                    t.ns.replace_if_better(&remote(Origin::Replication, key.as_bytes(), 1, 1))
                        .unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(t.ns.index().live_records(), THREADS * 100);
    assert_eq!(t.xdr.len(), THREADS * 100);
    assert_eq!(t.ns.stats().non_expirable_objects, (THREADS * 100) as i64);
}

#[test]
fn drop_races_with_replace() {
    let t = Arc::new(TestNs::memory());
    t.ns.replace_if_better(&remote(Origin::Migration, b"d", 1, 1))
        .unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let t = Arc::clone(&t);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for gen in 2..200u16 {
                let _ = t
                    .ns
                    .replace_if_better(&remote(Origin::Migration, b"d", gen, 1));
            }
        })
    };
    let dropper = {
        let t = Arc::clone(&t);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..200 {
                let _ = t.ns.drop_record(&digest(b"d"));
            }
        })
    };
    writer.join().unwrap();
    dropper.join().unwrap();

    let live = t.ns.index().live_records();
    assert!(live <= 1);
    assert_eq!(t.ns.stats().objects, live as u64);
    assert_eq!(
        t.ns.index().free_slots(),
        t.ns.index().capacity() - live
    );
    t.assert_handles_closed();
}
