//! Property tests: the surviving copy is the best one offered.

use crate::common::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generation_policy_keeps_highest_generation(
        gens in prop::collection::vec(1u16..1000, 1..40)
    ) {
        let t = TestNs::device();
        for &gen in &gens {
            let _ = t.ns.replace_if_better(&remote(Origin::Migration, b"p", gen, 1));
        }
        let top = gens.iter().copied().max().unwrap();
        prop_assert_eq!(t.generation(b"p"), Some(Generation::new(top)));
        prop_assert_eq!(t.device.open_handles(), 0);
    }

    #[test]
    fn replica_writes_keep_latest_update(
        luts in prop::collection::vec(1u64..1_000_000, 1..40)
    ) {
        let t = TestNs::memory();
        for (i, &lut) in luts.iter().enumerate() {
            let _ = t.ns.replace_if_better(&remote(Origin::Replication, b"p", i as u16 + 1, lut));
        }
        let latest = luts.iter().copied().max().unwrap();
        prop_assert_eq!(t.ns.read(&digest(b"p")).unwrap().last_update_time, latest);
        prop_assert_eq!(t.xdr.len(), luts.len());
    }
}
