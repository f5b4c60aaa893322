//! Property tests over the record merge and lock rules

use proptest::prelude::*;

use crate::{CaloTp, CaloTpBits, CaloTpData, DetectorType, Eid, TriggerRecord};

fn contribution() -> impl Strategy<Value = CaloTpBits> {
    (0u8..=1, any::<bool>(), any::<bool>()).prop_map(|(htm, lto, xt)| CaloTpBits {
        htm,
        lto,
        xt,
        spare: false,
    })
}

/// A list of contributions together with a permutation of it
fn contributions_and_permutation() -> impl Strategy<Value = (Vec<CaloTpBits>, Vec<CaloTpBits>)> {
    proptest::collection::vec(contribution(), 1..8)
        .prop_flat_map(|contributions| (Just(contributions.clone()), Just(contributions).prop_shuffle()))
}

proptest! {
    #[test]
    fn merge_is_order_independent((contributions, shuffled) in contributions_and_permutation()) {
        let eid = Eid::board(DetectorType::MainCalo, 5, 0, 4);
        let mut a = CaloTp::new(0, eid, 10).unwrap();
        let mut b = CaloTp::new(0, eid, 10).unwrap();
        for c in &contributions { a.update(c).unwrap(); }
        for c in &shuffled { b.update(c).unwrap(); }
        prop_assert_eq!(a.bits(), b.bits());
        prop_assert!(a.htm() <= 3);
    }

    #[test]
    fn locked_tp_ignores_every_update(updates in proptest::collection::vec(contribution(), 1..5)) {
        let eid = Eid::board(DetectorType::XCalo, 5, 2, 1);
        let mut data = CaloTpData::new();
        data.push(CaloTp::new(0, eid, 3).unwrap()).unwrap();
        data.finalize().unwrap();
        let before = data.records()[0].bits();
        let mut tp = data.records()[0].clone();
        for c in &updates {
            prop_assert!(tp.update(c).is_err());
        }
        prop_assert_eq!(tp.bits(), before);
        prop_assert!(tp.is_locked());
        prop_assert!(data.find_unlocked_mut(&eid, 3).is_none());
    }
}

#[test]
fn scenario_two_hits_same_bucket() {
    let eid = Eid::board(DetectorType::MainCalo, 5, 0, 4);
    let mut data = CaloTpData::new();
    data.push(CaloTp::new(0, eid, 100).unwrap()).unwrap();
    for _ in 0..2 {
        data.find_unlocked_mut(&eid, 100).unwrap().update(&CaloTpBits::high_threshold()).unwrap();
    }
    assert_eq!(data.len(), 1);
    assert_eq!(data.records()[0].htm(), 2);
    data.find_unlocked_mut(&eid, 100).unwrap().update(&CaloTpBits::high_threshold()).unwrap();
    data.find_unlocked_mut(&eid, 100).unwrap().update(&CaloTpBits::high_threshold()).unwrap();
    assert_eq!(data.records()[0].htm(), 3);
}

#[test]
fn many_hits_saturate_and_keep_every_flag() {
    let eid = Eid::board(DetectorType::MainCalo, 5, 1, 9);
    let mut tp = CaloTp::new(0, eid, 40).unwrap();
    let hits = [
        CaloTpBits::high_threshold(),
        CaloTpBits::low_threshold_only(),
        CaloTpBits { xt: true, ..CaloTpBits::high_threshold() },
        CaloTpBits::high_threshold(),
        CaloTpBits { xt: true, ..CaloTpBits::low_threshold_only() },
        CaloTpBits::high_threshold(),
    ];
    for (i, hit) in hits.iter().enumerate() {
        tp.update(hit).unwrap();
        let high_so_far = hits[..=i].iter().map(|h| h.htm).sum::<u8>();
        assert_eq!(tp.htm(), high_so_far.min(3));
    }
    assert_eq!(tp.htm(), 3);
    assert!(tp.is_lto() && tp.is_xt());
    assert!(!tp.bits().spare);
}
