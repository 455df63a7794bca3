//! # Queue and Contention Tests

use proptest::prelude::*;
use rstest::rstest;
use sniper_timing::common::SubsecondTime;
use sniper_timing::core::units::contention::ContentionModel;
use sniper_timing::core::units::queue::CircularQueue;

proptest! {
    /// The ring behaves like a bounded FIFO.
    #[test]
    fn prop_queue_matches_vecdeque(ops in prop::collection::vec(any::<Option<u16>>(), 0..200)) {
        let mut queue = CircularQueue::new(8);
        let mut reference = std::collections::VecDeque::new();

        for op in ops {
            match op {
                Some(value) if !queue.is_full() => {
                    let _ = queue.push(value);
                    reference.push_back(value);
                }
                Some(_) => prop_assert_eq!(reference.len(), 8),
                None => prop_assert_eq!(queue.pop(), reference.pop_front()),
            }
            prop_assert_eq!(queue.len(), reference.len());
            prop_assert_eq!(queue.front(), reference.front());
            prop_assert!(queue.iter().eq(reference.iter()));
        }
    }

    /// A request never completes before `start + delay`.
    #[test]
    fn prop_contention_never_shortens_latency(
        requests in prop::collection::vec((0u64..100, 1u64..20), 1..50),
        units in 1usize..4,
    ) {
        let mut model = ContentionModel::new(units);
        for (start, delay) in requests {
            let start = SubsecondTime::from_ns(start);
            let delay = SubsecondTime::from_ns(delay);
            prop_assert!(model.completion_time(start, delay) >= start + delay);
        }
    }
}

#[rstest]
#[case(1, 3, 30)]
#[case(2, 3, 20)]
#[case(3, 3, 10)]
fn test_simultaneous_requests_serialise_over_units(
    #[case] units: usize,
    #[case] requests: u64,
    #[case] last_done_ns: u64,
) {
    let mut model = ContentionModel::new(units);
    let mut last = SubsecondTime::ZERO;
    for _ in 0..requests {
        last = model.completion_time(SubsecondTime::ZERO, SubsecondTime::from_ns(10));
    }
    assert_eq!(last, SubsecondTime::from_ns(last_done_ns));
}

#[test]
fn test_free_slot_tracks_occupancy() {
    let mut model = ContentionModel::new(1);
    assert!(model.has_free_slot(SubsecondTime::ZERO));
    let _ = model.completion_time(SubsecondTime::ZERO, SubsecondTime::from_ns(5));
    assert!(!model.has_free_slot(SubsecondTime::from_ns(2)));
    assert!(model.has_free_slot(SubsecondTime::from_ns(5)));
}
