//! # Dependency Table Tests
//!
//! Register producers against a reference model, and store/barrier producers.

use proptest::prelude::*;
use sniper_timing::common::INVALID_SEQNR;
use sniper_timing::core::units::deps::{MemoryDependencies, RegisterDependencies};
use sniper_timing::uop::{DynamicMicroOp, MicroOp, RegId};

fn numbered(uop: MicroOp, seq: u64) -> DynamicMicroOp {
    let mut uop = DynamicMicroOp::new(uop);
    uop.set_sequence_number(seq);
    uop
}

fn exec(seq: u64, src: &[RegId], dst: &[RegId]) -> DynamicMicroOp {
    numbered(
        MicroOp::execute(0x100 + seq, 1)
            .with_sources(src)
            .with_destinations(dst),
        seq,
    )
}

proptest! {
    /// Every source depends on its most recent in-flight writer, never on
    /// the micro-op itself.
    #[test]
    fn prop_register_dependencies_follow_last_writer(
        ops in prop::collection::vec(
            (prop::collection::vec(0u32..6, 0..3), prop::collection::vec(0u32..6, 0..2)),
            1..60,
        ),
        window in 1u64..20,
    ) {
        let mut table = RegisterDependencies::new();
        let mut last_writer = [INVALID_SEQNR; 6];

        for (seq, (src, dst)) in ops.iter().enumerate() {
            let seq = seq as u64;
            let lowest = seq.saturating_sub(window);
            let mut uop = exec(seq, src, dst);
            table.set_dependencies(&mut uop, lowest);

            let mut expected: Vec<u64> = Vec::new();
            for &reg in src {
                let writer = last_writer[reg as usize];
                if writer != INVALID_SEQNR && writer >= lowest && !expected.contains(&writer) {
                    expected.push(writer);
                }
            }
            prop_assert_eq!(uop.dependencies(), expected.as_slice());
            prop_assert!(!uop.dependencies().contains(&seq));

            for &reg in dst {
                last_writer[reg as usize] = seq;
            }
        }
    }
}

#[test]
fn test_peek_ignores_retired_producers() {
    let mut table = RegisterDependencies::new();
    let mut producer = exec(4, &[], &[9]);
    table.set_dependencies(&mut producer, 0);
    assert_eq!(table.peek_producer(9, 4), 4);
    assert_eq!(table.peek_producer(9, 5), INVALID_SEQNR);
}

#[test]
fn test_load_depends_on_youngest_store_to_same_address() {
    let mut table = MemoryDependencies::new(16);
    let mut s0 = numbered(MicroOp::store(0x10, 8), 0).with_address(0x40);
    let mut s1 = numbered(MicroOp::store(0x14, 8), 1).with_address(0x80);
    let mut s2 = numbered(MicroOp::store(0x18, 8), 2).with_address(0x40);
    table.set_dependencies(&mut s0, 0);
    table.set_dependencies(&mut s1, 0);
    table.set_dependencies(&mut s2, 0);
    assert_eq!(table.len(), 3);

    let mut hit = numbered(MicroOp::load(0x1c, 8), 3).with_address(0x40);
    table.set_dependencies(&mut hit, 0);
    assert_eq!(hit.dependencies(), &[2]);

    let mut miss = numbered(MicroOp::load(0x20, 8), 4).with_address(0xc0);
    table.set_dependencies(&mut miss, 0);
    assert!(miss.dependencies().is_empty());
}

#[test]
fn test_retired_stores_are_dropped() {
    let mut table = MemoryDependencies::new(16);
    let mut store = numbered(MicroOp::store(0x10, 8), 0).with_address(0x40);
    table.set_dependencies(&mut store, 0);

    let mut load = numbered(MicroOp::load(0x14, 8), 5).with_address(0x40);
    table.set_dependencies(&mut load, 1);
    assert!(load.dependencies().is_empty());
    assert!(table.is_empty());
}

#[test]
fn test_memory_operations_wait_for_the_barrier() {
    let mut table = MemoryDependencies::new(16);
    let mut fence = numbered(MicroOp::execute(0x10, 1).mem_barrier(), 2);
    table.set_dependencies(&mut fence, 0);
    assert_eq!(table.membar(), 2);

    let mut load = numbered(MicroOp::load(0x14, 8), 3).with_address(0x40);
    table.set_dependencies(&mut load, 0);
    assert_eq!(load.dependencies(), &[2]);

    let mut store = numbered(MicroOp::store(0x18, 8), 4).with_address(0x40);
    table.set_dependencies(&mut store, 0);
    assert_eq!(store.dependencies(), &[2]);

    let mut fence2 = numbered(MicroOp::execute(0x1c, 1).mem_barrier(), 5);
    table.set_dependencies(&mut fence2, 0);
    assert_eq!(fence2.dependencies(), &[2]);
    assert_eq!(table.membar(), 5);

    table.clear();
    assert_eq!(table.membar(), INVALID_SEQNR);
}
