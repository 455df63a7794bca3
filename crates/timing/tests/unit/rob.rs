//! # ROB Timer Tests
//!
//! Drives `RobSmtTimer` directly, without the barrier, and checks timing
//! against the commit log and the CPI stack.

use pretty_assertions::{assert_eq, assert_ne};
use rstest::rstest;
use sniper_timing::common::SubsecondTime;
use sniper_timing::core::timer::SmtEngine;
use sniper_timing::core::timer::rob::RobThreadContext;
use sniper_timing::core::units::memory::{FixedLatencyMemory, MemoryResult};
use sniper_timing::stats::{CommitRecord, CpiComponent};
use sniper_timing::uop::instruction::BranchOutcome;
use sniper_timing::uop::{DynamicMicroOp, HitWhere, MicroOp};

use crate::common::builder::{dependent_chain, independent, load, small_core, store};
use crate::common::harness::{RobHarness, l1_memory};
use crate::common::mocks::MockMemory;

fn cycle(time: SubsecondTime) -> u64 {
    // Every test core runs at 1 GHz.
    time.divide_rounded(SubsecondTime::from_ns(1))
}

#[test]
fn test_dependent_chain_issues_one_per_cycle() {
    let mut harness = RobHarness::new(&small_core());
    harness.push(0, dependent_chain(10));
    harness.run_to_completion();

    let cycles = harness.cycles();
    assert!((10..=14).contains(&cycles), "chain took {cycles} cycles");

    let log = harness.commit_log(0);
    assert_eq!(log.len(), 10);
    for pair in log.windows(2) {
        assert!(
            pair[1].issued >= pair[0].done,
            "seq {} issued before its producer finished",
            pair[1].sequence_number
        );
    }
}

#[test]
fn test_independent_uops_commit_at_full_width() {
    let mut harness = RobHarness::new(&small_core());
    harness.push(0, independent(10));
    harness.run_to_completion();

    let log = harness.commit_log(0);
    assert_eq!(log.len(), 10);

    let mut commit_cycles: Vec<u64> = log.iter().map(|r| cycle(r.committed)).collect();
    commit_cycles.dedup();
    assert_eq!(commit_cycles.len(), 3, "commit cycles {commit_cycles:?}");
    assert!(commit_cycles.iter().all(|&c| c <= 5));

    for c in &commit_cycles {
        let per_cycle = log.iter().filter(|r| cycle(r.committed) == *c).count();
        assert!(per_cycle <= 4);
    }
}

#[test]
fn test_commit_follows_program_order() {
    let mut uops = Vec::new();
    uops.push(load(0x10, 0x8000, 1));
    uops.extend(independent(6));
    uops.push(store(0x40, 0x8040, 1));
    uops.extend(dependent_chain(4));

    let mut harness = RobHarness::new(&small_core());
    harness.push(0, uops);
    harness.run_to_completion();

    let log = harness.commit_log(0);
    assert_eq!(log.len(), 12);
    for pair in log.windows(2) {
        assert!(pair[0].sequence_number < pair[1].sequence_number);
        assert!(pair[0].committed <= pair[1].committed);
    }
    for record in log {
        assert!(record.dispatched <= record.issued);
        assert!(record.issued <= record.done);
        assert!(record.done <= record.committed);
    }
}

#[test]
fn test_cpi_stack_accounts_for_every_cycle() {
    let mut uops = dependent_chain(20);
    uops.push(load(0x10, 0x8000, 3));
    uops.extend(independent(40));

    let mut harness = RobHarness::new(&small_core());
    harness.push(0, uops);
    harness.run_to_completion();

    let report = harness.timer.report();
    assert_eq!(report.threads[0].stats.cpi.total(), harness.timer.now());
    assert_eq!(report.threads[0].instructions, 61);
}

/// Ten-cycle producer of r2, a store of r2 and a load of the same address.
fn forwarding_log(store_to_load_forwarding: bool) -> Vec<CommitRecord> {
    let mut config = small_core();
    config.rob_timer.store_to_load_forwarding = store_to_load_forwarding;
    let mut harness = RobHarness::new(&config);
    harness.push(
        0,
        vec![
            DynamicMicroOp::new(MicroOp::execute(0x0c, 10).with_destinations(&[2])),
            store(0x10, 0x9000, 2),
            load(0x14, 0x9000, 3),
        ],
    );
    harness.run_to_completion();
    harness.commit_log(0).to_vec()
}

#[test]
fn test_forwarded_load_waits_for_the_store_data_only() {
    let log = forwarding_log(true);
    assert_eq!(log.len(), 3);
    assert!(log[2].issued >= log[0].done, "load issued before the store data");
    assert!(log[2].issued < log[1].done, "load waited for the store itself");
}

#[test]
fn test_unforwarded_load_waits_for_the_store() {
    let log = forwarding_log(false);
    assert_eq!(log.len(), 3);
    assert!(log[2].issued >= log[1].done);
}

#[test]
fn test_mispredicted_branch_flushes_and_refetches() {
    let penalty = small_core().branch_predictor.mispredict_penalty;
    let branch = DynamicMicroOp::new(MicroOp::branch(0x3000))
        .with_branch(BranchOutcome {
            taken: true,
            target: 0x4000,
        })
        .mispredicted();

    let mut uops = independent(4);
    uops.push(branch);
    uops.extend(independent(8));

    let mut harness = RobHarness::new(&small_core());
    harness.push(0, uops);
    harness.run_to_completion();

    let report = harness.timer.report();
    let stats = &report.threads[0].stats;
    assert_eq!(stats.branch_predictions, 1);
    assert_eq!(stats.branch_mispredictions, 1);
    assert!(cycle(stats.cpi.get(CpiComponent::BranchPredictor)) >= penalty - 1);

    let log = harness.commit_log(0);
    assert_eq!(log.len(), 13);
    let branch_commit = log[4].committed;
    for record in &log[5..] {
        assert!(cycle(record.dispatched) >= cycle(branch_commit) + penalty);
        assert!(record.sequence_number >= 13, "refetched uops get fresh numbers");
    }
}

#[test]
fn test_data_cache_miss_is_charged_to_its_level() {
    let mut memory = MockMemory::new();
    memory.expect_read_instruction().returning(|_, _| MemoryResult {
        latency: SubsecondTime::ZERO,
        hit_where: HitWhere::L1I,
    });
    memory
        .expect_access()
        .times(1)
        .returning(|_| MemoryResult {
            latency: SubsecondTime::from_ns(100),
            hit_where: HitWhere::DramLocal,
        });

    let mut harness =
        RobHarness::with_contexts(&small_core(), vec![RobThreadContext::new(Box::new(memory))]);
    harness.push(0, vec![load(0x10, 0x8000, 1)]);
    harness.run_to_completion();

    let report = harness.timer.report();
    let cpi = &report.threads[0].stats.cpi;
    assert!(cycle(cpi.get(CpiComponent::DataCache(HitWhere::DramLocal))) >= 90);
    assert_eq!(report.threads[0].stats.loads_count, 1);
    assert!(harness.cycles() >= 100);
}

#[test]
fn test_instruction_cache_miss_stalls_the_front_end() {
    let memory = FixedLatencyMemory::new(SubsecondTime::from_ns(1), HitWhere::L1Own)
        .with_instruction(SubsecondTime::from_ns(20), HitWhere::L2Own);

    let mut harness =
        RobHarness::with_contexts(&small_core(), vec![RobThreadContext::new(Box::new(memory))]);
    harness.push(0, independent(4));
    harness.run_to_completion();

    let report = harness.timer.report();
    let icache = report.threads[0]
        .stats
        .cpi
        .get(CpiComponent::InstructionCache(HitWhere::L2Own));
    assert!(cycle(icache) >= 10, "icache stall of {icache}");
    assert_eq!(harness.commit_log(0).len(), 4);
}

#[test]
fn test_two_threads_share_dispatch() {
    let contexts = vec![
        RobThreadContext::new(l1_memory(1)),
        RobThreadContext::new(l1_memory(1)),
    ];
    let mut harness = RobHarness::with_contexts(&small_core(), contexts);
    assert_eq!(harness.timer.current_window_size(), 16);

    harness.push(0, independent(20));
    harness.push(1, dependent_chain(20));
    harness.run_to_completion();

    assert_eq!(harness.commit_log(0).len(), 20);
    assert_eq!(harness.commit_log(1).len(), 20);

    let report = harness.timer.report();
    let smt: u64 = report
        .threads
        .iter()
        .map(|t| cycle(t.stats.cpi.get(CpiComponent::Smt)))
        .sum();
    assert!(smt > 0);
    for thread in &report.threads {
        assert_eq!(thread.stats.cpi.total(), harness.timer.now());
    }
}

#[test]
fn test_long_latency_loads_throttle_dispatch() {
    let mut config = small_core();
    config.core.window_size = 128;
    config.rob_timer.outstanding_loads = 64;
    let uops: Vec<DynamicMicroOp> = (0..40)
        .map(|i| {
            load(0x10 + 4 * i, 0x10_000 + 64 * i, (i % 16) as u32 + 2)
                .with_dcache(HitWhere::DramLocal, 100)
        })
        .collect();

    let mut harness = RobHarness::new(&config);
    harness.push(0, uops);
    harness.run_to_completion();

    let log = harness.commit_log(0);
    assert_eq!(log.len(), 40);
    assert!(log[..32].iter().all(|r| cycle(r.dispatched) < 10));
    // The tail waits until the first loads return.
    assert!(cycle(log[39].dispatched) >= 100, "dispatched at {}", log[39].dispatched);

    let report = harness.timer.report();
    assert!(cycle(report.threads[0].stats.cpi.get(CpiComponent::DataCache(HitWhere::DramLocal))) > 0);
}

#[test]
fn test_full_reservation_stations_stall_dispatch() {
    let mut config = small_core();
    config.rob_timer.rs_entries = 2;
    let mut uops = vec![DynamicMicroOp::new(
        MicroOp::execute(0x100, 20).with_destinations(&[1]),
    )];
    for i in 0..6 {
        uops.push(DynamicMicroOp::new(
            MicroOp::execute(0x104 + 4 * i, 1)
                .with_sources(&[1])
                .with_destinations(&[i as u32 + 2]),
        ));
    }

    let mut harness = RobHarness::new(&config);
    harness.push(0, uops);
    harness.run_to_completion();

    let log = harness.commit_log(0);
    assert_eq!(log.len(), 7);
    // Two consumers hold both stations until the producer finishes.
    assert!(cycle(log[3].dispatched) >= 20);
    assert_eq!(harness.timer.rs_entries_used(), 0);

    let report = harness.timer.report();
    let stats = &report.threads[0].stats;
    assert!(cycle(stats.cpi.get(CpiComponent::RsFull)) >= 10);
    assert_eq!(stats.cpi.total(), harness.timer.now());
}

/// A 20-cycle producer, its consumer and an independent micro-op.
fn blocked_consumer_log(in_order: bool) -> Vec<CommitRecord> {
    let mut config = small_core();
    config.rob_timer.in_order = in_order;
    let mut harness = RobHarness::new(&config);
    harness.push(
        0,
        vec![
            DynamicMicroOp::new(MicroOp::execute(0x100, 20).with_destinations(&[1])),
            DynamicMicroOp::new(MicroOp::execute(0x104, 1).with_sources(&[1]).with_destinations(&[2])),
            DynamicMicroOp::new(MicroOp::execute(0x108, 1).with_destinations(&[3])),
        ],
    );
    harness.run_to_completion();
    harness.commit_log(0).to_vec()
}

#[test]
fn test_in_order_issue_blocks_behind_a_waiting_uop() {
    let log = blocked_consumer_log(false);
    assert!(log[2].issued < log[1].issued, "independent uop should overtake");

    let log = blocked_consumer_log(true);
    assert!(log[2].issued >= log[1].issued);
    assert!(cycle(log[2].issued) >= 20);
}

#[rstest]
#[case(true, 0, 5)]
#[case(false, 20, 30)]
fn test_load_behind_unresolved_store_address(
    #[case] address_disambiguation: bool,
    #[case] min_cycle: u64,
    #[case] max_cycle: u64,
) {
    let mut config = small_core();
    config.rob_timer.address_disambiguation = address_disambiguation;
    // The store's address and data both come from a 20-cycle producer.
    let address_store = DynamicMicroOp::new(
        MicroOp::store(0x104, 8)
            .with_sources(&[5])
            .with_address_registers(&[5]),
    )
    .with_address(0x100);

    let mut harness = RobHarness::new(&config);
    harness.push(
        0,
        vec![
            DynamicMicroOp::new(MicroOp::execute(0x100, 20).with_destinations(&[5])),
            address_store,
            load(0x108, 0x200, 3),
        ],
    );
    harness.run_to_completion();

    let log = harness.commit_log(0);
    let issued = cycle(log[2].issued);
    assert!(
        (min_cycle..max_cycle).contains(&issued),
        "load issued at cycle {issued}"
    );
}

/// Two threads whose consumers all become ready in cycle 11.
fn sibling_issue_cycles(simultaneous_issue: bool) -> (u64, u64) {
    let mut config = small_core();
    config.rob_timer.simultaneous_issue = simultaneous_issue;
    let contexts = vec![
        RobThreadContext::new(l1_memory(1)),
        RobThreadContext::new(l1_memory(1)),
    ];
    let mut harness = RobHarness::with_contexts(&config, contexts);

    // Thread 1 dispatches one cycle after thread 0, so its producer is shorter.
    for (thread, latency) in [(0, 10), (1, 9)] {
        let mut uops = vec![DynamicMicroOp::new(
            MicroOp::execute(0x100, latency).with_destinations(&[1]),
        )];
        for i in 0..3 {
            uops.push(DynamicMicroOp::new(
                MicroOp::execute(0x104 + 4 * i, 1)
                    .with_sources(&[1])
                    .with_destinations(&[i as u32 + 2]),
            ));
        }
        harness.push(thread, uops);
    }
    harness.run_to_completion();

    (
        cycle(harness.commit_log(0)[1].issued),
        cycle(harness.commit_log(1)[1].issued),
    )
}

#[test]
fn test_simultaneous_issue_lets_both_threads_issue_per_cycle() {
    let (first, second) = sibling_issue_cycles(true);
    assert_eq!(first, second);

    let (first, second) = sibling_issue_cycles(false);
    assert_ne!(first, second);
}

#[rstest]
#[case(true, 32)]
#[case(false, 16)]
fn test_window_is_repartitioned_when_a_sibling_stops(
    #[case] rob_repartition: bool,
    #[case] expected: usize,
) {
    let mut config = small_core();
    config.core.smt_threads = 2;
    config.rob_timer.rob_repartition = rob_repartition;
    let contexts = vec![
        RobThreadContext::new(l1_memory(1)),
        RobThreadContext::new(l1_memory(1)),
    ];
    let mut harness = RobHarness::with_contexts(&config, contexts);
    assert_eq!(harness.timer.current_window_size(), 16);

    harness.threads[1].running = false;
    harness.timer.notify_num_active_threads_change(&harness.threads);
    assert_eq!(harness.timer.current_window_size(), expected);
}

#[rstest]
#[case(false)]
#[case(true)]
fn test_fences_wait_for_outstanding_stores(#[case] mem_barrier: bool) {
    let fence = MicroOp::execute(0x104, 1);
    let fence = if mem_barrier {
        fence.mem_barrier()
    } else {
        fence.serializing()
    };

    let mut harness = RobHarness::new(&small_core());
    harness.push(
        0,
        vec![
            store(0x100, 0x8000, 2).with_dcache(HitWhere::L2Own, 20),
            DynamicMicroOp::new(fence),
            load(0x108, 0x9000, 3),
        ],
    );
    harness.run_to_completion();

    let log = harness.commit_log(0);
    assert_eq!(log.len(), 3);
    // The store leaves the window at once but its data drains for 21 cycles.
    assert!(cycle(log[0].done) <= 3);
    assert!(cycle(log[1].issued) >= 22, "fence issued at {}", log[1].issued);
    assert!(log[2].issued >= log[1].issued);

    let report = harness.timer.report();
    if mem_barrier {
        assert_eq!(report.mfences, 1);
    } else {
        assert_eq!(report.serializations, 1);
    }
}
