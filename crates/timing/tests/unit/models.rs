//! # Performance Model Tests
//!
//! Every model through the `PerformanceModel` front, plus the shared ROB
//! timer registry.

use std::thread;

use rstest::rstest;
use sniper_timing::PerformanceModel;
use sniper_timing::common::SubsecondTime;
use sniper_timing::config::{Config, TimingModel};
use sniper_timing::core::model::RobTimerRegistry;
use sniper_timing::uop::HitWhere;
use sniper_timing::uop::instruction::{
    DynamicInstruction, DynamicInstructionInfo, Instruction, InstructionType, Operand,
};

use crate::common::harness::{init_tracing, l1_memory};

fn config(model: TimingModel) -> Config {
    let mut config = Config::default();
    config.core.frequency_ghz = 1.0;
    config.core.model = model;
    config
}

fn create(config: &Config, core: usize, registry: &mut RobTimerRegistry) -> PerformanceModel {
    init_tracing();
    PerformanceModel::create(config, core, Some(core as u64), l1_memory(1), registry, None)
}

fn add_chain(ip: u64) -> DynamicInstruction {
    DynamicInstruction::new(Instruction::new(
        InstructionType::Add,
        ip,
        vec![Operand::reg_read(1), Operand::reg_write(1)],
    ))
}

fn load(ip: u64, address: u64, dst: u32) -> DynamicInstruction {
    DynamicInstruction::new(Instruction::new(
        InstructionType::Generic,
        ip,
        vec![Operand::mem_read(), Operand::reg_write(dst)],
    ))
    .with_addresses(&[address])
}

fn store(ip: u64, address: u64, src: u32) -> DynamicInstruction {
    DynamicInstruction::new(Instruction::new(
        InstructionType::Generic,
        ip,
        vec![Operand::reg_read(src), Operand::mem_write()],
    ))
    .with_addresses(&[address])
}

fn read_info(ip: u64, address: u64, ns: u64, hit_where: HitWhere) -> DynamicInstructionInfo {
    DynamicInstructionInfo::memory_read(ip, address, SubsecondTime::from_ns(ns), hit_where)
}

#[rstest]
#[case(TimingModel::Simple, 10)]
#[case(TimingModel::Magic, 10)]
#[case(TimingModel::Iocoom, 10)]
fn test_add_chain_costs_one_cycle_each(#[case] model: TimingModel, #[case] cycles: u64) {
    let config = config(model);
    let mut registry = RobTimerRegistry::new();
    let mut perf = create(&config, 0, &mut registry);

    for i in 0..10 {
        assert_eq!(perf.handle_instruction(&add_chain(0x100 + 4 * i)), Ok(true));
    }
    assert_eq!(perf.instruction_count(), 10);
    assert_eq!(perf.cycle_count(), cycles);
    assert!(registry.is_empty());
}

#[rstest]
#[case(TimingModel::Simple)]
#[case(TimingModel::Magic)]
#[case(TimingModel::Iocoom)]
fn test_missing_memory_info_is_retried(#[case] model: TimingModel) {
    let config = config(model);
    let mut registry = RobTimerRegistry::new();
    let mut perf = create(&config, 0, &mut registry);
    let insn = load(0x40, 0x1000, 2);

    assert_eq!(perf.handle_instruction(&insn), Ok(false));
    assert_eq!(perf.handle_instruction(&insn), Ok(false));
    assert_eq!(perf.instruction_count(), 0);
    assert_eq!(perf.elapsed_time(), SubsecondTime::ZERO);

    perf.push_dynamic_info(read_info(0x40, 0x1000, 20, HitWhere::L2Own));
    assert_eq!(perf.handle_instruction(&insn), Ok(true));
    assert_eq!(perf.instruction_count(), 1);
    assert!(perf.elapsed_time() >= SubsecondTime::from_ns(20));
}

#[test]
fn test_disabled_model_ignores_everything() {
    let config = config(TimingModel::Simple);
    let mut registry = RobTimerRegistry::new();
    let mut perf = create(&config, 0, &mut registry);

    perf.disable();
    assert!(!perf.is_enabled());
    perf.push_dynamic_info(read_info(0x40, 0x1000, 20, HitWhere::L2Own));
    assert_eq!(perf.handle_instruction(&load(0x40, 0x1000, 2)), Ok(true));
    assert_eq!(perf.instruction_count(), 0);

    perf.enable();
    // The info pushed while disabled was dropped.
    assert_eq!(perf.handle_instruction(&load(0x40, 0x1000, 2)), Ok(false));
}

fn write_info(ip: u64, address: u64, ns: u64) -> DynamicInstructionInfo {
    DynamicInstructionInfo::memory_write(ip, address, SubsecondTime::from_ns(ns), HitWhere::L1Own)
}

fn idle(ns: u64) -> DynamicInstruction {
    DynamicInstruction::new(Instruction::dynamic(SubsecondTime::from_ns(ns)))
}

/// Latency of one load handled by `perf`.
fn load_latency(perf: &mut PerformanceModel, address: u64, hit_where: HitWhere) -> SubsecondTime {
    let before = perf.elapsed_time();
    perf.push_dynamic_info(read_info(0x14, address, 50, hit_where));
    assert_eq!(perf.handle_instruction(&load(0x14, address, 4)), Ok(true));
    perf.elapsed_time() - before
}

#[test]
fn test_iocoom_forwards_buffered_store_data() {
    let mut config = config(TimingModel::Iocoom);
    config.iocoom.num_store_buffer_entries = 1;
    let mut registry = RobTimerRegistry::new();
    let mut perf = create(&config, 0, &mut registry);

    perf.push_dynamic_info(write_info(0x10, 0x2000, 10));
    assert_eq!(perf.handle_instruction(&store(0x10, 0x2000, 3)), Ok(true));

    // Still in the store buffer: served for free.
    assert!(load_latency(&mut perf, 0x2000, HitWhere::DramLocal) < SubsecondTime::from_ns(5));

    // The store completed; its data is only trusted when the load hits the L1.
    assert_eq!(perf.handle_instruction(&idle(100)), Ok(true));
    assert!(load_latency(&mut perf, 0x2000, HitWhere::L1Own) < SubsecondTime::from_ns(5));
    assert!(load_latency(&mut perf, 0x2000, HitWhere::DramLocal) >= SubsecondTime::from_ns(50));

    // A later store takes the only slot; the first address is no longer tracked.
    perf.push_dynamic_info(write_info(0x20, 0x3000, 10));
    assert_eq!(perf.handle_instruction(&store(0x20, 0x3000, 3)), Ok(true));
    assert_eq!(perf.handle_instruction(&idle(100)), Ok(true));
    assert!(load_latency(&mut perf, 0x2000, HitWhere::DramLocal) >= SubsecondTime::from_ns(50));
    assert!(load_latency(&mut perf, 0x2000, HitWhere::L1Own) >= SubsecondTime::from_ns(50));
}

#[test]
fn test_magic_model_clock_only_moves_forward() {
    let config = config(TimingModel::Magic);
    let mut registry = RobTimerRegistry::new();
    let mut perf = create(&config, 0, &mut registry);

    perf.set_elapsed_time(SubsecondTime::from_ns(500));
    assert_eq!(perf.handle_instruction(&add_chain(0x100)), Ok(true));
    assert_eq!(perf.elapsed_time(), SubsecondTime::from_ns(501));

    let pseudo = DynamicInstruction::new(Instruction::dynamic(SubsecondTime::from_ns(40)));
    assert_eq!(perf.handle_instruction(&pseudo), Ok(true));
    assert_eq!(perf.elapsed_time(), SubsecondTime::from_ns(541));
}

#[test]
fn test_rob_model_times_a_dependent_chain() {
    let mut config = config(TimingModel::RobSmt);
    config.core.smt_threads = 1;
    let mut registry = RobTimerRegistry::new();
    let mut perf = create(&config, 0, &mut registry);

    for i in 0..300 {
        assert_eq!(perf.handle_instruction(&add_chain(0x100 + 4 * i)), Ok(true));
    }
    perf.finish().unwrap();

    assert_eq!(perf.instruction_count(), 300);
    assert!(perf.cycle_count() >= 300);

    let timer = registry.timer(0).unwrap();
    let now = timer.with_engine(sniper_timing::RobSmtTimer::now);
    assert_eq!(perf.elapsed_time(), now);
}

#[test]
fn test_rob_model_uses_pushed_memory_info() {
    let mut config = config(TimingModel::RobSmt);
    config.core.smt_threads = 1;
    let mut registry = RobTimerRegistry::new();
    let mut perf = create(&config, 0, &mut registry);

    perf.push_dynamic_info(read_info(0x40, 0x1000, 200, HitWhere::DramLocal));
    assert_eq!(perf.handle_instruction(&load(0x40, 0x1000, 2)), Ok(true));
    perf.finish().unwrap();

    assert_eq!(perf.instruction_count(), 1);
    assert!(perf.cycle_count() >= 200);
}

#[test]
fn test_registry_groups_smt_siblings() {
    let mut config = config(TimingModel::RobSmt);
    config.core.smt_threads = 2;
    let mut registry = RobTimerRegistry::new();
    let _models: Vec<PerformanceModel> = (0..4).map(|core| create(&config, core, &mut registry)).collect();

    assert_eq!(registry.len(), 2);
    let masters: Vec<usize> = registry.iter().map(|(core, _)| core).collect();
    assert_eq!(masters, vec![0, 2]);
    for (_, timer) in registry.iter() {
        assert_eq!(timer.num_threads(), 2);
        assert_eq!(timer.state_string(), "RR");
    }

    registry.disable_all();
    assert!(registry.iter().all(|(_, timer)| !timer.is_enabled()));
    registry.enable_all();
    assert!(registry.iter().all(|(_, timer)| timer.is_enabled()));
}

#[test]
fn test_smt_siblings_run_on_their_own_host_threads() {
    let mut config = config(TimingModel::RobSmt);
    config.core.smt_threads = 2;
    let mut registry = RobTimerRegistry::new();
    let models: Vec<PerformanceModel> = (0..2).map(|core| create(&config, core, &mut registry)).collect();

    let counts: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = models
            .into_iter()
            .enumerate()
            .map(|(core, mut perf)| {
                s.spawn(move || {
                    for i in 0..200 {
                        let insn = add_chain(0x1000 * (core as u64 + 1) + 4 * i);
                        assert_eq!(perf.handle_instruction(&insn), Ok(true));
                    }
                    perf.finish().unwrap();
                    perf.instruction_count()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(counts, vec![200, 200]);
    let timer = registry.timer(0).unwrap();
    assert_eq!(timer.state_string(), "__");
}

#[test]
fn test_disabling_one_sibling_does_not_stall_the_other() {
    let mut config = config(TimingModel::RobSmt);
    config.core.smt_threads = 2;
    let mut registry = RobTimerRegistry::new();
    let mut first = create(&config, 0, &mut registry);
    let mut second = create(&config, 1, &mut registry);

    first.disable();
    assert!(second.is_enabled());
    let timer = registry.timer(0).unwrap();
    assert!(!timer.is_enabled());

    // Far more than the window plus the pre-ROB buffer can hold.
    for i in 0..5000 {
        assert_eq!(second.handle_instruction(&add_chain(0x1000 + 4 * i)), Ok(true));
    }
    assert_eq!(timer.with_engine(|engine| engine.report().threads[1].instructions), 0);

    second.finish().unwrap();
    first.finish().unwrap();
    assert_eq!(timer.state_string(), "__");
}
