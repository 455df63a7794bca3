//! Cracks one dynamic instruction into micro-ops.
//!
//! Memory reads become loads, the computation becomes one execute (or branch,
//! or FP) micro-op, and memory writes become stores:
//!
//! ```text
//!   add [rbx], rax   ->   load  t0 <- [rbx]
//!                         exec  t15 <- t0, rax
//!                         store [rbx] <- t15
//! ```
//!
//! Values flow between the micro-ops through temporary registers starting at
//! `TEMP_REGISTER_BASE`, so the ordinary register dependency table links them.
//! A generic instruction with memory operands is a pure move: loads write the
//! destination registers directly and stores read the sources, with no
//! execute micro-op in between.

use crate::common::ComponentPeriod;
use crate::common::constants::TEMP_REGISTER_BASE;
use crate::config::InstructionCosts;
use crate::uop::instruction::{Direction, DynamicInstruction, InstructionType, Operand};
use crate::uop::{DynamicMicroOp, MicroOp, RegId, UopSubtype};

/// Register carrying the result of the execute micro-op to the stores.
const STORE_DATA_REGISTER: RegId = TEMP_REGISTER_BASE + 15;

/// Default memory access size in bytes.
const ACCESS_SIZE: u32 = 8;

fn load_temp(idx: usize) -> RegId {
    TEMP_REGISTER_BASE + (idx % 15) as RegId
}

fn compute_subtype(kind: InstructionType) -> UopSubtype {
    match kind {
        InstructionType::Branch | InstructionType::Jmp => UopSubtype::Branch,
        InstructionType::FAdd | InstructionType::FSub => UopSubtype::FpAddSub,
        InstructionType::FMul | InstructionType::FDiv => UopSubtype::FpMulDiv,
        _ => UopSubtype::Execute,
    }
}

/// Decomposes `insn` into its micro-ops, in program order.
///
/// Memory operands take their addresses from `insn.addresses` in operand
/// order; missing addresses default to zero.
pub fn decode(
    insn: &DynamicInstruction,
    costs: &InstructionCosts,
    period: ComponentPeriod,
) -> Vec<DynamicMicroOp> {
    let inst = &insn.instruction;
    let ip = inst.address;

    let mut reg_reads = Vec::new();
    let mut reg_writes = Vec::new();
    let mut mem_reads = Vec::new();
    let mut mem_writes = Vec::new();
    let mut mem_idx = 0;
    for op in &inst.operands {
        match *op {
            Operand::Reg {
                reg,
                direction: Direction::Read,
            } => reg_reads.push(reg),
            Operand::Reg {
                reg,
                direction: Direction::Write,
            } => reg_writes.push(reg),
            Operand::Memory { direction, base } => {
                let address = insn.addresses.get(mem_idx).copied().unwrap_or(0);
                mem_idx += 1;
                let slot = (address, base);
                match direction {
                    Direction::Read => mem_reads.push(slot),
                    Direction::Write => mem_writes.push(slot),
                }
            }
        }
    }

    let moves_only =
        inst.kind == InstructionType::Generic && !(mem_reads.is_empty() && mem_writes.is_empty());
    let mut uops = Vec::with_capacity(mem_reads.len() + mem_writes.len() + 1);

    for (i, &(address, base)) in mem_reads.iter().enumerate() {
        let dest = if moves_only {
            reg_writes.clone()
        } else {
            vec![load_temp(i)]
        };
        let base: Vec<RegId> = base.into_iter().collect();
        let uop = MicroOp::load(ip, ACCESS_SIZE)
            .with_sources(&base)
            .with_address_registers(&base)
            .with_destinations(&dest);
        uops.push(DynamicMicroOp::new(uop).with_address(address));
    }

    if !moves_only {
        let mut sources = reg_reads.clone();
        sources.extend((0..mem_reads.len()).map(load_temp));
        let mut dest = reg_writes.clone();
        if !mem_writes.is_empty() {
            dest.push(STORE_DATA_REGISTER);
        }
        let latency = if inst.is_dynamic() {
            inst.dynamic_cost.divide_rounded(period.period())
        } else {
            costs.cycles(inst.kind)
        };
        let uop = MicroOp::new(compute_subtype(inst.kind), ip)
            .with_sources(&sources)
            .with_destinations(&dest)
            .with_latency(u32::try_from(latency).unwrap_or(u32::MAX));
        let mut dyn_uop = DynamicMicroOp::new(uop);
        if dyn_uop.uop.is_branch() {
            dyn_uop.branch = insn.branch;
        }
        uops.push(dyn_uop);
    }

    for &(address, base) in &mem_writes {
        let data = if moves_only {
            reg_reads.clone()
        } else {
            vec![STORE_DATA_REGISTER]
        };
        let base: Vec<RegId> = base.into_iter().collect();
        let mut sources = data;
        sources.extend(base.iter().copied());
        let uop = MicroOp::store(ip, ACCESS_SIZE)
            .with_sources(&sources)
            .with_address_registers(&base);
        uops.push(DynamicMicroOp::new(uop).with_address(address));
    }

    let count = uops.len();
    for (i, uop) in uops.iter_mut().enumerate() {
        uop.uop.first = i == 0;
        uop.uop.last = i + 1 == count;
    }
    uops
}
