//! Synthetic instruction streams.
//!
//! Each generator yields the dynamic instructions of one hardware thread.
//! Addresses are offset per core so threads do not share lines.

use clap::ValueEnum;
use sniper_timing::uop::instruction::{DynamicInstruction, Instruction, InstructionType, Operand};

/// Shape of the generated instruction stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Workload {
    /// Every add reads the register the previous one wrote.
    DependentChain,
    /// Adds with no register inputs, spread over 16 registers.
    Independent,
    /// Strided loads over a working set, each followed by a dependent add.
    MemoryStream,
    /// Conditional branches with a taken-taken-not-taken pattern.
    Branchy,
    /// Loads, stores, branches and arithmetic interleaved.
    Mixed,
}

const CODE_BASE: u64 = 0x40_0000;
const DATA_BASE: u64 = 0x1000_0000;
const CORE_STRIDE: u64 = 0x100_0000;
const LINE: u64 = 64;
const WORKING_SET: u64 = 256 * 1024;
/// The stream is a loop body of this many instructions.
const LOOP_LENGTH: u64 = 64;

fn op(kind: InstructionType, ip: u64, operands: Vec<Operand>) -> DynamicInstruction {
    DynamicInstruction::new(Instruction::new(kind, ip, operands))
}

/// Instruction `i` of `workload` on `core`.
pub fn instruction(workload: Workload, core: usize, i: u64) -> DynamicInstruction {
    let core = core as u64;
    let ip = CODE_BASE + core * CORE_STRIDE + 4 * (i % LOOP_LENGTH);
    let data = DATA_BASE + core * CORE_STRIDE + (i * LINE) % WORKING_SET;
    let reg = |n: u64| 1 + (n % 16) as u32;

    match workload {
        Workload::DependentChain => op(
            InstructionType::Add,
            ip,
            vec![Operand::reg_read(1), Operand::reg_write(1)],
        ),
        Workload::Independent => op(InstructionType::Add, ip, vec![Operand::reg_write(reg(i))]),
        Workload::MemoryStream => {
            if i % 2 == 0 {
                op(
                    InstructionType::Generic,
                    ip,
                    vec![Operand::mem_read().with_base(20), Operand::reg_write(reg(i))],
                )
                .with_addresses(&[data])
            } else {
                op(
                    InstructionType::Add,
                    ip,
                    vec![Operand::reg_read(reg(i - 1)), Operand::reg_write(reg(i))],
                )
            }
        }
        Workload::Branchy => {
            if i % 4 == 3 {
                let taken = (i / 4) % 3 != 2;
                op(InstructionType::Branch, ip, vec![Operand::reg_read(reg(i - 1))])
                    .with_branch(taken, CODE_BASE + core * CORE_STRIDE)
            } else {
                op(
                    InstructionType::Sub,
                    ip,
                    vec![Operand::reg_read(reg(i + 7)), Operand::reg_write(reg(i))],
                )
            }
        }
        Workload::Mixed => match i % 8 {
            0 => op(
                InstructionType::Generic,
                ip,
                vec![Operand::mem_read().with_base(20), Operand::reg_write(2)],
            )
            .with_addresses(&[data]),
            1 => op(
                InstructionType::Mul,
                ip,
                vec![Operand::reg_read(2), Operand::reg_write(3)],
            ),
            2 => op(
                InstructionType::Generic,
                ip,
                vec![Operand::reg_read(3), Operand::mem_write().with_base(20)],
            )
            .with_addresses(&[data + 8]),
            3 => op(
                InstructionType::Add,
                ip,
                vec![Operand::reg_read(3), Operand::mem_read(), Operand::reg_write(4)],
            )
            .with_addresses(&[data + 8]),
            5 => op(InstructionType::Branch, ip, vec![Operand::reg_read(4)])
                .with_branch(i % 24 != 5, CODE_BASE + core * CORE_STRIDE),
            n => op(
                InstructionType::Add,
                ip,
                vec![Operand::reg_read(reg(n + 4)), Operand::reg_write(reg(n + 5))],
            ),
        },
    }
}
