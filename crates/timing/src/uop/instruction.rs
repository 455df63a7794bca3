//! Instruction data model for the per-instruction timing models.
//!
//! The Simple, Magic and IOCOOM models consume whole instructions: a type with
//! a static cost, a list of register and memory operands, and a queue of
//! `DynamicInstructionInfo` records describing how each memory operand was
//! served. The ROB model instead cracks the instruction into micro-ops (see
//! [`decode`](super::decode)).

use std::fmt;

use serde::Serialize;

use crate::common::{ComponentPeriod, SubsecondTime};
use crate::config::InstructionCosts;
use crate::uop::HitWhere;

/// Instruction class; selects the static cost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum InstructionType {
    /// Anything without a dedicated class.
    #[default]
    Generic,
    /// Integer add.
    Add,
    /// Integer subtract.
    Sub,
    /// Integer multiply.
    Mul,
    /// Integer divide.
    Div,
    /// Floating-point add.
    FAdd,
    /// Floating-point subtract.
    FSub,
    /// Floating-point multiply.
    FMul,
    /// Floating-point divide.
    FDiv,
    /// Unconditional jump.
    Jmp,
    /// Conditional branch.
    Branch,
    /// Pseudo instruction carrying its own cost (delays, synchronization).
    Dynamic,
}

impl InstructionType {
    /// Returns true for pseudo instructions that do not come from the binary.
    pub const fn is_dynamic(self) -> bool {
        matches!(self, Self::Dynamic)
    }

    /// Lowercase name used in reports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::FAdd => "fadd",
            Self::FSub => "fsub",
            Self::FMul => "fmul",
            Self::FDiv => "fdiv",
            Self::Jmp => "jmp",
            Self::Branch => "branch",
            Self::Dynamic => "dynamic",
        }
    }
}

/// Operand direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Operand is read.
    Read,
    /// Operand is written.
    Write,
}

/// Instruction operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Architectural register.
    Reg {
        /// Register id.
        reg: u32,
        /// Read or write.
        direction: Direction,
    },
    /// Memory location; its address and timing arrive as a `DynamicInstructionInfo`.
    Memory {
        /// Read or write.
        direction: Direction,
        /// Register the address is computed from, if any.
        base: Option<u32>,
    },
}

impl Operand {
    /// Register read operand.
    pub const fn reg_read(reg: u32) -> Self {
        Self::Reg {
            reg,
            direction: Direction::Read,
        }
    }

    /// Register write operand.
    pub const fn reg_write(reg: u32) -> Self {
        Self::Reg {
            reg,
            direction: Direction::Write,
        }
    }

    /// Memory read operand.
    pub const fn mem_read() -> Self {
        Self::Memory {
            direction: Direction::Read,
            base: None,
        }
    }

    /// Memory write operand.
    pub const fn mem_write() -> Self {
        Self::Memory {
            direction: Direction::Write,
            base: None,
        }
    }

    /// Sets the address base register of a memory operand.
    #[must_use]
    pub const fn with_base(self, reg: u32) -> Self {
        match self {
            Self::Memory { direction, .. } => Self::Memory {
                direction,
                base: Some(reg),
            },
            reg_operand => reg_operand,
        }
    }

    /// Operand direction.
    pub const fn direction(&self) -> Direction {
        match *self {
            Self::Reg { direction, .. } | Self::Memory { direction, .. } => direction,
        }
    }

    /// Returns true for memory operands.
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory { .. })
    }
}

/// A static instruction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    /// Instruction class.
    pub kind: InstructionType,
    /// Instruction address (0 for pseudo instructions).
    pub address: u64,
    /// Encoded size in bytes.
    pub size: u32,
    /// Register and memory operands in encoding order.
    pub operands: Vec<Operand>,
    /// Cost of a `Dynamic` instruction; ignored for the other classes.
    pub dynamic_cost: SubsecondTime,
}

impl Instruction {
    /// Creates an instruction of the given class.
    pub fn new(kind: InstructionType, address: u64, operands: Vec<Operand>) -> Self {
        Self {
            kind,
            address,
            size: 4,
            operands,
            dynamic_cost: SubsecondTime::ZERO,
        }
    }

    /// Creates a pseudo instruction that costs `cost`.
    pub fn dynamic(cost: SubsecondTime) -> Self {
        Self {
            kind: InstructionType::Dynamic,
            size: 0,
            dynamic_cost: cost,
            ..Self::default()
        }
    }

    /// Execution cost on a core running at `period`.
    ///
    /// Static classes cost their configured cycle count; pseudo instructions
    /// cost exactly what they carry.
    pub fn cost(&self, costs: &InstructionCosts, period: ComponentPeriod) -> SubsecondTime {
        if self.kind.is_dynamic() {
            self.dynamic_cost
        } else {
            period.cycles(costs.cycles(self.kind))
        }
    }

    /// Number of memory operands, i.e. how many dynamic infos it consumes.
    pub fn num_memory_operands(&self) -> usize {
        self.operands.iter().filter(|o| o.is_memory()).count()
    }

    /// Returns true if the instruction comes from the application binary.
    pub fn is_dynamic(&self) -> bool {
        self.kind.is_dynamic()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} {}", self.address, self.kind.name())
    }
}

/// Kind of a dynamic information record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DynamicInstructionInfoKind {
    /// Describes a memory read.
    MemoryRead,
    /// Describes a memory write.
    MemoryWrite,
}

/// Run-time information about one memory operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DynamicInstructionInfo {
    /// Read or write.
    pub kind: DynamicInstructionInfoKind,
    /// Address of the instruction this belongs to.
    pub instruction_address: u64,
    /// Data address.
    pub address: u64,
    /// Access latency as reported by the memory hierarchy.
    pub latency: SubsecondTime,
    /// Where the access was served.
    pub hit_where: HitWhere,
}

impl DynamicInstructionInfo {
    /// Memory read record.
    pub const fn memory_read(
        instruction_address: u64,
        address: u64,
        latency: SubsecondTime,
        hit_where: HitWhere,
    ) -> Self {
        Self {
            kind: DynamicInstructionInfoKind::MemoryRead,
            instruction_address,
            address,
            latency,
            hit_where,
        }
    }

    /// Memory write record.
    pub const fn memory_write(
        instruction_address: u64,
        address: u64,
        latency: SubsecondTime,
        hit_where: HitWhere,
    ) -> Self {
        Self {
            kind: DynamicInstructionInfoKind::MemoryWrite,
            instruction_address,
            address,
            latency,
            hit_where,
        }
    }
}

/// Actual outcome of a branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BranchOutcome {
    /// Whether the branch was taken.
    pub taken: bool,
    /// Target address when taken.
    pub target: u64,
}

/// One executed instance of an instruction.
///
/// Carries what the per-instruction models do not need but micro-op
/// decomposition does: the data address of each memory operand, in operand
/// order, and the branch outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DynamicInstruction {
    /// The static instruction.
    pub instruction: Instruction,
    /// Data addresses of the memory operands, in operand order.
    pub addresses: Vec<u64>,
    /// Branch outcome for control-transfer instructions.
    pub branch: Option<BranchOutcome>,
}

impl DynamicInstruction {
    /// Wraps a static instruction with no dynamic data.
    pub fn new(instruction: Instruction) -> Self {
        Self {
            instruction,
            addresses: Vec::new(),
            branch: None,
        }
    }

    /// Sets the memory operand addresses.
    #[must_use]
    pub fn with_addresses(mut self, addresses: &[u64]) -> Self {
        self.addresses = addresses.to_vec();
        self
    }

    /// Sets the branch outcome.
    #[must_use]
    pub fn with_branch(mut self, taken: bool, target: u64) -> Self {
        self.branch = Some(BranchOutcome { taken, target });
        self
    }
}
