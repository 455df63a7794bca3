//! Static micro-operation description.
//!
//! A `MicroOp` is what the decoder produces for one hardware action: its
//! subtype, the registers it reads and writes, and its fixed execution latency.
//! Dynamic information (sequence number, address, cache outcome) lives in
//! [`DynamicMicroOp`](super::DynamicMicroOp).

use std::fmt;

use serde::Serialize;

/// Architectural register identifier.
pub type RegId = u32;

/// Micro-op class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum UopSubtype {
    /// Memory read.
    Load,
    /// Memory write.
    Store,
    /// Integer or other non-memory execution.
    #[default]
    Execute,
    /// Control transfer.
    Branch,
    /// Floating-point add/subtract.
    FpAddSub,
    /// Floating-point multiply/divide.
    FpMulDiv,
}

impl UopSubtype {
    /// Number of subtypes.
    pub const COUNT: usize = 6;

    /// All subtypes in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Load,
        Self::Store,
        Self::Execute,
        Self::Branch,
        Self::FpAddSub,
        Self::FpMulDiv,
    ];

    /// Stable index for per-subtype counters.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Statistic name (`uop_<name>`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Store => "store",
            Self::Execute => "generic",
            Self::Branch => "branch",
            Self::FpAddSub => "fp_addsub",
            Self::FpMulDiv => "fp_muldiv",
        }
    }
}

impl fmt::Display for UopSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded micro-operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MicroOp {
    /// Micro-op class.
    pub subtype: UopSubtype,
    /// Address of the parent instruction.
    pub instruction_pointer: u64,
    /// Registers read.
    pub source_registers: Vec<RegId>,
    /// Registers written.
    pub destination_registers: Vec<RegId>,
    /// Registers forming the memory address (stores and loads).
    pub address_registers: Vec<RegId>,
    /// First micro-op of its instruction.
    pub first: bool,
    /// Last micro-op of its instruction; committing it retires the instruction.
    pub last: bool,
    /// Must issue alone at the ROB head after all stores drained.
    pub serializing: bool,
    /// Memory fence.
    pub mem_barrier: bool,
    /// x87 floating point (accuracy warning only).
    pub x87: bool,
    /// Spin-loop hint.
    pub pause: bool,
    /// Execution latency in cycles, excluding memory.
    pub exec_latency: u32,
    /// Memory access size in bytes.
    pub memory_access_size: u32,
}

impl MicroOp {
    /// Creates a single-micro-op instruction of the given subtype.
    pub fn new(subtype: UopSubtype, instruction_pointer: u64) -> Self {
        Self {
            subtype,
            instruction_pointer,
            first: true,
            last: true,
            exec_latency: 1,
            ..Self::default()
        }
    }

    /// Creates an execute micro-op.
    pub fn execute(instruction_pointer: u64, latency: u32) -> Self {
        Self::new(UopSubtype::Execute, instruction_pointer).with_latency(latency)
    }

    /// Creates a load micro-op of `size` bytes.
    pub fn load(instruction_pointer: u64, size: u32) -> Self {
        Self {
            memory_access_size: size,
            ..Self::new(UopSubtype::Load, instruction_pointer)
        }
    }

    /// Creates a store micro-op of `size` bytes.
    pub fn store(instruction_pointer: u64, size: u32) -> Self {
        Self {
            memory_access_size: size,
            ..Self::new(UopSubtype::Store, instruction_pointer)
        }
    }

    /// Creates a branch micro-op.
    pub fn branch(instruction_pointer: u64) -> Self {
        Self::new(UopSubtype::Branch, instruction_pointer)
    }

    /// Sets the source registers.
    #[must_use]
    pub fn with_sources(mut self, regs: &[RegId]) -> Self {
        self.source_registers = regs.to_vec();
        self
    }

    /// Sets the destination registers.
    #[must_use]
    pub fn with_destinations(mut self, regs: &[RegId]) -> Self {
        self.destination_registers = regs.to_vec();
        self
    }

    /// Sets the address registers.
    #[must_use]
    pub fn with_address_registers(mut self, regs: &[RegId]) -> Self {
        self.address_registers = regs.to_vec();
        self
    }

    /// Sets the execution latency in cycles.
    #[must_use]
    pub fn with_latency(mut self, latency: u32) -> Self {
        self.exec_latency = latency;
        self
    }

    /// Sets the first/last-of-instruction flags.
    #[must_use]
    pub fn with_boundaries(mut self, first: bool, last: bool) -> Self {
        self.first = first;
        self.last = last;
        self
    }

    /// Marks the micro-op serializing.
    #[must_use]
    pub fn serializing(mut self) -> Self {
        self.serializing = true;
        self
    }

    /// Marks the micro-op a memory barrier.
    #[must_use]
    pub fn mem_barrier(mut self) -> Self {
        self.mem_barrier = true;
        self
    }

    /// Reads memory.
    #[inline(always)]
    pub fn is_load(&self) -> bool {
        self.subtype == UopSubtype::Load
    }

    /// Writes memory.
    #[inline(always)]
    pub fn is_store(&self) -> bool {
        self.subtype == UopSubtype::Store
    }

    /// Transfers control.
    #[inline(always)]
    pub fn is_branch(&self) -> bool {
        self.subtype == UopSubtype::Branch
    }
}

impl fmt::Display for MicroOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#x} {} src={:?} dst={:?}",
            self.instruction_pointer, self.subtype, self.source_registers, self.destination_registers
        )
    }
}
