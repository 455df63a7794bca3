//! Global timing-core constants.
//!
//! This module defines the compile-time bounds shared by the timing models. It includes:
//! 1. **Sentinels:** Invalid sequence numbers and registers.
//! 2. **Table sizes:** Register-file and dependency-list capacities.
//! 3. **ROB bounds:** Inline dependant/producer caps and the pre-ROB buffer slack.
//! 4. **Scheduling thresholds:** Barrier batching and outstanding-miss limits.

/// Sequence number meaning "no producer".
pub const INVALID_SEQNR: u64 = u64::MAX;

/// Architectural register id meaning "not a register".
pub const INVALID_REG: u32 = u32::MAX;

/// Number of architectural registers tracked by the dependency tables.
pub const TOTAL_NUM_REGISTERS: usize = 384;

/// First register id reserved for values passed between the micro-ops of one
/// instruction. Front ends must keep architectural ids below it.
pub const TEMP_REGISTER_BASE: u32 = TOTAL_NUM_REGISTERS as u32 - 16;

/// Maximum register dependencies a single micro-op can carry.
pub const MAXIMUM_NUMBER_OF_DEPENDENCIES: usize = 14;

/// Maximum in-flight consumers one ROB entry can wake up.
pub const MAX_INLINE_DEPENDANTS: usize = 8;

/// Maximum address-producing micro-ops one store can wait on.
pub const MAX_ADDRESS_PRODUCERS: usize = 4;

/// Extra pre-ROB buffer slots on top of the window size.
pub const PRE_ROB_SLACK: usize = 255;

/// Minimum capacity of the memory dependency producer list.
pub const MEMORY_DEPENDENCY_CAPACITY: usize = 1024;

/// Maximum concurrently outstanding long-latency loads per thread.
pub const MAX_OUTSTANDING: usize = 32;

/// Surplus micro-ops a thread must buffer before `simulate` enters the barrier.
pub const SIMULATE_SURPLUS_THRESHOLD: u64 = 128;

/// Register scoreboard size of the IOCOOM model.
pub const IOCOOM_SCOREBOARD_SIZE: usize = 512;
