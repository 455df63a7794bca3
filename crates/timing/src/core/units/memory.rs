//! Memory hierarchy collaborator.
//!
//! The timing models only need to know how long an access takes and which
//! level served it. Two implementations are provided:
//! 1. **`FixedLatencyMemory`:** Every access costs the same.
//! 2. **`CacheHierarchy`:** L1-I/L1-D, L2 and L3 tag stores backed by DRAM.

use crate::common::{ComponentPeriod, SubsecondTime};
use crate::config::MemoryConfig;
use crate::core::units::cache::{CacheStats, SetAssocCache};
use crate::uop::HitWhere;

/// One data access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryAccess {
    /// Data address.
    pub address: u64,
    /// Access size in bytes.
    pub size: u32,
    /// Store (true) or load (false).
    pub is_write: bool,
    /// Address of the accessing instruction.
    pub instruction_pointer: u64,
}

impl MemoryAccess {
    /// Load of `size` bytes at `address`.
    pub const fn read(address: u64, size: u32) -> Self {
        Self {
            address,
            size,
            is_write: false,
            instruction_pointer: 0,
        }
    }

    /// Store of `size` bytes at `address`.
    pub const fn write(address: u64, size: u32) -> Self {
        Self {
            address,
            size,
            is_write: true,
            instruction_pointer: 0,
        }
    }
}

/// Outcome of an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryResult {
    /// Total access latency.
    pub latency: SubsecondTime,
    /// Level that served the access.
    pub hit_where: HitWhere,
}

/// Source of memory access latencies.
pub trait MemoryHierarchy: Send {
    /// Performs a data access.
    fn access(&mut self, access: MemoryAccess) -> MemoryResult;

    /// Fetches `size` bytes of instructions at `address`.
    fn read_instruction(&mut self, address: u64, size: u32) -> MemoryResult;
}

/// Constant-latency memory.
#[derive(Clone, Copy, Debug)]
pub struct FixedLatencyMemory {
    data: MemoryResult,
    instruction: MemoryResult,
}

impl FixedLatencyMemory {
    /// Data accesses take `latency` and report `hit_where`; instruction
    /// fetches always hit the L1-I for free.
    pub const fn new(latency: SubsecondTime, hit_where: HitWhere) -> Self {
        Self {
            data: MemoryResult { latency, hit_where },
            instruction: MemoryResult {
                latency: SubsecondTime::ZERO,
                hit_where: HitWhere::L1I,
            },
        }
    }

    /// Instruction fetches take `latency` and report `hit_where`.
    #[must_use]
    pub const fn with_instruction(mut self, latency: SubsecondTime, hit_where: HitWhere) -> Self {
        self.instruction = MemoryResult { latency, hit_where };
        self
    }
}

impl MemoryHierarchy for FixedLatencyMemory {
    fn access(&mut self, _access: MemoryAccess) -> MemoryResult {
        self.data
    }

    fn read_instruction(&mut self, _address: u64, _size: u32) -> MemoryResult {
        self.instruction
    }
}

/// Private L1 caches, optional L2 and L3, then DRAM.
///
/// Latency is the sum of the latencies of every level looked up. Disabled
/// levels are skipped.
#[derive(Debug)]
pub struct CacheHierarchy {
    l1_i: Option<SetAssocCache>,
    l1_d: Option<SetAssocCache>,
    l2: Option<SetAssocCache>,
    l3: Option<SetAssocCache>,
    dram_latency: u64,
    period: ComponentPeriod,
}

impl CacheHierarchy {
    /// Builds the hierarchy; cycle latencies are converted at `period`.
    pub fn new(config: &MemoryConfig, period: ComponentPeriod) -> Self {
        let level = |c: &crate::config::CacheConfig| c.enabled.then(|| SetAssocCache::new(c));
        Self {
            l1_i: level(&config.l1_i),
            l1_d: level(&config.l1_d),
            l2: level(&config.l2),
            l3: level(&config.l3),
            dram_latency: config.dram_latency,
            period,
        }
    }

    fn walk(&mut self, instruction: bool, address: u64, is_write: bool) -> MemoryResult {
        let mut cycles = 0;
        let (l1, l1_hit) = if instruction {
            (&mut self.l1_i, HitWhere::L1I)
        } else {
            (&mut self.l1_d, HitWhere::L1Own)
        };
        let levels = [
            (l1, l1_hit),
            (&mut self.l2, HitWhere::L2Own),
            (&mut self.l3, HitWhere::L3Own),
        ];
        for (cache, hit_where) in levels {
            if let Some(cache) = cache.as_mut() {
                cycles += cache.latency;
                if cache.access(address, is_write) {
                    return MemoryResult {
                        latency: self.period.cycles(cycles),
                        hit_where,
                    };
                }
            }
        }
        MemoryResult {
            latency: self.period.cycles(cycles + self.dram_latency),
            hit_where: HitWhere::DramLocal,
        }
    }

    /// Counters of the L1-I, L1-D, L2 and L3 (zero for disabled levels).
    pub fn stats(&self) -> [CacheStats; 4] {
        [&self.l1_i, &self.l1_d, &self.l2, &self.l3]
            .map(|c| c.as_ref().map(SetAssocCache::stats).unwrap_or_default())
    }
}

impl MemoryHierarchy for CacheHierarchy {
    fn access(&mut self, access: MemoryAccess) -> MemoryResult {
        self.walk(false, access.address, access.is_write)
    }

    fn read_instruction(&mut self, address: u64, _size: u32) -> MemoryResult {
        self.walk(true, address, false)
    }
}
