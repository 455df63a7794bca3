//! Dynamic micro-operation instance.

use crate::common::constants::MAXIMUM_NUMBER_OF_DEPENDENCIES;
use crate::common::{BoundedSeqList, INVALID_SEQNR};
use crate::uop::instruction::BranchOutcome;
use crate::uop::{HitWhere, MicroOp};

/// One executed instance of a [`MicroOp`], as it flows through the ROB timer.
#[derive(Clone, Debug)]
pub struct DynamicMicroOp {
    /// The static micro-op.
    pub uop: MicroOp,
    sequence_number: u64,
    dependencies: BoundedSeqList<MAXIMUM_NUMBER_OF_DEPENDENCIES>,
    /// Execution latency in cycles; grows by the data-cache latency at issue.
    pub exec_latency: u64,
    /// Data address for loads and stores.
    pub address: u64,
    /// Where the data access was served; `Unknown` until issue resolves it.
    pub dcache_hit_where: HitWhere,
    /// Where the instruction fetch was served.
    pub icache_hit_where: HitWhere,
    /// Instruction fetch latency in cycles (used on an I-cache miss).
    pub icache_latency: u64,
    /// Actual branch outcome.
    pub branch: Option<BranchOutcome>,
    /// Set when the branch predictor got this branch wrong.
    pub branch_mispredicted: bool,
    /// Wrong-path micro-op; dropped when pushed.
    pub squashed: bool,
    /// Treat as a long-latency load regardless of its latency.
    pub force_long_latency_load: bool,
}

impl DynamicMicroOp {
    /// Wraps a static micro-op with default dynamic state.
    pub fn new(uop: MicroOp) -> Self {
        let exec_latency = u64::from(uop.exec_latency);
        Self {
            uop,
            sequence_number: INVALID_SEQNR,
            dependencies: BoundedSeqList::new(),
            exec_latency,
            address: 0,
            dcache_hit_where: HitWhere::Unknown,
            icache_hit_where: HitWhere::L1I,
            icache_latency: 0,
            branch: None,
            branch_mispredicted: false,
            squashed: false,
            force_long_latency_load: false,
        }
    }

    /// Sets the data address.
    #[must_use]
    pub fn with_address(mut self, address: u64) -> Self {
        self.address = address;
        self
    }

    /// Marks the data access as already resolved by the front end.
    #[must_use]
    pub fn with_dcache(mut self, hit_where: HitWhere, latency_cycles: u64) -> Self {
        self.dcache_hit_where = hit_where;
        self.exec_latency += latency_cycles;
        self
    }

    /// Records an instruction-cache miss.
    #[must_use]
    pub fn with_icache_miss(mut self, hit_where: HitWhere, latency_cycles: u64) -> Self {
        self.icache_hit_where = hit_where;
        self.icache_latency = latency_cycles;
        self
    }

    /// Attaches the actual branch outcome.
    #[must_use]
    pub fn with_branch(mut self, outcome: BranchOutcome) -> Self {
        self.branch = Some(outcome);
        self
    }

    /// Marks the branch as mispredicted by the front end.
    #[must_use]
    pub fn mispredicted(mut self) -> Self {
        self.branch_mispredicted = true;
        self
    }

    /// Sequence number assigned at push.
    #[inline(always)]
    pub const fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Assigns the sequence number.
    #[inline(always)]
    pub fn set_sequence_number(&mut self, seq: u64) {
        self.sequence_number = seq;
    }

    /// Adds a producer dependency; duplicates are ignored.
    ///
    /// # Panics
    ///
    /// Panics when more than `MAXIMUM_NUMBER_OF_DEPENDENCIES` distinct producers
    /// are added.
    pub fn add_dependency(&mut self, seq: u64) {
        if !self.dependencies.contains(seq) {
            self.dependencies.push(seq, "micro-op dependency list");
        }
    }

    /// Drops one producer dependency.
    pub fn remove_dependency(&mut self, seq: u64) {
        let _ = self.dependencies.remove(seq);
    }

    /// Drops every dependency.
    pub fn clear_dependencies(&mut self) {
        self.dependencies.clear();
    }

    /// Number of unresolved producers.
    #[inline(always)]
    pub const fn dependencies_len(&self) -> usize {
        self.dependencies.len()
    }

    /// Producer at `idx`.
    pub fn dependency(&self, idx: usize) -> Option<u64> {
        self.dependencies.get(idx)
    }

    /// Unresolved producers in insertion order.
    pub fn dependencies(&self) -> &[u64] {
        self.dependencies.as_slice()
    }

    /// Copy of the producer list, for iterating while the micro-op changes.
    pub const fn dependency_list(&self) -> BoundedSeqList<MAXIMUM_NUMBER_OF_DEPENDENCIES> {
        self.dependencies
    }

    /// Last micro-op of its instruction.
    #[inline(always)]
    pub const fn is_last(&self) -> bool {
        self.uop.last
    }

    /// Whether this load counts as long latency under `cutoff` cycles.
    ///
    /// A cutoff of zero disables the latency test.
    pub fn is_long_latency_load(&self, cutoff: u64) -> bool {
        self.uop.is_load()
            && (self.force_long_latency_load || (cutoff > 0 && self.exec_latency > cutoff))
    }
}
