//! Per-hardware-thread ROB state.

use crate::common::SubsecondTime;
use crate::common::constants::{MEMORY_DEPENDENCY_CAPACITY, PRE_ROB_SLACK};
use crate::core::timer::rob::entry::RobEntry;
use crate::core::units::bru::BranchPredictorWrapper;
use crate::core::units::deps::{MemoryDependencies, RegisterDependencies};
use crate::core::units::memory::MemoryHierarchy;
use crate::core::units::queue::CircularQueue;
use crate::stats::{CpiComponent, RobThreadStats};
use crate::uop::HitWhere;

/// Collaborators owned by one hardware thread.
pub struct RobThreadContext {
    /// Serves data accesses at issue and instruction fetches at push.
    pub memory: Box<dyn MemoryHierarchy>,
    /// Predicts branches at push; `None` trusts the front end's flags.
    pub branch_predictor: Option<BranchPredictorWrapper>,
}

impl RobThreadContext {
    /// Context without a branch predictor.
    pub fn new(memory: Box<dyn MemoryHierarchy>) -> Self {
        Self {
            memory,
            branch_predictor: None,
        }
    }

    /// Attaches a branch predictor.
    #[must_use]
    pub fn with_branch_predictor(mut self, predictor: Option<BranchPredictorWrapper>) -> Self {
        self.branch_predictor = predictor;
        self
    }
}

impl std::fmt::Debug for RobThreadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobThreadContext")
            .field("branch_predictor", &self.branch_predictor)
            .finish_non_exhaustive()
    }
}

/// Long-latency load still in flight, for dispatch backpressure.
#[derive(Clone, Copy, Debug)]
pub(super) struct OutstandingLoad {
    pub done: SubsecondTime,
    pub hit_where: HitWhere,
}

/// ROB, dependency tables and counters of one hardware thread.
///
/// The ring holds the dispatched entries first (`num_in_rob` of them),
/// followed by the pre-ROB buffer of pushed but not yet dispatched micro-ops.
/// Sequence numbers in the ring are consecutive.
pub struct RobThread {
    pub(super) rob: CircularQueue<RobEntry>,
    pub(super) num_in_rob: usize,
    pub(super) next_sequence_number: u64,
    pub(super) register_dependencies: RegisterDependencies,
    pub(super) memory_dependencies: MemoryDependencies,

    pub(super) now: SubsecondTime,
    pub(super) instrs: u64,
    pub(super) instrs_returned: u64,

    pub(super) frontend_stalled_until: SubsecondTime,
    pub(super) in_icache_miss: bool,
    pub(super) next_event: SubsecondTime,
    pub(super) current_frontend_stall: Option<CpiComponent>,
    pub(super) cycle_component: CpiComponent,
    pub(super) long_latency_loads: Vec<OutstandingLoad>,
    pub(super) last_accounted_memory_cycle: SubsecondTime,
    pub(super) end_of_stream: bool,
    pub(super) x87_warned: bool,

    pub(super) context: RobThreadContext,
    pub(super) stats: RobThreadStats,
}

impl RobThread {
    pub(super) fn new(
        window_size: usize,
        mlp_bins: Option<usize>,
        context: RobThreadContext,
    ) -> Self {
        let capacity = window_size + PRE_ROB_SLACK;
        Self {
            rob: CircularQueue::new(capacity),
            num_in_rob: 0,
            next_sequence_number: 0,
            register_dependencies: RegisterDependencies::new(),
            memory_dependencies: MemoryDependencies::new(capacity.max(MEMORY_DEPENDENCY_CAPACITY)),
            now: SubsecondTime::ZERO,
            instrs: 0,
            instrs_returned: 0,
            frontend_stalled_until: SubsecondTime::ZERO,
            in_icache_miss: false,
            next_event: SubsecondTime::ZERO,
            current_frontend_stall: Some(CpiComponent::Smt),
            cycle_component: CpiComponent::Base,
            long_latency_loads: Vec::new(),
            last_accounted_memory_cycle: SubsecondTime::ZERO,
            end_of_stream: false,
            x87_warned: false,
            context,
            stats: RobThreadStats::new(window_size, mlp_bins),
        }
    }

    /// Micro-ops pushed but not yet dispatched.
    pub fn pre_rob_len(&self) -> usize {
        self.rob.len() - self.num_in_rob
    }

    /// Micro-ops in the window.
    pub const fn num_in_rob(&self) -> usize {
        self.num_in_rob
    }

    /// Thread-local time.
    pub const fn now(&self) -> SubsecondTime {
        self.now
    }

    /// Instructions committed.
    pub const fn instructions(&self) -> u64 {
        self.instrs
    }

    /// Counters.
    pub const fn stats(&self) -> &RobThreadStats {
        &self.stats
    }

    /// Sequence number of the oldest entry, if any.
    pub(super) fn front_sequence_number(&self) -> Option<u64> {
        self.rob.front().map(RobEntry::sequence_number)
    }

    /// Ring position of `seq`.
    ///
    /// # Panics
    ///
    /// Panics if `seq` is not in the ring, or the ring is not numbered
    /// consecutively.
    pub(super) fn position(&self, seq: u64) -> usize {
        let first = self.front_sequence_number().unwrap_or(seq);
        let position = seq.wrapping_sub(first) as usize;
        assert!(
            position < self.rob.len(),
            "sequence number {seq} outside of ROB (front {first}, {} entries)",
            self.rob.len()
        );
        assert_eq!(
            self.rob[position].sequence_number(),
            seq,
            "sequence number {seq} unexpectedly not at ROB position {position}"
        );
        position
    }

    /// Entry numbered `seq`.
    pub(super) fn entry(&self, seq: u64) -> &RobEntry {
        &self.rob[self.position(seq)]
    }
}

impl std::fmt::Debug for RobThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobThread")
            .field("num_in_rob", &self.num_in_rob)
            .field("pre_rob", &self.pre_rob_len())
            .field("next_sequence_number", &self.next_sequence_number)
            .field("now", &self.now)
            .field("instrs", &self.instrs)
            .field("frontend_stalled_until", &self.frontend_stalled_until)
            .field("end_of_stream", &self.end_of_stream)
            .finish_non_exhaustive()
    }
}
