//! Out-of-order model backed by a shared ROB timer.
//!
//! Every core of an SMT group owns a [`RobSmtModel`], but all of them feed
//! one [`RobSmtTimer`] through its [`SmtTimer`]. The timers live in a
//! [`RobTimerRegistry`] keyed by the group's master core.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::common::{ComponentPeriod, CoreId, SmtThreadId, ThreadId, TimingError};
use crate::config::Config;
use crate::core::model::ModelState;
use crate::core::timer::rob::{RobSmtTimer, RobThreadContext};
use crate::core::timer::{ClockSkewClient, SmtTimer};
use crate::core::units::bru::BranchPredictorWrapper;
use crate::core::units::memory::MemoryHierarchy;
use crate::stats::TimerReport;
use crate::uop::decode::decode;
use crate::uop::instruction::{
    DynamicInstruction, DynamicInstructionInfo, DynamicInstructionInfoKind,
};
use crate::uop::{DynamicMicroOp, HitWhere};

/// Shared timer of one SMT group.
pub type SharedRobTimer = Arc<SmtTimer<RobSmtTimer>>;

/// Owner of the shared ROB timers, one per SMT group.
#[derive(Debug, Default)]
pub struct RobTimerRegistry {
    timers: BTreeMap<CoreId, SharedRobTimer>,
}

impl RobTimerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest core id of the SMT group `core_id` belongs to.
    pub const fn master_core(core_id: CoreId, smt_threads: usize) -> CoreId {
        let smt_threads = if smt_threads == 0 { 1 } else { smt_threads };
        core_id - core_id % smt_threads
    }

    /// Registers a hardware thread for `core_id` on its group's timer,
    /// creating the timer for the first core of the group.
    ///
    /// When `app_thread` is given it is bound to the new slot and started.
    pub fn attach(
        &mut self,
        config: &Config,
        core_id: CoreId,
        app_thread: Option<ThreadId>,
        context: RobThreadContext,
        client: Option<Arc<dyn ClockSkewClient>>,
    ) -> (SharedRobTimer, SmtThreadId) {
        let master = Self::master_core(core_id, config.core.smt_threads);
        let timer = Arc::clone(self.timers.entry(master).or_insert_with(|| {
            debug!(master, "creating shared ROB timer");
            Arc::new(SmtTimer::new(RobSmtTimer::new(config)))
        }));

        let thread = timer.register_thread(core_id, client, context);
        if let Some(app_thread) = app_thread {
            let _ = timer.bind_thread(core_id, app_thread);
            timer.thread_start(app_thread);
        }
        (timer, thread)
    }

    /// Timer of the group whose master core is `master`.
    pub fn timer(&self, master: CoreId) -> Option<SharedRobTimer> {
        self.timers.get(&master).cloned()
    }

    /// Number of SMT groups.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// No timer has been created yet.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Master core ids and their timers.
    pub fn iter(&self) -> impl Iterator<Item = (CoreId, &SharedRobTimer)> {
        self.timers.iter().map(|(core, timer)| (*core, timer))
    }

    /// Disables every timer, releasing parked threads.
    pub fn disable_all(&self) {
        for timer in self.timers.values() {
            timer.disable();
        }
    }

    /// Re-enables every timer.
    pub fn enable_all(&self) {
        for timer in self.timers.values() {
            timer.enable();
        }
    }
}

/// Per-core front of a shared ROB timer.
pub struct RobSmtModel {
    state: ModelState,
    timer: SharedRobTimer,
    thread: SmtThreadId,
}

impl RobSmtModel {
    /// Model for `core_id`, attached to its group's timer in `registry`.
    pub fn attach(
        config: &Config,
        core_id: CoreId,
        app_thread: Option<ThreadId>,
        memory: Box<dyn MemoryHierarchy>,
        registry: &mut RobTimerRegistry,
        client: Option<Arc<dyn ClockSkewClient>>,
    ) -> Self {
        let context = RobThreadContext::new(memory)
            .with_branch_predictor(BranchPredictorWrapper::new(&config.branch_predictor));
        let (timer, thread) = registry.attach(config, core_id, app_thread, context, client);
        Self {
            state: ModelState::new(
                ComponentPeriod::from_ghz(config.core.frequency_ghz),
                config.core.instruction_costs.clone(),
            ),
            timer,
            thread,
        }
    }

    /// Shared model state.
    pub const fn state(&self) -> &ModelState {
        &self.state
    }

    /// Shared model state, mutably.
    pub fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    /// The shared timer.
    pub const fn timer(&self) -> &SharedRobTimer {
        &self.timer
    }

    /// Hardware thread slot on the shared timer.
    pub const fn thread(&self) -> SmtThreadId {
        self.thread
    }

    /// Counters of every thread on the shared timer.
    pub fn report(&self) -> TimerReport {
        self.timer.with_engine(RobSmtTimer::report)
    }

    /// Attaches queued memory information to the load and store micro-ops,
    /// in operand order. Without it, memory is resolved at issue.
    fn apply_dynamic_info(
        &mut self,
        instruction: &DynamicInstruction,
        uops: &mut [DynamicMicroOp],
    ) -> Result<(), TimingError> {
        let num_memory = instruction.instruction.num_memory_operands();
        if num_memory == 0 || !self.state.dynamic_info_available(&instruction.instruction)? {
            return Ok(());
        }

        let period = self.state.period().period();
        let infos: Vec<DynamicInstructionInfo> = (0..num_memory)
            .filter_map(|_| self.state.pop_dynamic_info())
            .collect();
        let mut reads = infos
            .iter()
            .filter(|i| i.kind == DynamicInstructionInfoKind::MemoryRead);
        let mut writes = infos
            .iter()
            .filter(|i| i.kind == DynamicInstructionInfoKind::MemoryWrite);

        for uop in uops.iter_mut() {
            let info = if uop.uop.is_load() {
                reads.next()
            } else if uop.uop.is_store() {
                writes.next()
            } else {
                None
            };
            let Some(info) = info else {
                continue;
            };
            uop.address = info.address;
            if info.hit_where != HitWhere::Unknown {
                uop.dcache_hit_where = info.hit_where;
                uop.exec_latency += info.latency.divide_rounded(period);
            }
        }
        Ok(())
    }

    /// Decodes `instruction`, pushes its micro-ops to the shared timer and
    /// lets the timer advance.
    ///
    /// The model clock moves by whatever the timer reports as elapsed for
    /// this thread; the instruction count follows commits, not pushes.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::DynamicInfoMismatch`] for mismatched queued
    /// information and [`TimingError::UnknownThread`] if the slot vanished.
    pub fn handle_instruction(&mut self, instruction: &DynamicInstruction) -> Result<bool, TimingError> {
        let mut uops = decode(instruction, self.state.costs(), self.state.period());
        self.apply_dynamic_info(instruction, &mut uops)?;

        let (instructions, latency) = self.timer.push_instructions(self.thread, uops)?;
        self.state.count_instructions(instructions);
        self.state.clock_mut().add_latency(latency);

        self.timer.simulate(self.thread)?;
        Ok(true)
    }

    /// Safe point for the shared timer.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::UnknownThread`] if the slot vanished.
    pub fn synchronize(&mut self) -> Result<(), TimingError> {
        self.timer.simulate(self.thread)
    }

    /// Tells the timer the model clock was moved.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::UnknownThread`] if the slot vanished.
    pub fn notify_elapsed_time_update(&mut self) -> Result<(), TimingError> {
        self.timer
            .synchronize(self.thread, self.state.clock().elapsed())
    }

    /// Drains this thread's micro-ops and collects the remaining latency.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::UnknownThread`] if the slot vanished.
    pub fn finish(&mut self) -> Result<(), TimingError> {
        self.timer.finish(self.thread)?;
        let (instructions, latency) = self.timer.return_latency(self.thread)?;
        self.state.count_instructions(instructions);
        self.state.clock_mut().add_latency(latency);
        Ok(())
    }

    /// Re-enables the shared timer.
    pub fn enable_detailed_model(&self) {
        self.timer.enable();
    }

    /// Disables the shared timer.
    pub fn disable_detailed_model(&self) {
        self.timer.disable();
    }
}

impl std::fmt::Debug for RobSmtModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobSmtModel")
            .field("state", &self.state)
            .field("thread", &self.thread)
            .finish_non_exhaustive()
    }
}
