//! Per-core performance models.
//!
//! A performance model turns the instruction stream of one simulated core
//! into elapsed time. Four models exist, selected by `core.model`:
//! 1. **Simple:** Memory latency plus a static cost per instruction.
//! 2. **Magic:** Counts instructions; only memory and pseudo instructions cost time.
//! 3. **IOCOOM:** In-order issue with a register scoreboard, a load unit and a store buffer.
//! 4. **ROB:** Out-of-order ROB timer, shared by the hardware threads of one core.
//!
//! The set is closed, so dispatch is a `match` over [`PerformanceModel`].

/// In-order core with out-of-order memory.
pub mod iocoom;

/// Instruction counting model.
pub mod magic;

/// Out-of-order model and the registry of shared ROB timers.
pub mod rob;

/// Static cost model.
pub mod simple;

use std::collections::VecDeque;
use std::sync::Arc;

use crate::common::{ComponentPeriod, ComponentTime, CoreId, SubsecondTime, ThreadId, TimingError};
use crate::config::{Config, InstructionCosts, TimingModel};
use crate::core::timer::ClockSkewClient;
use crate::core::units::memory::MemoryHierarchy;
use crate::uop::instruction::{
    Direction, DynamicInstruction, DynamicInstructionInfo, DynamicInstructionInfoKind, Instruction,
    Operand,
};

pub use self::iocoom::IocoomModel;
pub use self::magic::MagicModel;
pub use self::rob::{RobSmtModel, RobTimerRegistry};
pub use self::simple::SimpleModel;

/// Clock, instruction counter and dynamic information queue common to all models.
#[derive(Debug)]
pub struct ModelState {
    elapsed: ComponentTime,
    instruction_count: u64,
    enabled: bool,
    dynamic_info: VecDeque<DynamicInstructionInfo>,
    costs: InstructionCosts,
}

impl ModelState {
    /// Enabled state at time zero.
    pub fn new(period: ComponentPeriod, costs: InstructionCosts) -> Self {
        Self {
            elapsed: ComponentTime::new(period),
            instruction_count: 0,
            enabled: true,
            dynamic_info: VecDeque::new(),
            costs,
        }
    }

    /// Model clock.
    pub const fn clock(&self) -> &ComponentTime {
        &self.elapsed
    }

    /// Model clock, mutably.
    pub fn clock_mut(&mut self) -> &mut ComponentTime {
        &mut self.elapsed
    }

    /// Clock period of the core.
    pub const fn period(&self) -> ComponentPeriod {
        self.elapsed.component_period()
    }

    /// Static instruction costs.
    pub const fn costs(&self) -> &InstructionCosts {
        &self.costs
    }

    /// Counts one more instruction.
    pub fn count_instructions(&mut self, count: u64) {
        self.instruction_count += count;
    }

    /// Checks that one info of the right kind is queued for every memory
    /// operand of `instruction`, without consuming any.
    ///
    /// Returns `Ok(false)` when some info has not arrived yet.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::DynamicInfoMismatch`] when a queued info has the
    /// wrong kind for its operand.
    pub fn dynamic_info_available(&self, instruction: &Instruction) -> Result<bool, TimingError> {
        let mut queued = self.dynamic_info.iter();
        for operand in &instruction.operands {
            let Operand::Memory { direction, .. } = operand else {
                continue;
            };
            let Some(info) = queued.next() else {
                return Ok(false);
            };
            let expected = match direction {
                Direction::Read => DynamicInstructionInfoKind::MemoryRead,
                Direction::Write => DynamicInstructionInfoKind::MemoryWrite,
            };
            if info.kind != expected {
                return Err(TimingError::DynamicInfoMismatch {
                    address: instruction.address,
                    expected,
                    found: info.kind,
                });
            }
        }
        Ok(true)
    }

    /// Removes and returns the oldest queued info.
    pub fn pop_dynamic_info(&mut self) -> Option<DynamicInstructionInfo> {
        self.dynamic_info.pop_front()
    }

    /// Oldest queued info.
    pub fn peek_dynamic_info(&self) -> Option<&DynamicInstructionInfo> {
        self.dynamic_info.front()
    }
}

/// One core's performance model.
#[derive(Debug)]
pub enum PerformanceModel {
    /// Static cost model.
    Simple(SimpleModel),
    /// Instruction counting model.
    Magic(MagicModel),
    /// In-order core with out-of-order memory.
    Iocoom(IocoomModel),
    /// Out-of-order ROB model.
    RobSmt(RobSmtModel),
}

impl PerformanceModel {
    /// Builds the model selected by `config.core.model` for `core_id`.
    ///
    /// The ROB model attaches to the shared timer of the core's SMT group in
    /// `registry`; `app_thread` is bound to the new hardware thread when given.
    pub fn create(
        config: &Config,
        core_id: CoreId,
        app_thread: Option<ThreadId>,
        memory: Box<dyn MemoryHierarchy>,
        registry: &mut RobTimerRegistry,
        client: Option<Arc<dyn ClockSkewClient>>,
    ) -> Self {
        let period = ComponentPeriod::from_ghz(config.core.frequency_ghz);
        let costs = config.core.instruction_costs.clone();
        match config.core.model {
            TimingModel::Simple => Self::Simple(SimpleModel::new(period, costs)),
            TimingModel::Magic => Self::Magic(MagicModel::new(period, costs)),
            TimingModel::Iocoom => Self::Iocoom(
                IocoomModel::new(period, costs, &config.iocoom).with_memory(memory),
            ),
            TimingModel::RobSmt => Self::RobSmt(RobSmtModel::attach(
                config,
                core_id,
                app_thread,
                memory,
                registry,
                client,
            )),
        }
    }

    const fn state(&self) -> &ModelState {
        match self {
            Self::Simple(m) => m.state(),
            Self::Magic(m) => m.state(),
            Self::Iocoom(m) => m.state(),
            Self::RobSmt(m) => m.state(),
        }
    }

    fn state_mut(&mut self) -> &mut ModelState {
        match self {
            Self::Simple(m) => m.state_mut(),
            Self::Magic(m) => m.state_mut(),
            Self::Iocoom(m) => m.state_mut(),
            Self::RobSmt(m) => m.state_mut(),
        }
    }

    /// Times one instruction.
    ///
    /// Returns `Ok(false)` when dynamic information the instruction needs has
    /// not been pushed yet; nothing was changed and the call should be
    /// repeated once it has. A disabled model accepts and ignores everything.
    ///
    /// # Errors
    ///
    /// Returns a [`TimingError`] when the queued information does not match
    /// the instruction, or a register is outside the model's range.
    pub fn handle_instruction(&mut self, instruction: &DynamicInstruction) -> Result<bool, TimingError> {
        if !self.state().enabled {
            return Ok(true);
        }
        match self {
            Self::Simple(m) => m.handle_instruction(&instruction.instruction),
            Self::Magic(m) => m.handle_instruction(&instruction.instruction),
            Self::Iocoom(m) => m.handle_instruction(&instruction.instruction),
            Self::RobSmt(m) => m.handle_instruction(instruction),
        }
    }

    /// Queues the run-time information of one memory operand.
    pub fn push_dynamic_info(&mut self, info: DynamicInstructionInfo) {
        let state = self.state_mut();
        if state.enabled {
            state.dynamic_info.push_back(info);
        }
    }

    /// Instructions timed so far.
    pub const fn instruction_count(&self) -> u64 {
        self.state().instruction_count
    }

    /// Model time.
    pub const fn elapsed_time(&self) -> SubsecondTime {
        self.state().elapsed.elapsed()
    }

    /// Model time in core cycles.
    pub const fn cycle_count(&self) -> u64 {
        self.state().elapsed.cycle_count()
    }

    /// Moves the model clock, e.g. when a thread is spawned at a later time.
    ///
    /// # Panics
    ///
    /// The magic model panics if `time` lies before its current time.
    pub fn set_elapsed_time(&mut self, time: SubsecondTime) {
        match self {
            Self::Magic(m) => m.set_elapsed_time(time),
            _ => self.state_mut().elapsed.set_elapsed(time),
        }
    }

    /// Whether instructions are being timed.
    pub const fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Starts timing instructions.
    pub fn enable(&mut self) {
        self.state_mut().enabled = true;
        if let Self::RobSmt(m) = self {
            m.enable_detailed_model();
        }
    }

    /// Stops timing instructions; they are accepted and ignored.
    pub fn disable(&mut self) {
        self.state_mut().enabled = false;
        if let Self::RobSmt(m) = self {
            m.disable_detailed_model();
        }
    }

    /// Safe point: lets the shared ROB timer advance.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::UnknownThread`] if the ROB model's hardware
    /// thread is not registered on its timer.
    pub fn synchronize(&mut self) -> Result<(), TimingError> {
        match self {
            Self::RobSmt(m) => m.synchronize(),
            _ => Ok(()),
        }
    }

    /// The model clock was moved from outside; tells the shared ROB timer.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::UnknownThread`] if the ROB model's hardware
    /// thread is not registered on its timer.
    pub fn notify_elapsed_time_update(&mut self) -> Result<(), TimingError> {
        match self {
            Self::RobSmt(m) => m.notify_elapsed_time_update(),
            _ => Ok(()),
        }
    }

    /// End of the instruction stream: drains the ROB model.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::UnknownThread`] if the ROB model's hardware
    /// thread is not registered on its timer.
    pub fn finish(&mut self) -> Result<(), TimingError> {
        match self {
            Self::RobSmt(m) => m.finish(),
            _ => Ok(()),
        }
    }
}
