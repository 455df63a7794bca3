//! Instruction counting model.
//!
//! Application instructions take one cycle each; only memory latency and
//! pseudo instructions (which carry their own cost) add more.

use crate::common::{ComponentPeriod, SubsecondTime, TimingError};
use crate::config::InstructionCosts;
use crate::core::model::ModelState;
use crate::uop::instruction::Instruction;

/// One cycle per instruction plus memory latency.
#[derive(Debug)]
pub struct MagicModel {
    state: ModelState,
}

impl MagicModel {
    /// Model at time zero.
    pub fn new(period: ComponentPeriod, costs: InstructionCosts) -> Self {
        Self {
            state: ModelState::new(period, costs),
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

    /// Times one instruction; `Ok(false)` if its memory information is missing.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::DynamicInfoMismatch`] when the queued
    /// information does not match the instruction's memory operands.
    pub fn handle_instruction(&mut self, instruction: &Instruction) -> Result<bool, TimingError> {
        if !self.state.dynamic_info_available(instruction)? {
            return Ok(false);
        }

        let mut cost = self.state.clock().latency_generator();
        for _ in 0..instruction.num_memory_operands() {
            if let Some(info) = self.state.pop_dynamic_info() {
                cost.add_latency(info.latency);
            }
        }
        if instruction.is_dynamic() {
            cost.add_latency(instruction.cost(self.state.costs(), self.state.period()));
        } else {
            cost.add_cycles(1);
        }

        self.state.count_instructions(1);
        self.state.clock_mut().add_latency(cost.elapsed());
        Ok(true)
    }

    /// Moves the clock to `time`.
    ///
    /// # Panics
    ///
    /// Panics if `time` lies before the current time, unless the clock has
    /// not started yet.
    pub fn set_elapsed_time(&mut self, time: SubsecondTime) {
        let now = self.state.clock().elapsed();
        assert!(
            time >= now || now == SubsecondTime::ZERO,
            "magic model clock moved backwards: {time} < {now}"
        );
        self.state.clock_mut().set_elapsed(time);
    }
}
