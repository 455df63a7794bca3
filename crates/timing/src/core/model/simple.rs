//! Static cost model: every instruction costs its memory latency plus its
//! configured cycle count, strictly in sequence.

use crate::common::{ComponentPeriod, TimingError};
use crate::config::InstructionCosts;
use crate::core::model::ModelState;
use crate::uop::instruction::Instruction;

/// Memory latency plus static cost, no overlap.
#[derive(Debug)]
pub struct SimpleModel {
    state: ModelState,
}

impl SimpleModel {
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
        cost.add_latency(instruction.cost(self.state.costs(), self.state.period()));

        self.state.count_instructions(1);
        self.state.clock_mut().add_latency(cost.elapsed());
        Ok(true)
    }
}
