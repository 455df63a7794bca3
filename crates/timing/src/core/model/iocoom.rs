//! In-order core, out-of-order memory.
//!
//! Instructions issue in program order once their source registers are
//! ready. Loads go through a pool of load units and may be served by a
//! store still in the store buffer; stores retire into the buffer without
//! stalling the pipeline unless every slot is busy.

use crate::common::{ComponentPeriod, SubsecondTime, TimingError};
use crate::common::constants::IOCOOM_SCOREBOARD_SIZE;
use crate::config::{InstructionCosts, IocoomConfig};
use crate::core::model::ModelState;
use crate::core::units::memory::MemoryHierarchy;
use crate::uop::HitWhere;
use crate::uop::instruction::{Direction, DynamicInstructionInfo, Instruction, Operand};

/// Pool of identical load units, each busy until a recorded time.
#[derive(Clone, Debug)]
pub struct LoadUnit {
    scoreboard: Vec<SubsecondTime>,
}

impl LoadUnit {
    /// `num_units` idle units.
    pub fn new(num_units: usize) -> Self {
        Self {
            scoreboard: vec![SubsecondTime::ZERO; num_units.max(1)],
        }
    }

    /// Occupies a unit for `occupancy` starting no earlier than `time`.
    ///
    /// Returns the start time: `time` if some unit is free, else the time the
    /// earliest-free unit becomes available.
    pub fn execute(&mut self, time: SubsecondTime, occupancy: SubsecondTime) -> SubsecondTime {
        let mut unit = 0;
        for i in 0..self.scoreboard.len() {
            if self.scoreboard[i] <= time {
                self.scoreboard[i] = time + occupancy;
                return time;
            }
            if self.scoreboard[i] < self.scoreboard[unit] {
                unit = i;
            }
        }

        let available = self.scoreboard[unit];
        self.scoreboard[unit] += occupancy;
        available
    }
}

/// Result of a store-buffer lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreStatus {
    /// A store to the address is still in the buffer; its data can be forwarded.
    Valid,
    /// The store finished and may already be in the cache.
    Completed,
    /// No store to the address is tracked.
    NotFound,
}

/// Store buffer slots tagged with the address they last held.
#[derive(Clone, Debug)]
pub struct StoreBuffer {
    scoreboard: Vec<SubsecondTime>,
    addresses: Vec<Option<u64>>,
}

impl StoreBuffer {
    /// `num_entries` empty slots.
    pub fn new(num_entries: usize) -> Self {
        let num_entries = num_entries.max(1);
        Self {
            scoreboard: vec![SubsecondTime::ZERO; num_entries],
            addresses: vec![None; num_entries],
        }
    }

    /// Buffers a store to `address` occupying a slot for `occupancy`.
    ///
    /// A store to an address already in the buffer coalesces into its slot.
    /// Returns the time the store entered the buffer.
    pub fn execute_store(
        &mut self,
        time: SubsecondTime,
        occupancy: SubsecondTime,
        address: u64,
    ) -> SubsecondTime {
        if let Some(slot) = self.addresses.iter().position(|a| *a == Some(address)) {
            self.scoreboard[slot] = time + occupancy;
            return time;
        }

        let mut unit = 0;
        for i in 0..self.scoreboard.len() {
            if self.scoreboard[i] <= time {
                self.scoreboard[i] = time + occupancy;
                self.addresses[i] = Some(address);
                return time;
            }
            if self.scoreboard[i] < self.scoreboard[unit] {
                unit = i;
            }
        }

        let available = self.scoreboard[unit];
        self.scoreboard[unit] += occupancy;
        self.addresses[unit] = Some(address);
        available
    }

    /// State at `time` of the last store to `address`.
    pub fn is_address_available(&self, time: SubsecondTime, address: u64) -> StoreStatus {
        self.addresses
            .iter()
            .position(|a| *a == Some(address))
            .map_or(StoreStatus::NotFound, |slot| {
                if self.scoreboard[slot] >= time {
                    StoreStatus::Valid
                } else {
                    StoreStatus::Completed
                }
            })
    }
}

/// In-order issue with a register scoreboard and out-of-order memory.
pub struct IocoomModel {
    state: ModelState,
    register_scoreboard: Vec<SubsecondTime>,
    store_buffer: StoreBuffer,
    load_unit: LoadUnit,
    memory: Option<Box<dyn MemoryHierarchy>>,
}

impl IocoomModel {
    /// Model at time zero with empty buffers.
    pub fn new(period: ComponentPeriod, costs: InstructionCosts, config: &IocoomConfig) -> Self {
        Self {
            state: ModelState::new(period, costs),
            register_scoreboard: vec![SubsecondTime::ZERO; IOCOOM_SCOREBOARD_SIZE],
            store_buffer: StoreBuffer::new(config.num_store_buffer_entries),
            load_unit: LoadUnit::new(config.num_outstanding_loads),
            memory: None,
        }
    }

    /// Charges instruction fetches to `memory`.
    #[must_use]
    pub fn with_memory(mut self, memory: Box<dyn MemoryHierarchy>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Shared model state.
    pub const fn state(&self) -> &ModelState {
        &self.state
    }

    /// Shared model state, mutably.
    pub fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    /// The store buffer.
    pub const fn store_buffer(&self) -> &StoreBuffer {
        &self.store_buffer
    }

    /// Time register `reg` becomes ready.
    pub fn register_ready(&self, reg: u32) -> Option<SubsecondTime> {
        self.register_scoreboard.get(reg as usize).copied()
    }

    fn check_registers(&self, instruction: &Instruction) -> Result<(), TimingError> {
        for operand in &instruction.operands {
            if let Operand::Reg { reg, .. } = *operand {
                if reg as usize >= self.register_scoreboard.len() {
                    return Err(TimingError::RegisterOutOfRange {
                        register: reg,
                        capacity: self.register_scoreboard.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Times one instruction; `Ok(false)` if its memory information is missing.
    ///
    /// # Errors
    ///
    /// Returns [`TimingError::DynamicInfoMismatch`] when the queued
    /// information does not match the memory operands, and
    /// [`TimingError::RegisterOutOfRange`] for a register beyond the
    /// scoreboard. Nothing is changed in either case.
    pub fn handle_instruction(&mut self, instruction: &Instruction) -> Result<bool, TimingError> {
        if !self.state.dynamic_info_available(instruction)? {
            return Ok(false);
        }
        self.check_registers(instruction)?;

        let mut cost = self.state.clock().latency_generator();
        cost.add_latency(instruction.cost(self.state.costs(), self.state.period()));

        if instruction.address != 0 {
            if let Some(memory) = self.memory.as_mut() {
                let fetch = memory.read_instruction(instruction.address, instruction.size);
                self.state.clock_mut().add_latency(fetch.latency);
            }
        }

        let now = self.state.clock().elapsed();
        let mut read_ready = now;
        let mut write_ready = now;
        let mut max_load_latency = SubsecondTime::ZERO;

        for operand in &instruction.operands {
            if let Operand::Reg {
                reg,
                direction: Direction::Read,
            } = *operand
            {
                read_ready = read_ready.max(self.register_scoreboard[reg as usize]);
            }
        }

        let mut writes: Vec<DynamicInstructionInfo> = Vec::new();
        for operand in &instruction.operands {
            let Operand::Memory { direction, .. } = *operand else {
                continue;
            };
            let Some(info) = self.state.pop_dynamic_info() else {
                continue;
            };
            match direction {
                Direction::Read => {
                    let (load_ready, latency) = self.execute_load(read_ready, &info);
                    max_load_latency = max_load_latency.max(latency);
                    read_ready = read_ready.max(load_ready);
                }
                Direction::Write => writes.push(info),
            }
        }

        self.state.count_instructions(1);
        let completion = read_ready + max_load_latency + cost.elapsed();
        if self.state.clock().elapsed() < completion {
            self.state.clock_mut().set_elapsed(completion);
        }

        for operand in &instruction.operands {
            if let Operand::Reg {
                reg,
                direction: Direction::Write,
            } = *operand
            {
                self.register_scoreboard[reg as usize] = completion;
                write_ready = write_ready.max(completion);
            }
        }

        for info in &writes {
            let store_time = self
                .store_buffer
                .execute_store(completion, info.latency, info.address);
            write_ready = write_ready.max(store_time);
        }

        if self.state.clock().elapsed() < write_ready {
            self.state.clock_mut().set_elapsed(write_ready);
        }
        Ok(true)
    }

    /// Start time and latency of a load issued at `time`.
    ///
    /// Data still in the store buffer is forwarded for free, as is a
    /// completed store when the load hits the L1.
    pub fn execute_load(
        &mut self,
        time: SubsecondTime,
        info: &DynamicInstructionInfo,
    ) -> (SubsecondTime, SubsecondTime) {
        let l1_hit = info.hit_where == HitWhere::L1Own;
        let status = self.store_buffer.is_address_available(time, info.address);
        if status == StoreStatus::Valid || (l1_hit && status == StoreStatus::Completed) {
            return (time, SubsecondTime::ZERO);
        }
        (self.load_unit.execute(time, info.latency), info.latency)
    }
}

impl std::fmt::Debug for IocoomModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IocoomModel")
            .field("state", &self.state)
            .field("store_buffer", &self.store_buffer)
            .field("load_unit", &self.load_unit)
            .finish_non_exhaustive()
    }
}
