//! Register producer table.

use std::fmt;

use crate::common::INVALID_SEQNR;
use crate::common::constants::TOTAL_NUM_REGISTERS;
use crate::uop::{DynamicMicroOp, RegId};

/// Youngest producer of every architectural register.
#[derive(Clone)]
pub struct RegisterDependencies {
    producers: [u64; TOTAL_NUM_REGISTERS],
}

impl RegisterDependencies {
    /// Table with no producers.
    pub const fn new() -> Self {
        Self {
            producers: [INVALID_SEQNR; TOTAL_NUM_REGISTERS],
        }
    }

    /// Adds the producers of `uop`'s sources to its dependency list, then
    /// makes `uop` the producer of its destinations.
    ///
    /// Sources are read before destinations are written, so an instruction
    /// reading and writing the same register depends on the previous writer.
    /// Producers older than `lowest` are reset on sight. Register ids outside
    /// the table are ignored.
    pub fn set_dependencies(&mut self, uop: &mut DynamicMicroOp, lowest: u64) {
        for i in 0..uop.uop.source_registers.len() {
            let reg = uop.uop.source_registers[i];
            let Some(slot) = self.producers.get_mut(reg as usize) else {
                continue;
            };
            let producer = *slot;
            if producer == INVALID_SEQNR {
                continue;
            }
            if producer >= lowest {
                uop.add_dependency(producer);
            } else {
                *slot = INVALID_SEQNR;
            }
        }

        let seq = uop.sequence_number();
        for &reg in &uop.uop.destination_registers {
            if let Some(slot) = self.producers.get_mut(reg as usize) {
                *slot = seq;
            }
        }
    }

    /// Producer of `reg` if it is still in flight, else `INVALID_SEQNR`.
    pub fn peek_producer(&self, reg: RegId, lowest: u64) -> u64 {
        match self.producers.get(reg as usize) {
            Some(&seq) if seq != INVALID_SEQNR && seq >= lowest => seq,
            _ => INVALID_SEQNR,
        }
    }

    /// Raw table entry for `reg` (`INVALID_SEQNR` for unknown registers).
    pub fn producer(&self, reg: RegId) -> u64 {
        self.producers
            .get(reg as usize)
            .copied()
            .unwrap_or(INVALID_SEQNR)
    }

    /// Forgets every producer.
    pub fn clear(&mut self) {
        self.producers.fill(INVALID_SEQNR);
    }
}

impl Default for RegisterDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RegisterDependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = self
            .producers
            .iter()
            .filter(|&&seq| seq != INVALID_SEQNR)
            .count();
        f.debug_struct("RegisterDependencies")
            .field("live_producers", &live)
            .finish()
    }
}
