//! Store and memory-barrier producer list.
//!
//! In-flight stores are kept in program order. A load depends on the youngest
//! older store to the same address; loads, stores and barriers all depend on
//! the most recent memory barrier.

use crate::common::INVALID_SEQNR;
use crate::core::units::queue::CircularQueue;
use crate::uop::DynamicMicroOp;

#[derive(Clone, Copy, Debug)]
struct Producer {
    seq: u64,
    address: u64,
}

/// Memory producer table of one hardware thread.
#[derive(Clone, Debug)]
pub struct MemoryDependencies {
    producers: CircularQueue<Producer>,
    membar: u64,
}

impl MemoryDependencies {
    /// Table holding at most `capacity` in-flight stores.
    pub fn new(capacity: usize) -> Self {
        Self {
            producers: CircularQueue::new(capacity),
            membar: INVALID_SEQNR,
        }
    }

    /// Adds memory dependencies to `uop` and records it if it produces.
    pub fn set_dependencies(&mut self, uop: &mut DynamicMicroOp, lowest: u64) {
        self.clean(lowest);

        let live_membar = self.membar != INVALID_SEQNR && self.membar > lowest;
        if uop.uop.is_load() {
            let producer = self.find(uop.address);
            if producer != INVALID_SEQNR {
                uop.add_dependency(producer);
            }
            if live_membar {
                uop.add_dependency(self.membar);
            }
        } else if uop.uop.is_store() {
            let _ = self.producers.push(Producer {
                seq: uop.sequence_number(),
                address: uop.address,
            });
            if live_membar {
                uop.add_dependency(self.membar);
            }
        } else if uop.uop.mem_barrier {
            if live_membar {
                uop.add_dependency(self.membar);
            }
            self.membar = uop.sequence_number();
        }
    }

    /// Youngest in-flight store to `address`, or `INVALID_SEQNR`.
    pub fn find(&self, address: u64) -> u64 {
        self.producers
            .iter()
            .rev()
            .find(|p| p.address == address)
            .map_or(INVALID_SEQNR, |p| p.seq)
    }

    /// Current memory barrier, or `INVALID_SEQNR`.
    pub const fn membar(&self) -> u64 {
        self.membar
    }

    /// Number of tracked stores.
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Returns true when no store is tracked.
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    fn clean(&mut self, lowest: u64) {
        while self.producers.front().is_some_and(|p| p.seq < lowest) {
            let _ = self.producers.pop();
        }
    }

    /// Forgets every producer and the barrier.
    pub fn clear(&mut self) {
        self.producers.clear();
        self.membar = INVALID_SEQNR;
    }
}
