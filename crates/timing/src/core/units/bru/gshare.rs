//! GShare predictor.
//!
//! A table of two-bit saturating counters indexed by the instruction pointer
//! XOR the global history of recent branch outcomes.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `predict_branch()`: O(1)
//!   - `update_branch()`: O(1)
//! - **Space Complexity:** O(2^N) counters for N history bits (4096 here)
//! - **Best Case:** Branches whose outcome follows the recent history
//! - **Worst Case:** Unrelated branches aliasing into the same counters

use super::{BranchPredictor, btb::Btb};

const HISTORY_BITS: usize = 12;
const PHT_SIZE: usize = 1 << HISTORY_BITS;
const PHT_MASK: u64 = (PHT_SIZE as u64) - 1;

/// Global-history predictor with a BTB for targets.
#[derive(Debug)]
pub struct GSharePredictor {
    history: u64,
    counters: Vec<u8>,
    btb: Btb,
}

impl GSharePredictor {
    /// Creates a predictor with weakly not-taken counters.
    ///
    /// # Arguments
    ///
    /// * `btb_size` - Entries in the target buffer (rounded up to a power of two).
    pub fn new(btb_size: usize) -> Self {
        Self {
            history: 0,
            counters: vec![1; PHT_SIZE],
            btb: Btb::new(btb_size),
        }
    }

    #[inline(always)]
    const fn index(&self, ip: u64) -> usize {
        ((ip ^ self.history) & PHT_MASK) as usize
    }
}

impl BranchPredictor for GSharePredictor {
    /// Taken when the counter is 2 or 3; the target comes from the BTB.
    fn predict_branch(&self, ip: u64) -> (bool, Option<u64>) {
        if self.counters[self.index(ip)] >= 2 {
            (true, self.btb.lookup(ip))
        } else {
            (false, None)
        }
    }

    /// Trains the counter, shifts the outcome into the history and records
    /// taken targets.
    fn update_branch(&mut self, ip: u64, taken: bool, target: Option<u64>) {
        let idx = self.index(ip);
        let counter = &mut self.counters[idx];
        if taken {
            *counter = (*counter + 1).min(3);
        } else {
            *counter = counter.saturating_sub(1);
        }
        self.history = ((self.history << 1) | u64::from(taken)) & PHT_MASK;

        if let Some(target) = target {
            self.btb.update(ip, target);
        }
    }

    fn predict_btb(&self, ip: u64) -> Option<u64> {
        self.btb.lookup(ip)
    }
}
