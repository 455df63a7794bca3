//! First-in, first-out replacement.
//!
//! A round-robin pointer per set. Hits do not move it; a fill of the way it
//! points at advances it.
//!
//! # Performance
//!
//! - **Time Complexity:** O(1) for every operation
//! - **Space Complexity:** O(S) where S is the number of sets
//! - **Worst Case:** Hot lines are evicted on schedule regardless of reuse

use super::ReplacementPolicy;

/// FIFO state.
#[derive(Debug)]
pub struct FifoPolicy {
    next: Vec<usize>,
    ways: usize,
}

impl FifoPolicy {
    /// State for `sets` sets of `ways` ways, every pointer at way 0.
    ///
    /// # Arguments
    ///
    /// * `sets` - Number of sets in the cache.
    /// * `ways` - Associativity; zero is treated as one.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            next: vec![0; sets],
            ways: ways.max(1),
        }
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn touch(&mut self, _set: usize, _way: usize) {}

    fn fill(&mut self, set: usize, way: usize) {
        if self.next[set] == way {
            self.next[set] = (way + 1) % self.ways;
        }
    }

    fn victim(&mut self, set: usize) -> usize {
        self.next[set]
    }
}
