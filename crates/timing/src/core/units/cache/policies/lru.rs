//! Least recently used replacement.
//!
//! Each set keeps a recency stack: most recently used way first, victim last.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `touch()` / `fill()`: O(W) where W is the associativity
//!   - `victim()`: O(1)
//! - **Space Complexity:** O(S × W) where S is the number of sets
//! - **Worst Case:** Scans larger than the cache evict every line before reuse

use super::ReplacementPolicy;

/// LRU state.
#[derive(Debug)]
pub struct LruPolicy {
    stacks: Vec<Vec<usize>>,
}

impl LruPolicy {
    /// State for `sets` sets of `ways` ways, way 0 most recent.
    ///
    /// # Arguments
    ///
    /// * `sets` - Number of sets in the cache.
    /// * `ways` - Associativity of each set.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            stacks: (0..sets).map(|_| (0..ways).collect()).collect(),
        }
    }
}

impl ReplacementPolicy for LruPolicy {
    /// Moves `way` to the top of its set's stack.
    fn touch(&mut self, set: usize, way: usize) {
        let stack = &mut self.stacks[set];
        if let Some(pos) = stack.iter().position(|&w| w == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }

    fn fill(&mut self, set: usize, way: usize) {
        self.touch(set, way);
    }

    fn victim(&mut self, set: usize) -> usize {
        self.stacks[set].last().copied().unwrap_or(0)
    }
}
