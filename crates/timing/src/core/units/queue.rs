//! Fixed-capacity FIFO ring.
//!
//! Backs the per-thread ROB (dispatched entries followed by the pre-ROB
//! buffer) and the in-flight store list of the memory dependency table.
//! Indexing is relative to the oldest entry. Pushing into a full queue is an
//! invariant violation.

use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

/// Ring buffer with a hard capacity.
#[derive(Clone, Debug)]
pub struct CircularQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> CircularQueue<T> {
    /// Creates an empty queue holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of entries.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when the queue holds nothing.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true when no further entry fits.
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Appends `item` and returns a reference to it.
    ///
    /// # Panics
    ///
    /// Panics when the queue is full.
    pub fn push(&mut self, item: T) -> &mut T {
        assert!(
            !self.is_full(),
            "circular queue overflow: capacity {} exhausted",
            self.capacity
        );
        self.items.push_back(item);
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Removes and returns the oldest entry.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Oldest entry.
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Oldest entry, mutably.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.items.front_mut()
    }

    /// Youngest entry.
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    /// Entry `idx` positions after the oldest.
    pub fn at(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    /// Entry `idx` positions after the oldest, mutably.
    pub fn at_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.items.get_mut(idx)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Oldest-to-youngest iterator.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.items.iter()
    }

    /// Oldest-to-youngest mutable iterator.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> + '_ {
        self.items.iter_mut()
    }

    /// Keeps only the entries matching `keep`, preserving order.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
    }
}

impl<T> Index<usize> for CircularQueue<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        &self.items[idx]
    }
}

impl<T> IndexMut<usize> for CircularQueue<T> {
    fn index_mut(&mut self, idx: usize) -> &mut T {
        &mut self.items[idx]
    }
}
