//! Fixed-capacity inline list of sequence numbers.
//!
//! Models hardware tables with a hard entry limit (dependency slots, wake-up
//! lists). Exceeding the capacity is an invariant violation and panics.

use std::fmt;

/// Inline list of at most `N` sequence numbers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BoundedSeqList<const N: usize> {
    items: [u64; N],
    len: usize,
}

impl<const N: usize> BoundedSeqList<N> {
    /// Empty list.
    pub const fn new() -> Self {
        Self {
            items: [0; N],
            len: 0,
        }
    }

    /// Capacity of the list.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of stored entries.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true when nothing is stored.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true when no further entry fits.
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Appends `seq`.
    ///
    /// # Panics
    ///
    /// Panics when the list already holds `N` entries; `what` names the table
    /// in the diagnostic.
    pub fn push(&mut self, seq: u64, what: &str) {
        assert!(
            self.len < N,
            "{what} overflow: more than {N} entries (adding {seq})"
        );
        self.items[self.len] = seq;
        self.len += 1;
    }

    /// Returns true if `seq` is stored.
    pub fn contains(&self, seq: u64) -> bool {
        self.as_slice().contains(&seq)
    }

    /// Removes the first occurrence of `seq`, preserving order. Returns
    /// whether anything was removed.
    pub fn remove(&mut self, seq: u64) -> bool {
        match self.as_slice().iter().position(|&s| s == seq) {
            Some(pos) => {
                self.items.copy_within(pos + 1..self.len, pos);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Stored entries in insertion order.
    #[inline(always)]
    pub fn as_slice(&self) -> &[u64] {
        &self.items[..self.len]
    }

    /// Entry at `idx`, if any.
    pub fn get(&self, idx: usize) -> Option<u64> {
        self.as_slice().get(idx).copied()
    }

    /// Iterates over the stored entries.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.as_slice().iter().copied()
    }
}

impl<const N: usize> Default for BoundedSeqList<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for BoundedSeqList<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
