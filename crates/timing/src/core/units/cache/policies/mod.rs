//! Victim selection for set-associative caches.

/// First-in, first-out.
pub mod fifo;

/// Least recently used.
pub mod lru;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;

/// Replacement state of every set in a cache.
pub trait ReplacementPolicy: Send + std::fmt::Debug {
    /// Records a hit on `way` in `set`.
    fn touch(&mut self, set: usize, way: usize);

    /// Records that `way` in `set` was refilled.
    fn fill(&mut self, set: usize, way: usize);

    /// Way to evict next from `set`.
    fn victim(&mut self, set: usize) -> usize;
}
