//! Producer tracking for dependency formation at dispatch.
//!
//! Both tables map a resource (a register, or a memory address) to the
//! sequence number of its youngest in-flight producer. Entries older than
//! the lowest sequence number still in the ROB are stale and ignored.

/// Store and memory-barrier producers.
pub mod memory;

/// Register producers.
pub mod register;

pub use memory::MemoryDependencies;
pub use register::RegisterDependencies;
