//! # Unit Tests
//!
//! Component and scenario tests for the timing core.

/// Configuration defaults, JSON loading and validation.
pub mod config;

/// Register and memory dependency tables.
pub mod deps;

/// Performance models end to end.
pub mod models;

/// Circular queue and contention model.
pub mod queue;

/// ROB timer scenarios.
pub mod rob;

/// SMT barrier with real host threads.
pub mod smt;
