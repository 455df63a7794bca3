//! Hardware structures shared by the timing models.
//!
//! This module contains the building blocks the ROB timer and the IOCOOM
//! model are assembled from: bounded queues, contention models, dependency
//! tables, the branch predictor and the memory hierarchy.

/// Branch predictors and BTB.
pub mod bru;

/// Set-associative cache tag store with replacement policies.
pub mod cache;

/// Occupancy model for pools of identical units.
pub mod contention;

/// Register and memory producer tables.
pub mod deps;

/// Memory hierarchy interface and implementations.
pub mod memory;

/// Fixed-capacity ring buffer.
pub mod queue;
