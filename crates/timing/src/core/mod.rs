//! Timing models and the structures they are built from.
//!
//! This module contains the per-core performance models, the shared SMT
//! engines that back the out-of-order model, and the hardware units both
//! are assembled from.

/// Per-core performance models (simple, magic, IOCOOM, ROB).
pub mod model;

/// Shared per-core engines and the SMT barrier.
pub mod timer;

/// Queues, dependency tables, branch predictors and the memory hierarchy.
pub mod units;

pub use self::model::PerformanceModel;
