//! Common types shared by every timing model.
//!
//! This module provides the fundamental building blocks of the timing core. It includes:
//! 1. **Time:** Femtosecond timestamps, clock periods and per-domain clocks.
//! 2. **Constants:** Sentinels and compile-time capacity bounds.
//! 3. **Error Handling:** Recoverable timing and configuration errors.

/// Fixed-capacity inline sequence-number lists.
pub mod bounded;

/// Timing-core constants (sentinels, capacities, thresholds).
pub mod constants;

/// Error types for the performance models and configuration.
pub mod error;

/// Simulated time base.
pub mod time;

pub use bounded::BoundedSeqList;
pub use constants::{INVALID_REG, INVALID_SEQNR};
pub use error::{ConfigError, TimingError};
pub use time::{ComponentPeriod, ComponentTime, SubsecondTime};

/// Identifier of a simulated core.
pub type CoreId = usize;

/// Identifier of an application thread.
pub type ThreadId = u64;

/// Index of a hardware thread slot inside one SMT core.
pub type SmtThreadId = usize;
