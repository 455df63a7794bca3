//! Error definitions.
//!
//! This module defines the recoverable error surface of the timing core. It provides:
//! 1. **Timing errors:** API misuse detected while handling an instruction (wrong dynamic info, unknown thread).
//! 2. **Configuration errors:** I/O, JSON and validation failures while loading a `Config`.
//!
//! Structural stalls are not errors (they show up in the CPI stack) and internal
//! invariant violations panic with a diagnostic.

use thiserror::Error;

use crate::uop::instruction::DynamicInstructionInfoKind;

/// Errors raised by the performance models.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimingError {
    /// The queued dynamic information does not match the operand being timed.
    #[error("expected {expected:?} dynamic info for instruction at {address:#x}, got {found:?}")]
    DynamicInfoMismatch {
        /// Instruction address.
        address: u64,
        /// Kind required by the operand.
        expected: DynamicInstructionInfoKind,
        /// Kind found at the head of the queue.
        found: DynamicInstructionInfoKind,
    },

    /// A register operand falls outside the scoreboard.
    #[error("register {register} out of range (scoreboard holds {capacity} registers)")]
    RegisterOutOfRange {
        /// Offending register id.
        register: u32,
        /// Scoreboard size.
        capacity: usize,
    },

    /// No hardware thread is registered under this id.
    #[error("unknown SMT thread {0}")]
    UnknownThread(usize),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid JSON for the schema.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value the timing models cannot run with.
    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },
}
