//! Core timing library for an x86 multicore simulator.
//!
//! This crate turns a stream of executed instructions into simulated time with the following:
//! 1. **Front-end data model:** Instructions, micro-ops, dynamic memory information and hit locations.
//! 2. **ROB timer:** A cycle-level out-of-order engine with dispatch, issue and commit stages,
//!    shared by the hardware threads of one core.
//! 3. **SMT barrier:** Cooperative scheduling of the host threads that drive a shared engine.
//! 4. **Performance models:** Simple, magic, IOCOOM and ROB models behind one enum.
//! 5. **Statistics:** CPI stacks, MLP counters and per-thread reports.

/// Common types (time base, constants, errors, bounded lists).
pub mod common;
/// Timing configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Performance models, the shared engines and their hardware units.
pub mod core;
/// CPI stacks and per-thread counters.
pub mod stats;
/// Instructions, micro-ops and decoding.
pub mod uop;

/// Root configuration type; use `Config::default()` or load it from JSON.
pub use crate::config::Config;
/// Per-core performance model; build one with `PerformanceModel::create`.
pub use crate::core::PerformanceModel;
/// Out-of-order engine shared by the hardware threads of one core.
pub use crate::core::timer::RobSmtTimer;
/// Cooperative barrier around a shared engine.
pub use crate::core::timer::SmtTimer;
