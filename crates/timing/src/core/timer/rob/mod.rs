//! Out-of-order ROB timing engine.
//!
//! Micro-ops are pushed into a per-thread pre-ROB buffer, dispatched into the
//! window in order, issued out of order once their producers are done, and
//! committed in order. The engine is driven one cycle at a time by
//! [`RobSmtTimer`], which several hardware threads share through
//! [`SmtTimer`](crate::core::timer::SmtTimer).

/// Cycle loop: dispatch, issue and commit.
pub mod engine;

/// Reorder buffer slot.
pub mod entry;

/// Per-thread ROB state and collaborators.
pub mod thread;

pub use self::engine::RobSmtTimer;
pub use self::entry::RobEntry;
pub use self::thread::{RobThread, RobThreadContext};
