//! Shared per-core timing engines.
//!
//! Hardware threads of one physical core feed a single engine. This module provides:
//! 1. **`SmtEngine`:** The interface a shared engine exposes to the scheduler.
//! 2. **`SmtTimer`:** The cooperative barrier that decides which host thread drives the engine.
//! 3. **`rob`:** The out-of-order ROB engine.

/// Out-of-order ROB engine.
pub mod rob;

/// Cooperative SMT barrier.
pub mod smt;

use std::fmt;
use std::sync::Arc;

use parking_lot::Condvar;

use crate::common::{CoreId, SmtThreadId, SubsecondTime, ThreadId};
use crate::uop::DynamicMicroOp;

pub use self::rob::RobSmtTimer;
pub use self::smt::SmtTimer;

/// Cross-core time synchronisation hook.
///
/// Called by the thread that just drove the engine, with the core lock
/// released. Implementations may block.
pub trait ClockSkewClient: Send + Sync {
    /// Waits until the other cores have caught up.
    fn synchronize(&self);
}

/// Scheduling state of one hardware thread slot.
pub struct SmtThread {
    /// Simulated core this slot belongs to.
    pub core_id: CoreId,
    /// Application thread bound to the slot.
    pub thread: Option<ThreadId>,
    /// The bound thread is runnable.
    pub running: bool,
    /// The slot waits in the barrier.
    pub in_barrier: bool,
    /// Woken up but not yet synchronised; no latency is reported.
    pub in_wakeup: bool,
    pub(crate) cond: Arc<Condvar>,
    pub(crate) client: Option<Arc<dyn ClockSkewClient>>,
}

impl SmtThread {
    /// Idle slot of `core_id`.
    pub fn new(core_id: CoreId) -> Self {
        Self {
            core_id,
            thread: None,
            running: false,
            in_barrier: false,
            in_wakeup: false,
            cond: Arc::new(Condvar::new()),
            client: None,
        }
    }

    /// Slot that is already running `thread`.
    #[must_use]
    pub fn running(mut self, thread: ThreadId) -> Self {
        self.thread = Some(thread);
        self.running = true;
        self
    }

    /// Barrier state character: `B`, `R`, `b` or `_`.
    pub const fn state_char(&self) -> char {
        match (self.running, self.in_barrier) {
            (true, true) => 'B',
            (true, false) => 'R',
            (false, true) => 'b',
            (false, false) => '_',
        }
    }
}

impl fmt::Debug for SmtThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtThread")
            .field("core_id", &self.core_id)
            .field("thread", &self.thread)
            .field("running", &self.running)
            .field("in_barrier", &self.in_barrier)
            .field("in_wakeup", &self.in_wakeup)
            .field("clock_skew_client", &self.client.is_some())
            .finish()
    }
}

/// Timing engine shared by the hardware threads of one core.
///
/// Every method runs with the core lock held. Thread indices are the slot
/// numbers handed out by [`SmtTimer::register_thread`].
pub trait SmtEngine: Send {
    /// Per-thread collaborators (memory hierarchy, predictor).
    type ThreadContext;

    /// Creates the engine state of slot `thread`; slots are added in order.
    fn initialize_thread(&mut self, thread: SmtThreadId, context: Self::ThreadContext);

    /// Buffered micro-ops not yet consumed.
    fn thread_num_surplus_instructions(&self, thread: SmtThreadId) -> u64;

    /// The thread need not supply more micro-ops right now.
    fn thread_has_enough_instructions(&self, thread: SmtThreadId) -> bool;

    /// The set of running threads changed.
    fn notify_num_active_threads_change(&mut self, threads: &[SmtThread]);

    /// Appends micro-ops to the thread's buffer.
    fn push_instructions(&mut self, thread: SmtThreadId, uops: Vec<DynamicMicroOp>);

    /// Instructions completed and time elapsed since the previous call.
    fn return_latency(&mut self, thread: SmtThreadId, in_wakeup: bool) -> (u64, SubsecondTime);

    /// Advances the engine for as long as every thread has enough input.
    fn execute(&mut self, threads: &[SmtThread]);

    /// Moves the thread's local time to `time`.
    fn synchronize(&mut self, thread: SmtThreadId, time: SubsecondTime);

    /// No further micro-ops will be pushed for the thread.
    fn mark_end_of_stream(&mut self, thread: SmtThreadId);

    /// Everything pushed for the thread has completed.
    fn is_drained(&self, thread: SmtThreadId) -> bool;
}
