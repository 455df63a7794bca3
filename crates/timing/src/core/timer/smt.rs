//! Cooperative barrier between the hardware threads of one core.
//!
//! Every hardware thread is driven by its own host thread. They share one
//! engine behind a single lock and meet in a barrier before the engine may
//! advance:
//! 1. **Entry:** A thread with enough buffered micro-ops enters the barrier and parks.
//! 2. **Release:** Once every running thread is parked, threads that need more
//!    input are released; one of them is picked to drive the engine.
//! 3. **Relaxation:** If every thread has enough input, the one with the
//!    smallest surplus is released (the limit doubles until someone qualifies).
//!
//! The lock is held everywhere except while parked and around the clock-skew
//! client's `synchronize`.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::common::constants::SIMULATE_SURPLUS_THRESHOLD;
use crate::common::{CoreId, SmtThreadId, SubsecondTime, ThreadId, TimingError};
use crate::core::timer::{ClockSkewClient, SmtEngine, SmtThread};
use crate::uop::DynamicMicroOp;

struct SmtCore<E> {
    threads: Vec<SmtThread>,
    engine: E,
    in_sync: bool,
    enabled: bool,
    execute_thread: Option<SmtThreadId>,
}

impl<E: SmtEngine> SmtCore<E> {
    fn check(&self, thread: SmtThreadId) -> Result<(), TimingError> {
        if thread < self.threads.len() {
            Ok(())
        } else {
            Err(TimingError::UnknownThread(thread))
        }
    }

    fn find_by_thread(&self, app_thread: ThreadId) -> Option<SmtThreadId> {
        self.threads
            .iter()
            .position(|t| t.thread == Some(app_thread))
    }

    fn find_by_core(&self, core_id: CoreId) -> Option<SmtThreadId> {
        self.threads.iter().position(|t| t.core_id == core_id)
    }

    fn notify_active_change(&mut self) {
        let Self {
            threads, engine, ..
        } = self;
        engine.notify_num_active_threads_change(threads);
    }

    fn is_barrier_reached(&self) -> bool {
        // The driving thread gave up the lock to synchronise across cores.
        if self.in_sync {
            return false;
        }

        let mut any_in_barrier = false;
        for thread in &self.threads {
            if thread.running && !thread.in_barrier {
                return false;
            }
            any_in_barrier |= thread.in_barrier;
        }
        any_in_barrier
    }

    fn wake(&mut self, thread: SmtThreadId) {
        let slot = &mut self.threads[thread];
        slot.in_barrier = false;
        let _ = slot.cond.notify_one();
    }

    /// Releases threads that need input. Returns whether `caller` itself
    /// was selected; its flag is left for the caller to clear.
    fn barrier_release(&mut self, release_all: bool, caller: Option<SmtThreadId>) -> bool {
        let mut release_me = false;
        self.execute_thread = caller;

        let mut num_running = 0_usize;
        for t in 0..self.threads.len() {
            let slot = &self.threads[t];
            if !slot.in_barrier {
                if slot.running {
                    num_running += 1;
                }
                continue;
            }
            if self.engine.thread_has_enough_instructions(t) {
                continue;
            }
            if slot.running {
                num_running += 1;
            }

            if Some(t) == caller {
                release_me = true;
            } else {
                self.wake(t);
            }
            debug!(target: "smt_barrier", thread = t, "released: needs instructions");

            if !release_all {
                self.execute_thread = Some(t);
                break;
            }
        }

        // Everyone has enough input: release the thread with the fewest
        // surplus micro-ops so the engine keeps moving.
        let mut limit = 1_u64;
        while num_running == 0 {
            if !self
                .threads
                .iter()
                .any(|slot| slot.in_barrier && slot.running)
            {
                break;
            }

            for t in 0..self.threads.len() {
                let slot = &self.threads[t];
                if !(slot.in_barrier
                    && slot.running
                    && self.engine.thread_num_surplus_instructions(t) < limit)
                {
                    continue;
                }

                num_running += 1;
                if Some(t) == caller {
                    release_me = true;
                } else {
                    self.wake(t);
                }
                debug!(target: "smt_barrier", thread = t, limit, "released: smallest surplus");

                if !release_all {
                    self.execute_thread = Some(t);
                    break;
                }
            }

            limit = limit.saturating_mul(2);
        }

        release_me
    }

    fn signal_barrier(&mut self) {
        if self.is_barrier_reached() {
            let _ = self.barrier_release(false, None);
        }
    }

    fn state_string(&self) -> String {
        self.threads.iter().map(SmtThread::state_char).collect()
    }
}

/// Engine shared by the hardware threads of one physical core.
///
/// Host threads hold it through an `Arc` and call [`simulate`](Self::simulate)
/// after pushing micro-ops. Exactly one of them drives the engine per round.
pub struct SmtTimer<E: SmtEngine> {
    core: Mutex<SmtCore<E>>,
}

impl<E: SmtEngine> SmtTimer<E> {
    /// Timer around `engine` with no threads.
    pub const fn new(engine: E) -> Self {
        Self {
            core: Mutex::new(SmtCore {
                threads: Vec::new(),
                engine,
                in_sync: false,
                enabled: true,
                execute_thread: None,
            }),
        }
    }

    /// Adds a hardware thread slot for `core_id` and returns its index.
    pub fn register_thread(
        &self,
        core_id: CoreId,
        client: Option<Arc<dyn ClockSkewClient>>,
        context: E::ThreadContext,
    ) -> SmtThreadId {
        let mut core = self.core.lock();
        let thread = core.threads.len();
        let mut slot = SmtThread::new(core_id);
        slot.client = client;
        core.threads.push(slot);
        core.engine.initialize_thread(thread, context);
        core.notify_active_change();
        debug!(target: "smt_barrier", core_id, thread, "registered");
        thread
    }

    /// Number of registered slots.
    pub fn num_threads(&self) -> usize {
        self.core.lock().threads.len()
    }

    /// Slot serving `core_id`.
    pub fn thread_for_core(&self, core_id: CoreId) -> Option<SmtThreadId> {
        self.core.lock().find_by_core(core_id)
    }

    fn barrier(core: &mut MutexGuard<'_, SmtCore<E>>, thread: SmtThreadId) -> bool {
        if !core.enabled {
            return false;
        }

        core.threads[thread].in_barrier = true;
        debug!(
            target: "smt_barrier",
            core_id = core.threads[thread].core_id,
            thread,
            state = %core.state_string(),
            "entry"
        );

        if core.is_barrier_reached() && core.barrier_release(false, Some(thread)) {
            core.threads[thread].in_barrier = false;
        }

        let cond = Arc::clone(&core.threads[thread].cond);
        while core.threads[thread].in_barrier {
            cond.wait(core);
        }

        let execute = core.enabled && core.execute_thread == Some(thread);
        debug!(
            target: "smt_barrier",
            core_id = core.threads[thread].core_id,
            thread,
            execute,
            "exit"
        );
        execute
    }

    fn drive(core: &mut MutexGuard<'_, SmtCore<E>>, thread: SmtThreadId) {
        {
            let SmtCore {
                threads, engine, ..
            } = &mut **core;
            engine.execute(threads);
        }
        core.execute_thread = None;

        if let Some(client) = core.threads[thread].client.clone() {
            core.in_sync = true;
            MutexGuard::unlocked(core, || client.synchronize());
            core.in_sync = false;
        }

        let _ = core.barrier_release(true, Some(thread));
    }

    /// Hands micro-ops of `thread` to the engine.
    ///
    /// Returns the instructions completed and the time elapsed for this
    /// thread since its previous call. A disabled timer drops the micro-ops.
    pub fn push_instructions(
        &self,
        thread: SmtThreadId,
        uops: Vec<DynamicMicroOp>,
    ) -> Result<(u64, SubsecondTime), TimingError> {
        let mut core = self.core.lock();
        core.check(thread)?;
        // Nothing executes while disabled, so buffered micro-ops would never drain.
        if core.enabled {
            core.engine.push_instructions(thread, uops);
        }
        let in_wakeup = core.threads[thread].in_wakeup;
        Ok(core.engine.return_latency(thread, in_wakeup))
    }

    /// Lets the engine advance once `thread` has buffered enough micro-ops.
    ///
    /// Below the surplus threshold this returns immediately. Otherwise the
    /// thread enters the barrier and, if selected, drives the engine.
    pub fn simulate(&self, thread: SmtThreadId) -> Result<(), TimingError> {
        let mut core = self.core.lock();
        core.check(thread)?;

        if core.engine.thread_num_surplus_instructions(thread) > SIMULATE_SURPLUS_THRESHOLD
            && Self::barrier(&mut core, thread)
        {
            Self::drive(&mut core, thread);
        }
        Ok(())
    }

    /// Drains `thread` after its last push, then marks it exited.
    ///
    /// The slot must be running for the drain to make progress; a disabled
    /// timer skips the drain.
    pub fn finish(&self, thread: SmtThreadId) -> Result<(), TimingError> {
        let mut core = self.core.lock();
        core.check(thread)?;
        core.engine.mark_end_of_stream(thread);

        while core.enabled && core.threads[thread].running && !core.engine.is_drained(thread) {
            if Self::barrier(&mut core, thread) {
                Self::drive(&mut core, thread);
            }
        }

        core.threads[thread].running = false;
        core.notify_active_change();
        core.signal_barrier();
        debug!(target: "smt_barrier", thread, "finished");
        Ok(())
    }

    /// Instructions and latency not yet reported to `thread`.
    pub fn return_latency(&self, thread: SmtThreadId) -> Result<(u64, SubsecondTime), TimingError> {
        let mut core = self.core.lock();
        core.check(thread)?;
        let in_wakeup = core.threads[thread].in_wakeup;
        Ok(core.engine.return_latency(thread, in_wakeup))
    }

    /// Moves `thread` to `time` and ends its wake-up window.
    pub fn synchronize(&self, thread: SmtThreadId, time: SubsecondTime) -> Result<(), TimingError> {
        let mut core = self.core.lock();
        core.check(thread)?;
        core.threads[thread].in_wakeup = false;
        core.engine.synchronize(thread, time);
        Ok(())
    }

    /// Start of the region of interest: every thread jumps to `global_time`.
    pub fn roi_begin(&self, global_time: SubsecondTime) {
        let mut core = self.core.lock();
        for thread in 0..core.threads.len() {
            core.threads[thread].in_wakeup = false;
            core.engine.synchronize(thread, global_time);
        }
    }

    /// Binds `app_thread` to the slot of `core_id` without changing its run state.
    pub fn bind_thread(&self, core_id: CoreId, app_thread: ThreadId) -> Option<SmtThreadId> {
        let mut core = self.core.lock();
        let slot = core.find_by_core(core_id)?;
        core.threads[slot].thread = Some(app_thread);
        Some(slot)
    }

    /// `app_thread` started running.
    pub fn thread_start(&self, app_thread: ThreadId) {
        let mut core = self.core.lock();
        if let Some(slot) = core.find_by_thread(app_thread) {
            core.threads[slot].running = true;
            core.notify_active_change();
            debug!(target: "smt_barrier", app_thread, slot, "thread start");
        }
    }

    /// `app_thread` exited.
    pub fn thread_exit(&self, app_thread: ThreadId) {
        let mut core = self.core.lock();
        if let Some(slot) = core.find_by_thread(app_thread) {
            core.threads[slot].running = false;
            core.notify_active_change();
            debug!(target: "smt_barrier", app_thread, slot, "thread exit");
        }
        // Someone may have been waiting for this thread.
        core.signal_barrier();
    }

    /// `app_thread` blocked.
    pub fn thread_stall(&self, app_thread: ThreadId) {
        let mut core = self.core.lock();
        if let Some(slot) = core.find_by_thread(app_thread) {
            core.threads[slot].running = false;
            core.notify_active_change();
            debug!(target: "smt_barrier", app_thread, slot, "thread stall");
        }
        core.signal_barrier();
    }

    /// `app_thread` woke up. Its latency stays hidden until it synchronises.
    pub fn thread_resume(&self, app_thread: ThreadId) {
        let mut core = self.core.lock();
        if let Some(slot) = core.find_by_thread(app_thread) {
            core.threads[slot].in_wakeup = true;
            core.threads[slot].running = true;
            core.notify_active_change();
            debug!(target: "smt_barrier", app_thread, slot, "thread resume");
        }
        core.signal_barrier();
    }

    /// `app_thread` moved to `new_core`.
    ///
    /// Its old slot is emptied (and released if parked). If `new_core` is
    /// served by this timer, that slot now runs the thread.
    pub fn thread_migrate(&self, app_thread: ThreadId, new_core: CoreId) {
        let mut core = self.core.lock();
        if let Some(slot) = core.find_by_thread(app_thread) {
            core.threads[slot].running = false;
            core.threads[slot].thread = None;
            core.notify_active_change();
            if core.threads[slot].in_barrier {
                core.wake(slot);
            }
        }

        if let Some(slot) = core.find_by_core(new_core) {
            let target = &mut core.threads[slot];
            target.in_wakeup = true;
            target.running = true;
            target.thread = Some(app_thread);
            core.notify_active_change();
            debug!(target: "smt_barrier", app_thread, new_core, slot, "thread migrate");
        }
        core.signal_barrier();
    }

    /// Re-enables the barrier.
    pub fn enable(&self) {
        self.core.lock().enabled = true;
    }

    /// Disables the barrier and releases every parked thread without
    /// running the engine.
    pub fn disable(&self) {
        let mut core = self.core.lock();
        core.enabled = false;
        for thread in 0..core.threads.len() {
            if core.threads[thread].in_barrier {
                core.wake(thread);
            }
        }
    }

    /// The barrier is active.
    pub fn is_enabled(&self) -> bool {
        self.core.lock().enabled
    }

    /// One character per slot: `B` running in barrier, `R` running,
    /// `b` parked but not running, `_` neither.
    pub fn state_string(&self) -> String {
        self.core.lock().state_string()
    }

    /// Runs `f` on the engine under the core lock.
    pub fn with_engine<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.core.lock().engine)
    }
}

impl<E: SmtEngine> fmt::Debug for SmtTimer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.lock();
        f.debug_struct("SmtTimer")
            .field("threads", &core.threads)
            .field("enabled", &core.enabled)
            .field("execute_thread", &core.execute_thread)
            .finish_non_exhaustive()
    }
}
