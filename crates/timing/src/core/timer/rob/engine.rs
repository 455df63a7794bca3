//! Cycle loop of the ROB timer.
//!
//! Each simulated cycle runs three stages over every hardware thread:
//! 1. **Dispatch:** Moves micro-ops from the pre-ROB buffer into the window,
//!    forming dependencies, and charges the cycle to one CPI component per thread.
//! 2. **Issue:** Starts ready micro-ops, resolves memory latency and wakes consumers.
//! 3. **Commit:** Retires finished micro-ops in program order and flushes the
//!    window behind a mispredicted branch.
//!
//! With a single hardware thread, cycles in which nothing can happen are
//! skipped in one step.

use tracing::{debug, trace, warn};

use crate::common::constants::MAX_OUTSTANDING;
use crate::common::{ComponentPeriod, ComponentTime, SmtThreadId, SubsecondTime};
use crate::config::Config;
use crate::core::timer::rob::entry::RobEntry;
use crate::core::timer::rob::thread::{OutstandingLoad, RobThread, RobThreadContext};
use crate::core::timer::{SmtEngine, SmtThread};
use crate::core::units::contention::ContentionModel;
use crate::core::units::memory::MemoryAccess;
use crate::stats::{CommitRecord, CpiComponent, ThreadReport, TimerReport};
use crate::uop::{DynamicMicroOp, HitWhere};

/// Bytes fetched per instruction-cache lookup.
const FETCH_BYTES: u32 = 4;

/// Micro-ops after which the x87 share is checked.
const X87_WARN_MIN_UOPS: u64 = 10_000;

/// Out-of-order timing engine shared by the hardware threads of one core.
///
/// Threads share the window (repartitioned among running threads), the
/// reservation stations and the load/store queues.
pub struct RobSmtTimer {
    dispatch_width: usize,
    commit_width: usize,
    window_size: usize,
    current_window_size: usize,
    configured_threads: usize,
    rs_entries: usize,
    rs_entries_used: usize,
    misprediction_penalty: u64,
    store_to_load_forwarding: bool,
    no_address_disambiguation: bool,
    in_order: bool,
    window_repartition: bool,
    simultaneous_issue: bool,
    long_latency_cutoff: u64,
    mlp_histogram: bool,
    commit_log: bool,

    threads: Vec<RobThread>,
    dispatch_thread: usize,
    issue_thread: usize,
    now: ComponentTime,
    last_store_done: SubsecondTime,
    load_queue: ContentionModel,
    store_queue: ContentionModel,
    time_skipped: SubsecondTime,
    serializations: u64,
    mfences: u64,
}

impl RobSmtTimer {
    /// Engine for one physical core described by `config`.
    pub fn new(config: &Config) -> Self {
        let core = &config.core;
        let rob = &config.rob_timer;
        let configured_threads = core.smt_threads.max(1);
        Self {
            dispatch_width: core.dispatch_width.max(1),
            commit_width: rob.commit_width.max(1),
            window_size: core.window_size,
            current_window_size: (core.window_size / configured_threads).max(1),
            configured_threads,
            rs_entries: rob.rs_entries,
            rs_entries_used: 0,
            misprediction_penalty: config.branch_predictor.mispredict_penalty,
            store_to_load_forwarding: rob.store_to_load_forwarding,
            no_address_disambiguation: !rob.address_disambiguation,
            in_order: rob.in_order,
            window_repartition: rob.rob_repartition,
            simultaneous_issue: rob.simultaneous_issue,
            long_latency_cutoff: core.long_latency_cutoff,
            mlp_histogram: rob.mlp_histogram,
            commit_log: rob.commit_log,
            threads: Vec::new(),
            dispatch_thread: 0,
            issue_thread: 0,
            now: ComponentTime::new(ComponentPeriod::from_ghz(core.frequency_ghz)),
            last_store_done: SubsecondTime::ZERO,
            load_queue: ContentionModel::new(rob.outstanding_loads),
            store_queue: ContentionModel::new(rob.outstanding_stores),
            time_skipped: SubsecondTime::ZERO,
            serializations: 0,
            mfences: 0,
        }
    }

    /// Core time.
    pub const fn now(&self) -> SubsecondTime {
        self.now.elapsed()
    }

    /// Core clock period.
    pub const fn period(&self) -> SubsecondTime {
        self.now.period()
    }

    /// Window entries available to each thread.
    pub const fn current_window_size(&self) -> usize {
        self.current_window_size
    }

    /// Hardware threads initialised so far.
    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }

    /// State of hardware thread `thread`.
    pub fn thread(&self, thread: SmtThreadId) -> Option<&RobThread> {
        self.threads.get(thread)
    }

    /// Reservation station entries in use.
    pub const fn rs_entries_used(&self) -> usize {
        self.rs_entries_used
    }

    /// Snapshot of every thread's counters.
    pub fn report(&self) -> TimerReport {
        TimerReport {
            period: self.period(),
            threads: self
                .threads
                .iter()
                .enumerate()
                .map(|(i, t)| ThreadReport {
                    thread: i,
                    instructions: t.instrs,
                    elapsed: t.now,
                    stats: t.stats.clone(),
                })
                .collect(),
            time_skipped: self.time_skipped,
            load_queue: *self.load_queue.stats(),
            store_queue: *self.store_queue.stats(),
            serializations: self.serializations,
            mfences: self.mfences,
        }
    }

    fn compute_current_window_size(&mut self, threads: &[SmtThread]) {
        let divisor = if self.window_repartition {
            threads.iter().filter(|t| t.running).count().max(1)
        } else {
            self.configured_threads
        };
        self.current_window_size = (self.window_size / divisor).max(1);
    }

    fn set_store_address_producers(thread: &mut RobThread, idx: usize, lowest: u64) {
        for i in 0..thread.rob[idx].uop.uop.address_registers.len() {
            let reg = thread.rob[idx].uop.uop.address_registers[i];
            let producer = thread.register_dependencies.peek_producer(reg, lowest);
            if producer == crate::common::INVALID_SEQNR {
                continue;
            }
            let producer_entry = thread.entry(producer);
            if producer_entry.is_done() {
                let done = producer_entry.done;
                let entry = &mut thread.rob[idx];
                entry.address_ready_max = entry.address_ready_max.max(done);
            } else {
                thread.rob[idx].add_address_producer(producer);
            }
        }

        let entry = &mut thread.rob[idx];
        if entry.address_producers().is_empty() {
            entry.address_ready = entry.address_ready_max;
        }
    }

    /// Links the entry at ring position `idx` to its in-flight producers.
    fn set_dependencies(thread: &mut RobThread, idx: usize, store_to_load_forwarding: bool) {
        let seq = thread.rob[idx].sequence_number();
        let lowest = thread.front_sequence_number().unwrap_or(seq);

        if thread.rob[idx].uop.uop.is_store() {
            Self::set_store_address_producers(thread, idx, lowest);
        }

        {
            let RobThread {
                rob,
                register_dependencies,
                memory_dependencies,
                ..
            } = thread;
            register_dependencies.set_dependencies(&mut rob[idx].uop, lowest);
            memory_dependencies.set_dependencies(&mut rob[idx].uop, lowest);
        }

        // A load fed by an in-flight store takes the store's data producers
        // instead; the store itself only executes at the ROB head.
        if store_to_load_forwarding && thread.rob[idx].uop.uop.is_load() {
            for producer in thread.rob[idx].uop.dependency_list().iter() {
                if producer < lowest {
                    continue;
                }
                let store = thread.entry(producer);
                if !store.uop.uop.is_store() {
                    continue;
                }
                let store_deps = store.uop.dependency_list();
                let store_ready_max = store.ready_max;
                let entry = &mut thread.rob[idx];
                entry.uop.remove_dependency(producer);
                entry.ready_max = entry.ready_max.max(store_ready_max);
                for dep in store_deps.iter() {
                    entry.uop.add_dependency(dep);
                }
                break;
            }
        }

        let mut min_distance: Option<u64> = None;
        for producer in thread.rob[idx].uop.dependency_list().iter() {
            if producer < lowest {
                thread.rob[idx].uop.remove_dependency(producer);
                continue;
            }

            let position = thread.position(producer);
            let distance = seq - producer;
            min_distance = Some(min_distance.map_or(distance, |d| d.min(distance)));

            if thread.rob[position].is_done() {
                let done = thread.rob[position].done;
                let entry = &mut thread.rob[idx];
                entry.ready_max = entry.ready_max.max(done);
                entry.uop.remove_dependency(producer);
            } else {
                thread.rob[position].add_dependant(seq);
            }
        }
        thread.stats.record_producer_distance(min_distance.unwrap_or(0));

        let entry = &mut thread.rob[idx];
        if entry.uop.dependencies_len() == 0 {
            entry.ready = entry.ready_max;
        }
    }

    /// Dispatches up to `dispatch_width` micro-ops of one thread.
    fn try_dispatch(&mut self, t: SmtThreadId, next_event: &mut SubsecondTime) -> bool {
        let now = self.now.elapsed();
        let period = self.now.component_period();
        let thread = &mut self.threads[t];
        let mut dispatched = 0;

        thread.current_frontend_stall = None;
        thread.long_latency_loads.retain(|load| load.done > now);

        while thread.num_in_rob < self.current_window_size && thread.num_in_rob < thread.rob.len() {
            if dispatched == self.dispatch_width {
                break;
            }

            let idx = thread.num_in_rob;
            let icache = thread.rob[idx].uop.icache_hit_where;
            if icache != HitWhere::L1I {
                if thread.in_icache_miss {
                    // Fetch latency paid; the line is here now.
                    thread.in_icache_miss = false;
                    thread.rob[idx].uop.icache_hit_where = HitWhere::L1I;
                } else {
                    let latency = thread.rob[idx].uop.icache_latency;
                    thread.frontend_stalled_until = now + period.cycles(latency);
                    thread.in_icache_miss = true;
                    thread.current_frontend_stall = Some(CpiComponent::InstructionCache(icache));
                    trace!(target: "rob_timer", thread = t, latency, "icache miss");
                    break;
                }
            }

            if self.rs_entries_used >= self.rs_entries {
                thread.current_frontend_stall = Some(CpiComponent::RsFull);
                break;
            }

            if thread.long_latency_loads.len() >= MAX_OUTSTANDING {
                let oldest = thread
                    .long_latency_loads
                    .iter()
                    .min_by_key(|load| load.done)
                    .copied();
                if let Some(oldest) = oldest {
                    thread.current_frontend_stall = Some(CpiComponent::DataCache(oldest.hit_where));
                    *next_event = (*next_event).min(oldest.done);
                }
                break;
            }

            Self::set_dependencies(thread, idx, self.store_to_load_forwarding);

            let entry = &mut thread.rob[idx];
            entry.dispatched = now;
            entry.ready = entry.ready.max(now + period.period());
            *next_event = (*next_event).min(entry.ready);
            thread.next_event = thread.next_event.min(entry.ready);
            trace!(
                target: "rob_timer",
                thread = t,
                seq = entry.sequence_number(),
                subtype = entry.uop.uop.subtype.name(),
                "dispatch"
            );

            thread.num_in_rob += 1;
            self.rs_entries_used += 1;
            dispatched += 1;
        }

        if thread.num_in_rob < self.current_window_size && thread.pre_rob_len() > 0 {
            *next_event = (*next_event).min(thread.frontend_stalled_until.max(now + period.period()));
        }

        dispatched > 0
    }

    /// Component of the oldest micro-op still executing, if it explains a stall.
    fn find_cpi_component(thread: &RobThread, now: SubsecondTime) -> Option<CpiComponent> {
        for entry in thread.rob.iter().take(thread.num_in_rob) {
            if entry.done < now {
                continue;
            }
            if entry.issued >= now {
                return None;
            }
            let uop = &entry.uop.uop;
            if uop.serializing || uop.mem_barrier {
                return Some(CpiComponent::Serialization);
            }
            if uop.is_load() || uop.is_store() {
                return Some(CpiComponent::DataCache(entry.uop.dcache_hit_where));
            }
            return None;
        }
        None
    }

    fn do_dispatch(&mut self, threads: &[SmtThread]) -> SubsecondTime {
        let now = self.now.elapsed();
        let n = self.threads.len();
        let first = self.dispatch_thread % n;
        let mut dispatched_from = first;
        let mut has_dispatched = false;
        let mut next_event = SubsecondTime::MAX;

        for k in 0..n {
            let t = (first + k) % n;
            let running = threads.get(t).is_some_and(|s| s.running);
            let thread = &self.threads[t];
            let rob_head = Self::find_cpi_component(thread, now);

            let component = if thread.frontend_stalled_until > now {
                next_event = next_event.min(thread.frontend_stalled_until);
                rob_head
                    .or(thread.current_frontend_stall)
                    .unwrap_or(CpiComponent::Base)
            } else if !running || thread.now > now {
                if running {
                    next_event = next_event.min(thread.now);
                }
                CpiComponent::Idle
            } else if thread.num_in_rob >= self.current_window_size {
                rob_head.unwrap_or(CpiComponent::Base)
            } else if has_dispatched {
                CpiComponent::Smt
            } else {
                has_dispatched = self.try_dispatch(t, &mut next_event);
                if has_dispatched {
                    dispatched_from = t;
                }
                let thread = &self.threads[t];
                match thread.current_frontend_stall {
                    Some(stall) => stall,
                    None if !has_dispatched && thread.pre_rob_len() == 0 => {
                        rob_head.unwrap_or(CpiComponent::Base)
                    }
                    None => CpiComponent::Base,
                }
            };
            self.threads[t].cycle_component = component;
        }

        self.dispatch_thread = (dispatched_from + 1) % n;
        next_event
    }

    /// Starts the entry at ring position `idx` and wakes its consumers.
    fn issue_instruction(&mut self, t: SmtThreadId, idx: usize, next_event: &mut SubsecondTime) {
        let now = self.now.elapsed();
        let period = self.now.component_period();
        let thread = &mut self.threads[t];

        let (is_load, is_store) = {
            let uop = &thread.rob[idx].uop.uop;
            (uop.is_load(), uop.is_store())
        };

        if (is_load || is_store) && thread.rob[idx].uop.dcache_hit_where == HitWhere::Unknown {
            let access = {
                let uop = &thread.rob[idx].uop;
                MemoryAccess {
                    address: uop.address,
                    size: uop.uop.memory_access_size,
                    is_write: is_store,
                    instruction_pointer: uop.uop.instruction_pointer,
                }
            };
            let result = thread.context.memory.access(access);
            let uop = &mut thread.rob[idx].uop;
            uop.exec_latency += result.latency.divide_rounded(period.period());
            uop.dcache_hit_where = result.hit_where;
        }

        let exec_latency = period.cycles(thread.rob[idx].uop.exec_latency);
        if is_load {
            let _ = self.load_queue.completion_time(now, exec_latency);
            thread.stats.loads_count += 1;
            thread.stats.loads_latency += exec_latency;
        } else if is_store {
            let _ = self.store_queue.completion_time(now, exec_latency);
            thread.stats.stores_count += 1;
            thread.stats.stores_latency += exec_latency;
        }

        let mut depend = now + exec_latency;
        if is_store {
            // The store leaves the ROB once handed to the memory system;
            // fences wait for it through `last_store_done`.
            self.last_store_done = self
                .last_store_done
                .max(now + exec_latency + period.period());
            depend = now + period.period();
        }

        let entry = &mut thread.rob[idx];
        if entry.uop.uop.serializing {
            self.serializations += 1;
        }
        if entry.uop.uop.mem_barrier {
            self.mfences += 1;
        }
        entry.issued = now;
        entry.done = depend;
        *next_event = (*next_event).min(depend);
        self.rs_entries_used = self.rs_entries_used.saturating_sub(1);

        let seq = entry.sequence_number();
        let dependants = *entry.dependants();
        trace!(
            target: "rob_timer",
            thread = t,
            seq,
            latency = thread.rob[idx].uop.exec_latency,
            "issue"
        );

        let front = thread.front_sequence_number().unwrap_or(seq);
        for consumer in dependants.iter() {
            let position = thread.position(consumer);
            {
                let dep = &mut thread.rob[position];
                dep.ready_max = dep.ready_max.max(depend);
                dep.uop.remove_dependency(seq);
                if dep.uop.dependencies_len() == 0 {
                    dep.ready = dep.ready_max;
                }
            }

            let dep = &thread.rob[position];
            if dep.uop.uop.is_store() && dep.address_ready.is_max() {
                let producers = *dep.address_producers();
                let mut address_ready_max = dep.address_ready_max;
                let mut resolved = true;
                for producer in producers.iter() {
                    if producer < front {
                        continue;
                    }
                    if producer == seq {
                        address_ready_max = address_ready_max.max(depend);
                    }
                    if !thread.entry(producer).is_done() {
                        resolved = false;
                    }
                }
                let dep = &mut thread.rob[position];
                dep.address_ready_max = address_ready_max;
                if resolved {
                    dep.address_ready = address_ready_max;
                }
            }
        }
    }

    fn try_issue(&mut self, t: SmtThreadId, next_event: &mut SubsecondTime) -> bool {
        let now = self.now.elapsed();
        let mut num_issued = 0;
        let mut head_of_queue = true;
        let mut no_more_load = false;
        let mut no_more_store = false;
        let mut have_unresolved_store = false;
        let mut thread_next_event = SubsecondTime::MAX;

        let mut i = 0;
        while i < self.threads[t].num_in_rob {
            let entry = &self.threads[t].rob[i];
            if entry.is_done() {
                thread_next_event = thread_next_event.min(entry.done);
                i += 1;
                continue;
            }
            thread_next_event = thread_next_event.min(entry.ready);

            let uop = &entry.uop.uop;
            let (is_load, is_store) = (uop.is_load(), uop.is_store());
            let address_ready = entry.address_ready;

            let can_issue = if entry.ready > now {
                false
            } else if (no_more_load && is_load) || (no_more_store && is_store) {
                false
            } else if uop.serializing {
                if head_of_queue && self.last_store_done <= now {
                    true
                } else {
                    break;
                }
            } else if uop.mem_barrier {
                if head_of_queue && self.last_store_done <= now {
                    true
                } else {
                    no_more_load = true;
                    no_more_store = true;
                    false
                }
            } else if num_issued >= self.dispatch_width {
                false
            } else if is_load && !self.load_queue.has_free_slot(now) {
                false
            } else if is_load && self.no_address_disambiguation && have_unresolved_store {
                false
            } else {
                !(is_store && (!head_of_queue || !self.store_queue.has_free_slot(now)))
            };

            if can_issue {
                num_issued += 1;
                self.issue_instruction(t, i, &mut thread_next_event);
                self.account_long_latency_load(t, i, now);
            } else {
                head_of_queue = false;
                if is_store && address_ready > now {
                    have_unresolved_store = true;
                }
                if self.in_order {
                    break;
                }
            }

            if num_issued >= self.dispatch_width {
                // Younger entries were not looked at.
                thread_next_event = thread_next_event.min(now + self.now.period());
                break;
            }
            i += 1;
        }

        self.threads[t].next_event = thread_next_event;
        *next_event = (*next_event).min(thread_next_event);
        num_issued > 0
    }

    /// MLP counters and dispatch backpressure for a just-issued load.
    fn account_long_latency_load(&mut self, t: SmtThreadId, idx: usize, now: SubsecondTime) {
        let cutoff = self.long_latency_cutoff;
        let thread = &mut self.threads[t];
        let entry = &thread.rob[idx];
        if !(entry.uop.is_long_latency_load(cutoff) && entry.uop.dcache_hit_where != HitWhere::L1Own)
        {
            return;
        }

        let done = now.max(entry.done);
        let hit_where = entry.uop.dcache_hit_where;
        if thread.last_accounted_memory_cycle < now {
            thread.last_accounted_memory_cycle = now;
        }
        thread.stats.outstanding_long_latency_insns += done - now;
        if done > thread.last_accounted_memory_cycle {
            thread.stats.outstanding_long_latency_cycles += done - thread.last_accounted_memory_cycle;
            thread.last_accounted_memory_cycle = done;
        }
        thread
            .long_latency_loads
            .push(OutstandingLoad { done, hit_where });
    }

    fn do_issue(&mut self) -> SubsecondTime {
        let now = self.now.elapsed();
        let n = self.threads.len();
        let first = self.issue_thread % n;
        let mut next_event = SubsecondTime::MAX;

        let mut t = first;
        loop {
            let thread = &self.threads[t];
            if thread.next_event > now {
                next_event = next_event.min(thread.next_event);
            } else if thread.num_in_rob > 0
                && self.try_issue(t, &mut next_event)
                && !self.simultaneous_issue
            {
                break;
            }
            t = (t + 1) % n;
            if t == first {
                break;
            }
        }

        self.issue_thread = (t + 1) % n;
        next_event
    }

    fn do_commit(&mut self) -> SubsecondTime {
        let now = self.now.elapsed();

        for t in 0..self.threads.len() {
            let mut committed = 0;
            loop {
                let thread = &mut self.threads[t];
                if thread.num_in_rob == 0 || thread.rob.front().is_none_or(|e| e.done > now) {
                    break;
                }
                let Some(entry) = thread.rob.pop() else {
                    break;
                };
                thread.num_in_rob -= 1;
                committed += 1;

                if entry.uop.is_last() {
                    thread.instrs += 1;
                }
                if self.commit_log {
                    thread.stats.commit_log.push(CommitRecord {
                        sequence_number: entry.sequence_number(),
                        dispatched: entry.dispatched,
                        issued: entry.issued,
                        done: entry.done,
                        committed: now,
                    });
                }
                trace!(target: "rob_timer", thread = t, seq = entry.sequence_number(), "commit");

                if entry.uop.uop.is_branch() {
                    thread.stats.branch_predictions += 1;
                    if let (Some(predictor), Some(outcome)) =
                        (thread.context.branch_predictor.as_mut(), entry.uop.branch)
                    {
                        predictor.train(entry.uop.uop.instruction_pointer, outcome);
                    }
                    if entry.uop.branch_mispredicted {
                        thread.stats.branch_mispredictions += 1;
                        self.flush(t, entry.sequence_number());
                        break;
                    }
                }

                if committed >= self.commit_width {
                    break;
                }
            }
        }

        self.threads
            .first()
            .filter(|t| t.num_in_rob > 0)
            .and_then(|t| t.rob.front())
            .map_or(SubsecondTime::MAX, |e| e.done)
    }

    /// Squashes everything younger than the mispredicted branch `branch_seq`.
    ///
    /// The younger micro-ops go back to the pre-ROB buffer under fresh
    /// sequence numbers and the front end restarts after the penalty.
    fn flush(&mut self, t: SmtThreadId, branch_seq: u64) {
        let now = self.now.elapsed();
        let penalty = self.now.component_period().cycles(self.misprediction_penalty);
        let thread = &mut self.threads[t];

        let mut next = thread.next_sequence_number;
        let mut released = 0;
        let mut flushed = 0;
        for (i, entry) in thread.rob.iter_mut().enumerate() {
            if i < thread.num_in_rob {
                flushed += 1;
                if entry.issued.is_max() {
                    released += 1;
                }
            }
            entry.reinit(next);
            next += 1;
        }
        thread.next_sequence_number = next;
        thread.num_in_rob = 0;
        self.rs_entries_used = self.rs_entries_used.saturating_sub(released);

        thread.register_dependencies.clear();
        thread.memory_dependencies.clear();
        thread.in_icache_miss = false;
        thread.frontend_stalled_until = now + penalty;
        thread.current_frontend_stall = Some(CpiComponent::BranchPredictor);
        thread.next_event = now;

        debug!(
            target: "rob_timer",
            thread = t,
            branch_seq,
            flushed,
            resume = %thread.frontend_stalled_until,
            "branch mispredict flush"
        );
    }

    fn can_dispatch(&self, t: SmtThreadId, running: bool) -> bool {
        let now = self.now.elapsed();
        let thread = &self.threads[t];
        !(thread.frontend_stalled_until > now
            || thread.now > now
            || thread.num_in_rob >= self.current_window_size
            || !running)
    }

    /// Every thread that could dispatch has enough buffered input, and some
    /// thread still has work.
    fn can_execute(&self, threads: &[SmtThread]) -> bool {
        let mut progress = false;
        for (t, thread) in self.threads.iter().enumerate() {
            let running = threads.get(t).is_some_and(|s| s.running);
            if thread.num_in_rob > 0 || (running && thread.pre_rob_len() > 0) {
                progress = true;
            }
            if !self.can_dispatch(t, running) {
                continue;
            }
            if !thread.end_of_stream && thread.pre_rob_len() < 2 * self.dispatch_width {
                return false;
            }
        }
        progress
    }

    fn execute_cycle(&mut self, threads: &[SmtThread]) {
        let next_dispatch = self.do_dispatch(threads);
        let next_issue = self.do_issue();
        let next_commit = self.do_commit();

        let now = self.now.elapsed();
        let period = self.now.period();
        let next_event = next_dispatch.min(next_issue).min(next_commit);
        let skip = if self.threads.len() > 1 {
            period
        } else if !next_event.is_max() && next_event > now + period {
            next_event - now
        } else {
            period
        };

        for thread in &mut self.threads {
            thread.stats.cpi.add(thread.cycle_component, skip);
        }
        if self.mlp_histogram {
            for thread in &mut self.threads {
                Self::count_outstanding_memops(thread, now, skip);
            }
        }

        self.now.add_latency(skip);
        if skip > period {
            self.time_skipped += skip - period;
        }
    }

    fn count_outstanding_memops(thread: &mut RobThread, now: SubsecondTime, span: SubsecondTime) {
        let outstanding = thread
            .rob
            .iter()
            .take(thread.num_in_rob)
            .filter(|e| e.uop.uop.is_load() && e.is_done() && e.done > now)
            .count();
        if outstanding == 0 {
            return;
        }
        let last = thread.stats.mlp_histogram.len().saturating_sub(1);
        if let Some(bin) = thread.stats.mlp_histogram.get_mut(outstanding.min(last)) {
            *bin += span;
        }
    }
}

impl SmtEngine for RobSmtTimer {
    type ThreadContext = RobThreadContext;

    fn initialize_thread(&mut self, thread: SmtThreadId, context: RobThreadContext) {
        assert_eq!(
            thread,
            self.threads.len(),
            "ROB threads must be initialised in slot order"
        );
        let mlp_bins = self.mlp_histogram.then_some(MAX_OUTSTANDING);
        self.threads
            .push(RobThread::new(self.window_size, mlp_bins, context));
    }

    fn thread_num_surplus_instructions(&self, thread: SmtThreadId) -> u64 {
        self.threads[thread].pre_rob_len() as u64
    }

    fn thread_has_enough_instructions(&self, thread: SmtThreadId) -> bool {
        let t = &self.threads[thread];
        if t.end_of_stream {
            !t.rob.is_empty()
        } else {
            t.pre_rob_len() > 2 * self.dispatch_width
        }
    }

    fn notify_num_active_threads_change(&mut self, threads: &[SmtThread]) {
        self.compute_current_window_size(threads);
    }

    fn push_instructions(&mut self, t: SmtThreadId, uops: Vec<DynamicMicroOp>) {
        let period = self.now.period();
        let thread = &mut self.threads[t];

        for mut uop in uops {
            if uop.squashed {
                continue;
            }

            if uop.uop.first && uop.icache_hit_where == HitWhere::L1I {
                let fetch = thread
                    .context
                    .memory
                    .read_instruction(uop.uop.instruction_pointer, FETCH_BYTES);
                if fetch.hit_where != HitWhere::L1I {
                    uop = uop.with_icache_miss(fetch.hit_where, fetch.latency.divide_rounded(period));
                }
            }

            if let (Some(predictor), Some(outcome)) =
                (thread.context.branch_predictor.as_ref(), uop.branch)
            {
                if uop.uop.is_branch()
                    && predictor.is_mispredicted(uop.uop.instruction_pointer, outcome)
                {
                    uop.branch_mispredicted = true;
                }
            }

            let stats = &mut thread.stats;
            stats.uops_by_subtype[uop.uop.subtype.index()] += 1;
            stats.uops_total += 1;
            if uop.uop.x87 {
                stats.uops_x87 += 1;
            }
            if uop.uop.pause {
                stats.uops_pause += 1;
            }
            if !thread.x87_warned
                && stats.uops_total > X87_WARN_MIN_UOPS
                && stats.uops_x87 > stats.uops_total / 20
            {
                thread.x87_warned = true;
                warn!(
                    thread = t,
                    uops = stats.uops_total,
                    x87 = stats.uops_x87,
                    "significant fraction of x87 micro-ops, timing accuracy will be low"
                );
            }

            assert!(
                !thread.rob.is_full(),
                "pre-ROB buffer overflow on thread {t}: {} entries buffered",
                thread.rob.len()
            );
            let seq = thread.next_sequence_number;
            thread.next_sequence_number += 1;
            let _ = thread.rob.push(RobEntry::new(uop, seq));
        }
    }

    fn return_latency(&mut self, t: SmtThreadId, in_wakeup: bool) -> (u64, SubsecondTime) {
        let now = self.now.elapsed();
        let thread = &mut self.threads[t];

        let mut latency = SubsecondTime::ZERO;
        if !in_wakeup && now > thread.now {
            latency = now - thread.now;
            thread.now = now;
        }

        let instrs = thread.instrs - thread.instrs_returned;
        thread.instrs_returned = thread.instrs;
        (instrs, latency)
    }

    fn execute(&mut self, threads: &[SmtThread]) {
        if self.threads.is_empty() {
            return;
        }
        while self.can_execute(threads) {
            self.execute_cycle(threads);
        }
    }

    fn synchronize(&mut self, t: SmtThreadId, time: SubsecondTime) {
        self.threads[t].now = time;
        let earliest = self
            .threads
            .iter()
            .map(|thread| thread.now)
            .fold(SubsecondTime::MAX, SubsecondTime::min);
        if !earliest.is_max() && earliest > self.now.elapsed() {
            self.now.set_elapsed(earliest);
            debug!(target: "rob_timer", thread = t, now = %earliest, "fast-forward core time");
        }
    }

    fn mark_end_of_stream(&mut self, t: SmtThreadId) {
        self.threads[t].end_of_stream = true;
    }

    fn is_drained(&self, t: SmtThreadId) -> bool {
        self.threads[t].rob.is_empty()
    }
}

impl std::fmt::Debug for RobSmtTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobSmtTimer")
            .field("now", &self.now.elapsed())
            .field("current_window_size", &self.current_window_size)
            .field("rs_entries_used", &self.rs_entries_used)
            .field("threads", &self.threads)
            .finish_non_exhaustive()
    }
}
