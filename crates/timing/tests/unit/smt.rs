//! # SMT Barrier Tests
//!
//! Real host threads driving one shared ROB timer, plus a scripted engine
//! for the release order.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sniper_timing::common::{SmtThreadId, SubsecondTime, TimingError};
use sniper_timing::core::timer::rob::RobThreadContext;
use sniper_timing::core::timer::{ClockSkewClient, SmtEngine, SmtThread};
use sniper_timing::uop::DynamicMicroOp;
use sniper_timing::{RobSmtTimer, SmtTimer};

use crate::common::builder::{dependent_chain, independent, small_core};
use crate::common::harness::{init_tracing, l1_memory};

/// Timer with one slot per core, each running application thread `core`.
fn shared_timer(cores: usize) -> Arc<SmtTimer<RobSmtTimer>> {
    init_tracing();
    let mut config = small_core();
    config.core.smt_threads = cores;
    let timer = Arc::new(SmtTimer::new(RobSmtTimer::new(&config)));
    for core in 0..cores {
        let _ = timer.register_thread(core, None, RobThreadContext::new(l1_memory(1)));
        let _ = timer.bind_thread(core, core as u64);
        timer.thread_start(core as u64);
    }
    timer
}

fn wait_for_state(timer: &SmtTimer<RobSmtTimer>, state: &str) {
    while timer.state_string() != state {
        thread::yield_now();
    }
}

#[test]
fn test_two_host_threads_drain_their_streams() {
    let timer = shared_timer(2);

    thread::scope(|s| {
        for slot in 0..2 {
            let timer = Arc::clone(&timer);
            let _ = s.spawn(move || {
                for _ in 0..60 {
                    let batch = if slot == 0 {
                        independent(4)
                    } else {
                        dependent_chain(4)
                    };
                    let _ = timer.push_instructions(slot, batch).unwrap();
                    timer.simulate(slot).unwrap();
                }
                timer.finish(slot).unwrap();
            });
        }
    });

    let report = timer.with_engine(RobSmtTimer::report);
    assert_eq!(report.threads.len(), 2);
    for thread in &report.threads {
        assert_eq!(thread.instructions, 240);
    }
    assert_eq!(timer.state_string(), "__");
}

#[test]
fn test_disable_releases_parked_thread() {
    let timer = shared_timer(2);

    thread::scope(|s| {
        let worker = Arc::clone(&timer);
        let handle = s.spawn(move || {
            let _ = worker.push_instructions(0, independent(140)).unwrap();
            worker.simulate(0)
        });

        // Slot 1 never arrives, so slot 0 stays parked.
        wait_for_state(&timer, "BR");
        timer.disable();
        assert!(handle.join().unwrap().is_ok());
    });

    assert!(!timer.is_enabled());
    let report = timer.with_engine(RobSmtTimer::report);
    assert_eq!(report.threads[0].instructions, 0);
}

#[test]
fn test_stalled_sibling_lets_the_waiting_thread_drive() {
    let timer = shared_timer(2);

    thread::scope(|s| {
        let worker = Arc::clone(&timer);
        let handle = s.spawn(move || {
            let _ = worker.push_instructions(0, independent(140)).unwrap();
            worker.simulate(0)
        });

        wait_for_state(&timer, "BR");
        timer.thread_stall(1);
        assert!(handle.join().unwrap().is_ok());
    });

    let now = timer.with_engine(RobSmtTimer::now);
    assert!(now > SubsecondTime::ZERO);
    assert_eq!(timer.state_string(), "R_");
}

#[test]
fn test_migration_moves_the_running_slot() {
    let timer = shared_timer(2);
    timer.thread_exit(1);
    assert_eq!(timer.state_string(), "R_");

    timer.thread_migrate(0, 1);
    assert_eq!(timer.state_string(), "_R");
    assert_eq!(timer.thread_for_core(1), Some(1));
}

#[test]
fn test_unknown_slot_is_an_error() {
    let timer = shared_timer(1);
    assert_eq!(timer.num_threads(), 1);
    assert!(matches!(timer.simulate(3), Err(TimingError::UnknownThread(3))));
    assert!(matches!(
        timer.push_instructions(5, Vec::new()),
        Err(TimingError::UnknownThread(5))
    ));
}

#[test]
fn test_resumed_thread_hides_latency_until_synchronised() {
    let timer = shared_timer(1);
    let _ = timer.push_instructions(0, independent(140)).unwrap();
    timer.simulate(0).unwrap();
    let now = timer.with_engine(RobSmtTimer::now);
    assert!(now > SubsecondTime::ZERO);

    timer.thread_stall(0);
    timer.thread_resume(0);
    assert_eq!(timer.return_latency(0).unwrap().1, SubsecondTime::ZERO);

    timer.synchronize(0, SubsecondTime::ZERO).unwrap();
    assert_eq!(timer.return_latency(0).unwrap().1, now);
}

#[test]
fn test_migrated_thread_hides_latency_until_synchronised() {
    let timer = shared_timer(2);
    timer.thread_exit(1);
    let _ = timer.push_instructions(0, independent(140)).unwrap();
    timer.simulate(0).unwrap();
    let now = timer.with_engine(RobSmtTimer::now);
    assert!(now > SubsecondTime::ZERO);

    timer.thread_migrate(0, 1);
    assert_eq!(timer.state_string(), "_R");
    assert_eq!(timer.return_latency(1).unwrap(), (0, SubsecondTime::ZERO));

    timer.synchronize(1, SubsecondTime::ZERO).unwrap();
    assert_eq!(timer.return_latency(1).unwrap().1, now);
}

/// Records the barrier state it sees from inside `synchronize`.
#[derive(Default)]
struct RecordingClient {
    timer: OnceLock<Weak<SmtTimer<RobSmtTimer>>>,
    calls: AtomicUsize,
    states: Mutex<Vec<String>>,
}

impl ClockSkewClient for RecordingClient {
    fn synchronize(&self) {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(timer) = self.timer.get().and_then(Weak::upgrade) {
            // Takes the core lock; the driving thread must have dropped it.
            self.states.lock().push(timer.state_string());
        }
    }
}

#[test]
fn test_clock_skew_client_runs_without_the_core_lock() {
    init_tracing();
    let mut config = small_core();
    config.core.smt_threads = 1;
    let timer = Arc::new(SmtTimer::new(RobSmtTimer::new(&config)));
    let client = Arc::new(RecordingClient::default());
    assert!(client.timer.set(Arc::downgrade(&timer)).is_ok());

    let slot = timer.register_thread(
        0,
        Some(Arc::clone(&client) as Arc<dyn ClockSkewClient>),
        RobThreadContext::new(l1_memory(1)),
    );
    let _ = timer.bind_thread(0, 0);
    timer.thread_start(0);

    let _ = timer.push_instructions(slot, independent(140)).unwrap();
    timer.simulate(slot).unwrap();

    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*client.states.lock(), vec!["R".to_owned()]);
    assert!(timer.with_engine(RobSmtTimer::now) > SubsecondTime::ZERO);
}

thread_local! {
    static HOST_SLOT: Cell<Option<SmtThreadId>> = const { Cell::new(None) };
}

/// One `execute` call as seen by the engine.
#[derive(Clone, Copy, Debug)]
struct Round {
    executor: Option<SmtThreadId>,
    all_running: bool,
}

/// Engine whose slots take turns needing input: in round `r`, slot `s`
/// has enough exactly when `r + s` is even.
#[derive(Debug, Default)]
struct AlternatingEngine {
    rounds: Vec<Round>,
}

impl SmtEngine for AlternatingEngine {
    type ThreadContext = ();

    fn initialize_thread(&mut self, _thread: SmtThreadId, _context: ()) {}

    fn thread_num_surplus_instructions(&self, _thread: SmtThreadId) -> u64 {
        1000
    }

    fn thread_has_enough_instructions(&self, thread: SmtThreadId) -> bool {
        (self.rounds.len() + thread) % 2 == 0
    }

    fn notify_num_active_threads_change(&mut self, _threads: &[SmtThread]) {}

    fn push_instructions(&mut self, _thread: SmtThreadId, _uops: Vec<DynamicMicroOp>) {}

    fn return_latency(&mut self, _thread: SmtThreadId, _in_wakeup: bool) -> (u64, SubsecondTime) {
        (0, SubsecondTime::ZERO)
    }

    fn execute(&mut self, threads: &[SmtThread]) {
        self.rounds.push(Round {
            executor: HOST_SLOT.with(Cell::get),
            all_running: threads.iter().all(|t| t.running),
        });
    }

    fn synchronize(&mut self, _thread: SmtThreadId, _time: SubsecondTime) {}

    fn mark_end_of_stream(&mut self, _thread: SmtThreadId) {}

    fn is_drained(&self, _thread: SmtThreadId) -> bool {
        true
    }
}

#[test]
fn test_thread_needing_input_drives_each_round() {
    init_tracing();
    let timer = Arc::new(SmtTimer::new(AlternatingEngine::default()));
    for core in 0..2 {
        let _ = timer.register_thread(core, None, ());
        let _ = timer.bind_thread(core, core as u64);
        timer.thread_start(core as u64);
    }

    thread::scope(|s| {
        for slot in 0..2 {
            let timer = Arc::clone(&timer);
            let _ = s.spawn(move || {
                HOST_SLOT.with(|cell| cell.set(Some(slot)));
                for _ in 0..50 {
                    let _ = timer.push_instructions(slot, Vec::new()).unwrap();
                    timer.simulate(slot).unwrap();
                }
                timer.finish(slot).unwrap();
            });
        }
    });

    let rounds = timer.with_engine(|engine| engine.rounds.clone());
    assert!(rounds.len() >= 2, "only {} rounds", rounds.len());
    for (r, round) in rounds.iter().enumerate() {
        let executor = round.executor.unwrap();
        assert!(executor < 2);
        if round.all_running {
            assert_eq!(executor, (r + 1) % 2, "round {r} driven by a thread with enough input");
        }
    }
    assert!(rounds.iter().any(|r| r.executor == Some(0)));
    assert!(rounds.iter().any(|r| r.executor == Some(1)));
    assert_eq!(timer.state_string(), "__");
}
