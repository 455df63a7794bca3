use sniper_timing::RobSmtTimer;
use sniper_timing::common::{SmtThreadId, SubsecondTime};
use sniper_timing::config::Config;
use sniper_timing::core::timer::rob::RobThreadContext;
use sniper_timing::core::timer::{SmtEngine, SmtThread};
use sniper_timing::core::units::memory::{FixedLatencyMemory, MemoryHierarchy};
use sniper_timing::stats::CommitRecord;
use sniper_timing::uop::{DynamicMicroOp, HitWhere};

/// Installs a test log writer once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Memory whose data accesses hit the L1 in `cycles` cycles at 1 GHz.
pub fn l1_memory(cycles: u64) -> Box<dyn MemoryHierarchy> {
    Box::new(FixedLatencyMemory::new(
        SubsecondTime::from_ns(cycles),
        HitWhere::L1Own,
    ))
}

/// A `RobSmtTimer` driven directly, all threads running.
pub struct RobHarness {
    pub timer: RobSmtTimer,
    pub threads: Vec<SmtThread>,
}

impl RobHarness {
    /// One thread with 1-cycle L1 memory.
    pub fn new(config: &Config) -> Self {
        Self::with_contexts(config, vec![RobThreadContext::new(l1_memory(1))])
    }

    /// One running thread per context.
    pub fn with_contexts(config: &Config, contexts: Vec<RobThreadContext>) -> Self {
        init_tracing();
        let mut timer = RobSmtTimer::new(config);
        let mut threads = Vec::new();
        for (i, context) in contexts.into_iter().enumerate() {
            timer.initialize_thread(i, context);
            threads.push(SmtThread::new(i).running(i as u64));
        }
        timer.notify_num_active_threads_change(&threads);
        Self { timer, threads }
    }

    pub fn push(&mut self, thread: SmtThreadId, uops: Vec<DynamicMicroOp>) {
        self.timer.push_instructions(thread, uops);
    }

    /// Marks every stream finished and runs until all threads drain.
    pub fn run_to_completion(&mut self) {
        for thread in 0..self.threads.len() {
            self.timer.mark_end_of_stream(thread);
        }
        self.timer.execute(&self.threads);
    }

    /// Core time in cycles.
    pub fn cycles(&self) -> u64 {
        self.timer.now().divide_rounded(self.timer.period())
    }

    pub fn commit_log(&self, thread: SmtThreadId) -> &[CommitRecord] {
        self.timer
            .thread(thread)
            .map_or(&[][..], |t| t.stats().commit_log.as_slice())
    }
}
