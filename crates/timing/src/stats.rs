//! Timing statistics collection and reporting.
//!
//! This module tracks what the ROB timer measures. It provides:
//! 1. **CPI stack:** Elapsed time split into stall components (base, SMT, idle, branch, caches, ...).
//! 2. **Per-thread counters:** Micro-op mix, load/store latency, producer distance and MLP.
//! 3. **Commit log:** Optional per-micro-op dispatch/issue/done/commit timestamps.
//! 4. **Report:** A serialisable snapshot of every hardware thread of one core.

use serde::Serialize;

use crate::common::SubsecondTime;
use crate::core::units::contention::ContentionStats;
use crate::uop::{HitWhere, UopSubtype};

/// The component a cycle is charged to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CpiComponent {
    /// Useful work (or an unattributed stall).
    Base,
    /// Another hardware thread used the dispatch slot.
    Smt,
    /// Thread not running, or ahead of core time.
    Idle,
    /// Refetch after a branch misprediction.
    BranchPredictor,
    /// Waiting on a serializing instruction or memory fence.
    Serialization,
    /// Reservation stations exhausted.
    RsFull,
    /// Instruction fetch served by the given level.
    InstructionCache(HitWhere),
    /// Data access served by the given level.
    DataCache(HitWhere),
}

impl CpiComponent {
    /// Statistic key, e.g. `cpiBase` or `cpiDataCacheL2`.
    pub fn key(self) -> String {
        match self {
            Self::Base => "cpiBase".to_owned(),
            Self::Smt => "cpiSMT".to_owned(),
            Self::Idle => "cpiIdle".to_owned(),
            Self::BranchPredictor => "cpiBranchPredictor".to_owned(),
            Self::Serialization => "cpiSerialization".to_owned(),
            Self::RsFull => "cpiRSFull".to_owned(),
            Self::InstructionCache(hw) => format!("cpiInstructionCache{}", hw.name()),
            Self::DataCache(hw) => format!("cpiDataCache{}", hw.name()),
        }
    }
}

/// Elapsed time broken down by [`CpiComponent`].
///
/// Every cycle the ROB timer simulates lands in exactly one bucket per
/// thread, so `total()` equals the thread's simulated time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CpiStack {
    /// Useful work.
    pub base: SubsecondTime,
    /// Lost to the other SMT threads.
    pub smt: SubsecondTime,
    /// Thread idle.
    pub idle: SubsecondTime,
    /// Branch misprediction refetch.
    pub branch_predictor: SubsecondTime,
    /// Serializing instructions and fences.
    pub serialization: SubsecondTime,
    /// Reservation stations full.
    pub rs_full: SubsecondTime,
    /// Instruction fetch stalls, indexed by `HitWhere::index`.
    pub instruction_cache: [SubsecondTime; HitWhere::COUNT],
    /// Data access stalls, indexed by `HitWhere::index`.
    pub data_cache: [SubsecondTime; HitWhere::COUNT],
}

impl CpiStack {
    /// Charges `time` to `component`.
    pub fn add(&mut self, component: CpiComponent, time: SubsecondTime) {
        let bucket = match component {
            CpiComponent::Base => &mut self.base,
            CpiComponent::Smt => &mut self.smt,
            CpiComponent::Idle => &mut self.idle,
            CpiComponent::BranchPredictor => &mut self.branch_predictor,
            CpiComponent::Serialization => &mut self.serialization,
            CpiComponent::RsFull => &mut self.rs_full,
            CpiComponent::InstructionCache(hw) => &mut self.instruction_cache[hw.index()],
            CpiComponent::DataCache(hw) => &mut self.data_cache[hw.index()],
        };
        *bucket += time;
    }

    /// Time charged to `component`.
    pub fn get(&self, component: CpiComponent) -> SubsecondTime {
        match component {
            CpiComponent::Base => self.base,
            CpiComponent::Smt => self.smt,
            CpiComponent::Idle => self.idle,
            CpiComponent::BranchPredictor => self.branch_predictor,
            CpiComponent::Serialization => self.serialization,
            CpiComponent::RsFull => self.rs_full,
            CpiComponent::InstructionCache(hw) => self.instruction_cache[hw.index()],
            CpiComponent::DataCache(hw) => self.data_cache[hw.index()],
        }
    }

    /// Sum of every bucket.
    pub fn total(&self) -> SubsecondTime {
        let mut total = self.base
            + self.smt
            + self.idle
            + self.branch_predictor
            + self.serialization
            + self.rs_full;
        for t in self.instruction_cache.iter().chain(self.data_cache.iter()) {
            total += *t;
        }
        total
    }

    /// Non-empty buckets with their statistic keys, in a stable order.
    pub fn entries(&self) -> Vec<(String, SubsecondTime)> {
        let mut out = Vec::new();
        let fixed = [
            CpiComponent::Base,
            CpiComponent::Smt,
            CpiComponent::Idle,
            CpiComponent::BranchPredictor,
            CpiComponent::Serialization,
            CpiComponent::RsFull,
        ];
        let caches = HitWhere::ALL
            .iter()
            .filter(|hw| hw.is_reportable())
            .flat_map(|&hw| {
                [
                    CpiComponent::InstructionCache(hw),
                    CpiComponent::DataCache(hw),
                ]
            });
        for component in fixed.into_iter().chain(caches) {
            let time = self.get(component);
            if time > SubsecondTime::ZERO {
                out.push((component.key(), time));
            }
        }
        out
    }
}

/// Dispatch, issue, done and commit times of one committed micro-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    /// Sequence number it committed under.
    pub sequence_number: u64,
    /// Entered the ROB.
    pub dispatched: SubsecondTime,
    /// Left the reservation stations.
    pub issued: SubsecondTime,
    /// Result available.
    pub done: SubsecondTime,
    /// Retired.
    pub committed: SubsecondTime,
}

/// Counters of one hardware thread in the ROB timer.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RobThreadStats {
    /// Elapsed time by stall component.
    pub cpi: CpiStack,

    /// Micro-ops pushed (squashed ones excluded).
    pub uops_total: u64,
    /// x87 micro-ops pushed.
    pub uops_x87: u64,
    /// Pause micro-ops pushed.
    pub uops_pause: u64,
    /// Micro-ops pushed per `UopSubtype::index`.
    pub uops_by_subtype: [u64; UopSubtype::COUNT],

    /// Loads issued.
    pub loads_count: u64,
    /// Summed load latency.
    pub loads_latency: SubsecondTime,
    /// Stores issued.
    pub stores_count: u64,
    /// Summed store latency.
    pub stores_latency: SubsecondTime,

    /// Consumers by distance (in micro-ops) to their youngest producer.
    pub producer_distance: Vec<u64>,
    /// Sum of all producer distances.
    pub total_producer_distance: u64,
    /// Micro-ops that had a producer in flight.
    pub total_consumers: u64,

    /// Summed remaining latency of long-latency loads seen at issue.
    pub outstanding_long_latency_insns: SubsecondTime,
    /// Time covered by at least one outstanding long-latency load.
    pub outstanding_long_latency_cycles: SubsecondTime,
    /// Time spent with `i` long-latency loads outstanding (when enabled).
    pub mlp_histogram: Vec<SubsecondTime>,

    /// Branches committed.
    pub branch_predictions: u64,
    /// Of which mispredicted.
    pub branch_mispredictions: u64,

    /// Committed micro-ops (when enabled).
    pub commit_log: Vec<CommitRecord>,
}

impl RobThreadStats {
    /// Counters with a producer-distance histogram of `window_size` bins
    /// and, optionally, an MLP histogram of `mlp_bins` bins.
    pub fn new(window_size: usize, mlp_bins: Option<usize>) -> Self {
        Self {
            producer_distance: vec![0; window_size.max(1)],
            mlp_histogram: mlp_bins.map_or_else(Vec::new, |n| vec![SubsecondTime::ZERO; n]),
            ..Self::default()
        }
    }

    /// Records a consumer whose youngest producer is `distance` micro-ops older.
    /// Zero means no producer was in flight.
    pub fn record_producer_distance(&mut self, distance: u64) {
        let last = self.producer_distance.len().saturating_sub(1);
        let bin = usize::try_from(distance).map_or(last, |d| d.min(last));
        if let Some(slot) = self.producer_distance.get_mut(bin) {
            *slot += 1;
        }
        if distance > 0 {
            self.total_producer_distance += distance;
            self.total_consumers += 1;
        }
    }
}

/// Snapshot of one hardware thread.
#[derive(Clone, Debug, Serialize)]
pub struct ThreadReport {
    /// SMT slot.
    pub thread: usize,
    /// Instructions committed.
    pub instructions: u64,
    /// Thread-local time.
    pub elapsed: SubsecondTime,
    /// Thread counters.
    pub stats: RobThreadStats,
}

impl ThreadReport {
    /// Cycles per instruction at `period`.
    pub fn cpi(&self, period: SubsecondTime) -> f64 {
        if self.instructions == 0 || period.as_fs() == 0 {
            return 0.0;
        }
        self.elapsed.as_fs() as f64 / period.as_fs() as f64 / self.instructions as f64
    }
}

/// Snapshot of one ROB timer.
#[derive(Clone, Debug, Serialize)]
pub struct TimerReport {
    /// Core clock period.
    pub period: SubsecondTime,
    /// Per-thread snapshots.
    pub threads: Vec<ThreadReport>,
    /// Time jumped over by single-thread event skipping.
    pub time_skipped: SubsecondTime,
    /// Load queue occupancy statistics.
    pub load_queue: ContentionStats,
    /// Store queue occupancy statistics.
    pub store_queue: ContentionStats,
    /// Serializing micro-ops issued.
    pub serializations: u64,
    /// Memory fences issued.
    pub mfences: u64,
}

impl TimerReport {
    /// Prints the report to stdout.
    pub fn print(&self) {
        let period = self.period;
        let cycles = |t: SubsecondTime| t.divide_rounded(period);
        println!("\n==========================================================");
        println!("ROB TIMER STATISTICS");
        println!("==========================================================");
        println!("time_skipped             {} cycles", cycles(self.time_skipped));
        println!("serializations           {}", self.serializations);
        println!("mfences                  {}", self.mfences);
        println!(
            "load_queue               {} requests, {} cycles delay",
            self.load_queue.requests,
            cycles(self.load_queue.total_delay)
        );
        println!(
            "store_queue              {} requests, {} cycles delay",
            self.store_queue.requests,
            cycles(self.store_queue.total_delay)
        );
        for thread in &self.threads {
            let s = &thread.stats;
            println!("----------------------------------------------------------");
            println!("THREAD {}", thread.thread);
            println!("  instructions           {}", thread.instructions);
            println!("  cycles                 {}", cycles(thread.elapsed));
            println!("  cpi                    {:.4}", thread.cpi(period));
            println!("  uops                   {}", s.uops_total);
            println!(
                "  loads                  {} (avg {:.2} cycles)",
                s.loads_count,
                average(cycles(s.loads_latency), s.loads_count)
            );
            println!(
                "  stores                 {} (avg {:.2} cycles)",
                s.stores_count,
                average(cycles(s.stores_latency), s.stores_count)
            );
            if s.branch_predictions > 0 {
                println!(
                    "  bp.mispredicts         {} / {}",
                    s.branch_mispredictions, s.branch_predictions
                );
            }
            let total = s.cpi.total();
            for (key, time) in s.cpi.entries() {
                let share = if total.as_fs() == 0 {
                    0.0
                } else {
                    time.as_fs() as f64 / total.as_fs() as f64 * 100.0
                };
                println!("  {key:<26} {:>10} ({share:.2}%)", cycles(time));
            }
        }
        println!("==========================================================");
    }
}

fn average(sum: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}
