//! Configuration system for the timing core.
//!
//! This module defines every parameter the timing models read. It provides:
//! 1. **Defaults:** Baseline core, ROB-timer, IOCOOM, branch predictor and memory constants.
//! 2. **Structures:** Hierarchical config for the core, the ROB timer, IOCOOM, branch prediction and memory.
//! 3. **Enums:** Timing model, replacement policy and branch predictor selection.
//!
//! Configuration is supplied as JSON (`Config::from_json` / `Config::from_file`);
//! every field is optional and falls back to the defaults below.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::ConfigError;
use crate::uop::instruction::InstructionType;

/// Default configuration constants for the timing core.
///
/// The values describe a Nehalem-class out-of-order core.
mod defaults {
    /// Core clock frequency in GHz.
    pub const FREQUENCY_GHZ: f64 = 2.66;

    /// Hardware threads per physical core.
    pub const SMT_THREADS: usize = 1;

    /// Micro-ops dispatched (and issued) per cycle.
    pub const DISPATCH_WIDTH: usize = 4;

    /// Reorder buffer entries shared by all hardware threads.
    pub const WINDOW_SIZE: usize = 128;

    /// Loads slower than this many cycles count as long latency.
    pub const LONG_LATENCY_CUTOFF: u64 = 30;

    /// Micro-ops committed per cycle and thread.
    pub const COMMIT_WIDTH: usize = 4;

    /// Reservation station entries.
    pub const RS_ENTRIES: usize = 36;

    /// Load queue entries.
    pub const OUTSTANDING_LOADS: usize = 48;

    /// Store queue entries.
    pub const OUTSTANDING_STORES: usize = 32;

    /// IOCOOM store buffer entries.
    pub const STORE_BUFFER_ENTRIES: usize = 20;

    /// IOCOOM concurrently outstanding loads.
    pub const IOCOOM_OUTSTANDING_LOADS: usize = 32;

    /// Branch misprediction penalty in cycles.
    pub const MISPREDICT_PENALTY: u64 = 8;

    /// Branch Target Buffer entries.
    pub const BTB_SIZE: usize = 512;

    /// Main memory latency in core cycles.
    pub const DRAM_LATENCY: u64 = 120;

    /// Default cache line size in bytes.
    pub const CACHE_LINE: usize = 64;

    /// Default cache size in bytes (32 KiB).
    pub const CACHE_SIZE: usize = 32 * 1024;

    /// Default cache associativity.
    pub const CACHE_WAYS: usize = 8;

    /// Default cache access latency in cycles.
    pub const CACHE_LATENCY: u64 = 4;
}

/// Per-instruction timing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TimingModel {
    /// Adds memory latency and a static cost per instruction.
    Simple,
    /// Counts instructions only; every static instruction takes one cycle.
    Magic,
    /// In-order core with out-of-order memory (scoreboard, store buffer, load unit).
    #[serde(alias = "IOCOOM")]
    Iocoom,
    /// Out-of-order ROB timer shared between SMT threads.
    #[default]
    RobSmt,
}

/// Cache replacement policy algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplacementPolicy {
    /// Evicts the line accessed least recently.
    #[default]
    #[serde(alias = "Lru")]
    Lru,
    /// Evicts the oldest line in the set.
    #[serde(alias = "Fifo")]
    Fifo,
}

/// Branch prediction algorithm types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BranchPredictorKind {
    /// No predictor attached: only front-end supplied mispredictions count.
    None,
    /// Always predicts not-taken.
    Static,
    /// Global history XOR PC indexed two-bit counters.
    #[default]
    GShare,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use sniper_timing::config::{Config, TimingModel};
///
/// let config = Config::default();
/// assert_eq!(config.core.model, TimingModel::RobSmt);
/// assert_eq!(config.core.dispatch_width, 4);
/// ```
///
/// Partial JSON keeps the defaults for everything it omits:
///
/// ```
/// use sniper_timing::config::{BranchPredictorKind, Config, TimingModel};
///
/// let json = r#"{
///     "core": { "model": "Iocoom", "smt_threads": 2 },
///     "rob_timer": { "in_order": true },
///     "branch_predictor": { "kind": "Static", "mispredict_penalty": 15 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.core.model, TimingModel::Iocoom);
/// assert_eq!(config.core.smt_threads, 2);
/// assert!(config.rob_timer.in_order);
/// assert_eq!(config.branch_predictor.kind, BranchPredictorKind::Static);
/// assert_eq!(config.rob_timer.commit_width, 4);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Core-wide parameters
    #[serde(default)]
    pub core: CoreConfig,
    /// ROB timer parameters
    #[serde(default)]
    pub rob_timer: RobTimerConfig,
    /// IOCOOM model parameters
    #[serde(default)]
    pub iocoom: IocoomConfig,
    /// Branch predictor parameters
    #[serde(default)]
    pub branch_predictor: BranchPredictorConfig,
    /// Memory hierarchy parameters
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed input and
    /// [`ConfigError::Invalid`] for values rejected by [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Rejects values the timing models cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if !(self.core.frequency_ghz > 0.0 && self.core.frequency_ghz.is_finite()) {
            return Err(invalid("core.frequency_ghz", "must be a positive number"));
        }
        if self.core.smt_threads == 0 {
            return Err(invalid("core.smt_threads", "must be at least 1"));
        }
        if self.core.dispatch_width == 0 {
            return Err(invalid("core.dispatch_width", "must be at least 1"));
        }
        if self.core.window_size == 0 {
            return Err(invalid("core.window_size", "must be at least 1"));
        }
        if self.core.window_size < self.core.dispatch_width {
            return Err(invalid(
                "core.window_size",
                format!(
                    "window of {} cannot hold one dispatch group of {}",
                    self.core.window_size, self.core.dispatch_width
                ),
            ));
        }
        if self.rob_timer.commit_width == 0 {
            return Err(invalid("rob_timer.commit_width", "must be at least 1"));
        }
        if self.rob_timer.rs_entries == 0 {
            return Err(invalid("rob_timer.rs_entries", "must be at least 1"));
        }
        if self.iocoom.num_store_buffer_entries == 0 {
            return Err(invalid("iocoom.num_store_buffer_entries", "must be at least 1"));
        }
        if self.iocoom.num_outstanding_loads == 0 {
            return Err(invalid("iocoom.num_outstanding_loads", "must be at least 1"));
        }
        if !self.branch_predictor.btb_size.is_power_of_two() {
            return Err(invalid("branch_predictor.btb_size", "must be a power of two"));
        }
        for (field, cache) in [
            ("memory.l1_i", &self.memory.l1_i),
            ("memory.l1_d", &self.memory.l1_d),
            ("memory.l2", &self.memory.l2),
            ("memory.l3", &self.memory.l3),
        ] {
            if cache.enabled && cache.num_sets() == 0 {
                return Err(invalid(field, "size must hold at least one set of lines"));
            }
        }
        Ok(())
    }
}

/// Core-wide parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Clock frequency in GHz
    #[serde(default = "CoreConfig::default_frequency")]
    pub frequency_ghz: f64,

    /// Per-instruction timing model
    #[serde(default)]
    pub model: TimingModel,

    /// Hardware threads sharing one ROB timer
    #[serde(default = "CoreConfig::default_smt_threads")]
    pub smt_threads: usize,

    /// Micro-ops dispatched per cycle
    #[serde(default = "CoreConfig::default_dispatch_width")]
    pub dispatch_width: usize,

    /// Reorder buffer size
    #[serde(default = "CoreConfig::default_window_size")]
    pub window_size: usize,

    /// Long-latency load threshold in cycles (0 disables the latency test)
    #[serde(default = "CoreConfig::default_long_latency_cutoff")]
    pub long_latency_cutoff: u64,

    /// Static instruction costs in cycles
    #[serde(default)]
    pub instruction_costs: InstructionCosts,
}

impl CoreConfig {
    fn default_frequency() -> f64 {
        defaults::FREQUENCY_GHZ
    }

    fn default_smt_threads() -> usize {
        defaults::SMT_THREADS
    }

    fn default_dispatch_width() -> usize {
        defaults::DISPATCH_WIDTH
    }

    fn default_window_size() -> usize {
        defaults::WINDOW_SIZE
    }

    fn default_long_latency_cutoff() -> u64 {
        defaults::LONG_LATENCY_CUTOFF
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            frequency_ghz: defaults::FREQUENCY_GHZ,
            model: TimingModel::default(),
            smt_threads: defaults::SMT_THREADS,
            dispatch_width: defaults::DISPATCH_WIDTH,
            window_size: defaults::WINDOW_SIZE,
            long_latency_cutoff: defaults::LONG_LATENCY_CUTOFF,
            instruction_costs: InstructionCosts::default(),
        }
    }
}

/// Static execution cost of each instruction class, in cycles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstructionCosts {
    /// Unclassified instructions
    pub generic: u64,
    /// Integer add
    pub add: u64,
    /// Integer subtract
    pub sub: u64,
    /// Integer multiply
    pub mul: u64,
    /// Integer divide
    pub div: u64,
    /// FP add
    pub fadd: u64,
    /// FP subtract
    pub fsub: u64,
    /// FP multiply
    pub fmul: u64,
    /// FP divide
    pub fdiv: u64,
    /// Unconditional jump
    pub jmp: u64,
    /// Conditional branch
    pub branch: u64,
}

impl InstructionCosts {
    /// Cost of `kind` in cycles. Pseudo instructions carry their own cost and
    /// report zero here.
    pub const fn cycles(&self, kind: InstructionType) -> u64 {
        match kind {
            InstructionType::Generic => self.generic,
            InstructionType::Add => self.add,
            InstructionType::Sub => self.sub,
            InstructionType::Mul => self.mul,
            InstructionType::Div => self.div,
            InstructionType::FAdd => self.fadd,
            InstructionType::FSub => self.fsub,
            InstructionType::FMul => self.fmul,
            InstructionType::FDiv => self.fdiv,
            InstructionType::Jmp => self.jmp,
            InstructionType::Branch => self.branch,
            InstructionType::Dynamic => 0,
        }
    }
}

impl Default for InstructionCosts {
    fn default() -> Self {
        Self {
            generic: 1,
            add: 1,
            sub: 1,
            mul: 3,
            div: 18,
            fadd: 3,
            fsub: 3,
            fmul: 5,
            fdiv: 6,
            jmp: 1,
            branch: 1,
        }
    }
}

/// ROB timer parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RobTimerConfig {
    /// Micro-ops committed per cycle and thread
    #[serde(default = "RobTimerConfig::default_commit_width")]
    pub commit_width: usize,

    /// Reservation station entries
    #[serde(default = "RobTimerConfig::default_rs_entries")]
    pub rs_entries: usize,

    /// Load queue size (0 means unlimited)
    #[serde(default = "RobTimerConfig::default_outstanding_loads")]
    pub outstanding_loads: usize,

    /// Store queue size (0 means unlimited)
    #[serde(default = "RobTimerConfig::default_outstanding_stores")]
    pub outstanding_stores: usize,

    /// Loads bypass the store and depend on its data producers
    #[serde(default = "RobTimerConfig::default_true")]
    pub store_to_load_forwarding: bool,

    /// Loads may pass older stores whose address is still unknown
    #[serde(default = "RobTimerConfig::default_true")]
    pub address_disambiguation: bool,

    /// Issue only from the ROB head
    #[serde(default)]
    pub in_order: bool,

    /// Split the window between running threads only
    #[serde(default = "RobTimerConfig::default_true")]
    pub rob_repartition: bool,

    /// Let several threads issue in the same cycle
    #[serde(default = "RobTimerConfig::default_true")]
    pub simultaneous_issue: bool,

    /// Collect the outstanding-load histogram
    #[serde(default)]
    pub mlp_histogram: bool,

    /// Record dispatch/issue/done/commit times of every micro-op
    #[serde(default)]
    pub commit_log: bool,
}

impl RobTimerConfig {
    fn default_commit_width() -> usize {
        defaults::COMMIT_WIDTH
    }

    fn default_rs_entries() -> usize {
        defaults::RS_ENTRIES
    }

    fn default_outstanding_loads() -> usize {
        defaults::OUTSTANDING_LOADS
    }

    fn default_outstanding_stores() -> usize {
        defaults::OUTSTANDING_STORES
    }

    fn default_true() -> bool {
        true
    }
}

impl Default for RobTimerConfig {
    fn default() -> Self {
        Self {
            commit_width: defaults::COMMIT_WIDTH,
            rs_entries: defaults::RS_ENTRIES,
            outstanding_loads: defaults::OUTSTANDING_LOADS,
            outstanding_stores: defaults::OUTSTANDING_STORES,
            store_to_load_forwarding: true,
            address_disambiguation: true,
            in_order: false,
            rob_repartition: true,
            simultaneous_issue: true,
            mlp_histogram: false,
            commit_log: false,
        }
    }
}

/// IOCOOM model parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct IocoomConfig {
    /// Store buffer entries
    #[serde(default = "IocoomConfig::default_store_buffer")]
    pub num_store_buffer_entries: usize,

    /// Concurrently outstanding loads
    #[serde(default = "IocoomConfig::default_outstanding_loads")]
    pub num_outstanding_loads: usize,
}

impl IocoomConfig {
    fn default_store_buffer() -> usize {
        defaults::STORE_BUFFER_ENTRIES
    }

    fn default_outstanding_loads() -> usize {
        defaults::IOCOOM_OUTSTANDING_LOADS
    }
}

impl Default for IocoomConfig {
    fn default() -> Self {
        Self {
            num_store_buffer_entries: defaults::STORE_BUFFER_ENTRIES,
            num_outstanding_loads: defaults::IOCOOM_OUTSTANDING_LOADS,
        }
    }
}

/// Branch predictor parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchPredictorConfig {
    /// Predictor algorithm
    #[serde(default)]
    pub kind: BranchPredictorKind,

    /// Misprediction penalty in cycles
    #[serde(default = "BranchPredictorConfig::default_penalty")]
    pub mispredict_penalty: u64,

    /// Branch Target Buffer entries (power of two)
    #[serde(default = "BranchPredictorConfig::default_btb_size")]
    pub btb_size: usize,
}

impl BranchPredictorConfig {
    fn default_penalty() -> u64 {
        defaults::MISPREDICT_PENALTY
    }

    fn default_btb_size() -> usize {
        defaults::BTB_SIZE
    }
}

impl Default for BranchPredictorConfig {
    fn default() -> Self {
        Self {
            kind: BranchPredictorKind::default(),
            mispredict_penalty: defaults::MISPREDICT_PENALTY,
            btb_size: defaults::BTB_SIZE,
        }
    }
}

/// Memory hierarchy parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// L1 instruction cache
    #[serde(default = "MemoryConfig::default_l1")]
    pub l1_i: CacheConfig,
    /// L1 data cache
    #[serde(default = "MemoryConfig::default_l1")]
    pub l1_d: CacheConfig,
    /// Unified L2
    #[serde(default = "MemoryConfig::default_l2")]
    pub l2: CacheConfig,
    /// Unified L3 (disabled by default)
    #[serde(default)]
    pub l3: CacheConfig,
    /// Main memory latency in cycles
    #[serde(default = "MemoryConfig::default_dram_latency")]
    pub dram_latency: u64,
}

impl MemoryConfig {
    fn default_l1() -> CacheConfig {
        CacheConfig {
            enabled: true,
            ..CacheConfig::default()
        }
    }

    fn default_l2() -> CacheConfig {
        CacheConfig {
            enabled: true,
            size_bytes: 256 * 1024,
            latency: 8,
            ..CacheConfig::default()
        }
    }

    fn default_dram_latency() -> u64 {
        defaults::DRAM_LATENCY
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            l1_i: Self::default_l1(),
            l1_d: Self::default_l1(),
            l2: Self::default_l2(),
            l3: CacheConfig::default(),
            dram_latency: defaults::DRAM_LATENCY,
        }
    }
}

/// Individual cache level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Enable this cache level
    #[serde(default)]
    pub enabled: bool,

    /// Total cache size in bytes
    #[serde(default = "CacheConfig::default_size")]
    pub size_bytes: usize,

    /// Cache line size in bytes
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: usize,

    /// Associativity (number of ways)
    #[serde(default = "CacheConfig::default_ways")]
    pub ways: usize,

    /// Replacement policy
    #[serde(default)]
    pub policy: ReplacementPolicy,

    /// Access latency in cycles
    #[serde(default = "CacheConfig::default_latency")]
    pub latency: u64,
}

impl CacheConfig {
    fn default_size() -> usize {
        defaults::CACHE_SIZE
    }

    fn default_line() -> usize {
        defaults::CACHE_LINE
    }

    fn default_ways() -> usize {
        defaults::CACHE_WAYS
    }

    fn default_latency() -> u64 {
        defaults::CACHE_LATENCY
    }

    /// Number of sets this geometry yields (zero for degenerate geometries).
    pub fn num_sets(&self) -> usize {
        if self.line_bytes == 0 || self.ways == 0 {
            return 0;
        }
        self.size_bytes / self.line_bytes / self.ways
    }
}

impl Default for CacheConfig {
    /// Disabled 32 KiB, 8-way, LRU cache.
    fn default() -> Self {
        Self {
            enabled: false,
            size_bytes: defaults::CACHE_SIZE,
            line_bytes: defaults::CACHE_LINE,
            ways: defaults::CACHE_WAYS,
            policy: ReplacementPolicy::default(),
            latency: defaults::CACHE_LATENCY,
        }
    }
}
