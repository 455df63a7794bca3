//! Sniper timing core CLI.
//!
//! This binary drives the timing models with synthetic instruction streams. It performs:
//! 1. **Run:** One host thread per simulated core feeds its performance model; SMT siblings
//!    share a ROB timer through the barrier.
//! 2. **Check:** Loads and validates a JSON configuration and prints the resolved values.

mod workload;

use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sniper_timing::common::{ComponentPeriod, SubsecondTime, TimingError};
use sniper_timing::config::{Config, TimingModel};
use sniper_timing::core::model::RobTimerRegistry;
use sniper_timing::core::units::cache::CacheStats;
use sniper_timing::core::units::memory::{CacheHierarchy, MemoryAccess, MemoryHierarchy};
use sniper_timing::stats::TimerReport;
use sniper_timing::uop::instruction::{DynamicInstruction, DynamicInstructionInfo, Direction, Operand};
use sniper_timing::{PerformanceModel, RobSmtTimer};

use crate::workload::Workload;

#[derive(Parser, Debug)]
#[command(
    name = "sniper-timing",
    author,
    version,
    about = "Multicore SMT timing core",
    long_about = "Drive the Simple, Magic, IOCOOM or ROB timing model with a synthetic workload.\n\nExamples:\n  sniper-timing run --workload mixed --instructions 100000\n  sniper-timing run --model iocoom --threads 4 --json\n  sniper-timing check --config core.json"
)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. `debug` or `rob_timer=trace`.
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Time a synthetic workload on every simulated core.
    Run {
        /// JSON configuration file; built-in defaults otherwise.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Performance model (overrides `core.model`).
        #[arg(short, long, value_enum)]
        model: Option<ModelArg>,

        /// Instruction stream fed to every core.
        #[arg(short, long, value_enum, default_value = "mixed")]
        workload: Workload,

        /// Instructions per core.
        #[arg(short = 'n', long, default_value_t = 100_000)]
        instructions: u64,

        /// Simulated cores, each driven by its own host thread.
        #[arg(short, long, default_value_t = 1)]
        threads: usize,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file.
    Check {
        /// JSON configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModelArg {
    Simple,
    Magic,
    Iocoom,
    RobSmt,
}

impl From<ModelArg> for TimingModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Simple => Self::Simple,
            ModelArg::Magic => Self::Magic,
            ModelArg::Iocoom => Self::Iocoom,
            ModelArg::RobSmt => Self::RobSmt,
        }
    }
}

/// Result of one simulated core.
#[derive(Debug, Serialize)]
struct CoreSummary {
    core: usize,
    instructions: u64,
    cycles: u64,
    elapsed: SubsecondTime,
    ipc: f64,
    caches: [CacheStats; 4],
}

#[derive(Debug, Serialize)]
struct RunSummary {
    model: String,
    workload: String,
    cores: Vec<CoreSummary>,
    rob_timers: Vec<TimerReport>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    let result = match cli.command {
        Commands::Run {
            config,
            model,
            workload,
            instructions,
            threads,
            json,
        } => cmd_run(config, model, workload, instructions, threads, json),
        Commands::Check { config } => cmd_check(&config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_logging(filter: Option<&str>) {
    let filter = filter.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        EnvFilter::new,
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config, String> {
    match path {
        Some(path) => Config::from_file(path).map_err(|e| format!("{}: {e}", path.display())),
        None => Ok(Config::default()),
    }
}

fn cmd_check(path: &Path) -> Result<(), String> {
    let config = load_config(Some(path))?;
    println!("{}: ok", path.display());
    println!("{config:#?}");
    Ok(())
}

/// Builds one model per core, runs every core on its own host thread and
/// prints the per-core results followed by the ROB timer reports.
fn cmd_run(
    config_path: Option<PathBuf>,
    model: Option<ModelArg>,
    workload: Workload,
    instructions: u64,
    threads: usize,
    json: bool,
) -> Result<(), String> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(model) = model {
        config.core.model = model.into();
    }
    config.validate().map_err(|e| e.to_string())?;
    if threads == 0 {
        return Err("--threads must be at least 1".to_owned());
    }

    let period = ComponentPeriod::from_ghz(config.core.frequency_ghz);
    let mut registry = RobTimerRegistry::new();
    let models: Vec<PerformanceModel> = (0..threads)
        .map(|core| {
            let fetch = Box::new(CacheHierarchy::new(&config.memory, period));
            PerformanceModel::create(&config, core, Some(core as u64), fetch, &mut registry, None)
        })
        .collect();
    info!(
        cores = threads,
        model = ?config.core.model,
        workload = ?workload,
        smt_groups = registry.len(),
        "starting run"
    );

    let results: Vec<Result<CoreSummary, String>> = thread::scope(|s| {
        let handles: Vec<_> = models
            .into_iter()
            .enumerate()
            .map(|(core, model)| {
                let memory = CacheHierarchy::new(&config.memory, period);
                s.spawn(move || run_core(core, model, memory, workload, instructions, period))
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(core, h)| match h.join() {
                Ok(result) => result.map_err(|e| format!("core {core}: {e}")),
                Err(_) => Err(format!("core {core}: host thread panicked")),
            })
            .collect()
    });

    let mut cores = Vec::with_capacity(results.len());
    for result in results {
        cores.push(result?);
    }
    let rob_timers: Vec<TimerReport> = registry
        .iter()
        .map(|(_, timer)| timer.with_engine(RobSmtTimer::report))
        .collect();

    let summary = RunSummary {
        model: format!("{:?}", config.core.model),
        workload: format!("{workload:?}"),
        cores,
        rob_timers,
    };
    if json {
        let text = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Feeds `instructions` instructions of `workload` to `model`.
///
/// `memory` plays the functional front end: it resolves every memory
/// operand and the result is queued as dynamic information before the
/// instruction is timed.
fn run_core(
    core: usize,
    mut model: PerformanceModel,
    mut memory: CacheHierarchy,
    workload: Workload,
    instructions: u64,
    period: ComponentPeriod,
) -> Result<CoreSummary, TimingError> {
    for i in 0..instructions {
        let insn = workload::instruction(workload, core, i);
        push_memory_info(&mut model, &mut memory, &insn);
        if !model.handle_instruction(&insn)? {
            warn!(core, i, "instruction skipped: memory information missing");
        }
    }
    model.finish()?;

    let elapsed = model.elapsed_time();
    let cycles = elapsed.divide_rounded(period.period());
    let instructions = model.instruction_count();
    Ok(CoreSummary {
        core,
        instructions,
        cycles,
        elapsed,
        ipc: if cycles == 0 {
            0.0
        } else {
            instructions as f64 / cycles as f64
        },
        caches: memory.stats(),
    })
}

fn push_memory_info(model: &mut PerformanceModel, memory: &mut CacheHierarchy, insn: &DynamicInstruction) {
    let ip = insn.instruction.address;
    let mut addresses = insn.addresses.iter().copied();
    for operand in &insn.instruction.operands {
        let Operand::Memory { direction, .. } = *operand else {
            continue;
        };
        let address = addresses.next().unwrap_or(0);
        let info = match direction {
            Direction::Read => {
                let result = memory.access(MemoryAccess::read(address, 8));
                DynamicInstructionInfo::memory_read(ip, address, result.latency, result.hit_where)
            }
            Direction::Write => {
                let result = memory.access(MemoryAccess::write(address, 8));
                DynamicInstructionInfo::memory_write(ip, address, result.latency, result.hit_where)
            }
        };
        model.push_dynamic_info(info);
    }
}

fn print_summary(summary: &RunSummary) {
    println!("model: {}  workload: {}", summary.model, summary.workload);
    println!();
    println!("core  instructions        cycles     IPC   L1-D hits/misses   L2 hits/misses");
    for core in &summary.cores {
        let [_, l1d, l2, _] = core.caches;
        println!(
            "{:>4}  {:>12}  {:>12}  {:>6.3}   {:>8}/{:<8}   {:>7}/{:<7}",
            core.core, core.instructions, core.cycles, core.ipc, l1d.hits, l1d.misses, l2.hits, l2.misses
        );
    }
    for report in &summary.rob_timers {
        report.print();
    }
}
