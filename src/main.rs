use std::path::PathBuf;

use anyhow::{Context, Result};
use cache_sim::{
    config::{CacheConfig, ReplacementPolicy},
    experiments::{self, ScenarioConfig, ScenarioResult},
    simulator::Simulator,
    stats::StatsError,
    trace::{ParseMode, TraceFile},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cachesim", author, version, about = "Set-associative cache simulator")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run each trace through one cache configuration
    Run {
        #[command(flatten)]
        cache: CacheArgs,

        #[command(flatten)]
        input: TraceArgs,
    },
    /// Vary one cache parameter and compare hit rates
    Sweep {
        #[command(flatten)]
        cache: CacheArgs,

        /// Parameter to vary
        #[arg(long, value_enum)]
        vary: SweepParam,

        /// Values to try (bytes or ways; ignored for policy)
        #[arg(long, value_delimiter = ',')]
        values: Vec<u64>,

        #[command(flatten)]
        input: TraceArgs,
    },
}

#[derive(Args, Debug)]
struct CacheArgs {
    /// Block size in bytes (power of two)
    #[arg(short, long, default_value_t = 32)]
    block_size: u64,

    /// Lines per set (power of two)
    #[arg(short, long, default_value_t = 4)]
    associativity: usize,

    /// Total capacity in bytes (power of two)
    #[arg(short, long, default_value_t = 256 * 1024)]
    capacity: u64,

    #[arg(short, long, value_enum, default_value_t = PolicyArg::Lru)]
    policy: PolicyArg,
}

impl CacheArgs {
    fn to_config(&self) -> Result<CacheConfig> {
        CacheConfig::new(
            self.block_size,
            self.associativity,
            self.capacity,
            self.policy.into(),
        )
        .context("Invalid cache configuration")
    }
}

#[derive(Args, Debug)]
struct TraceArgs {
    /// Skip malformed trace lines instead of aborting
    #[arg(long)]
    lenient: bool,

    /// Trace files, one access per line: `l|s <hex address> ...`
    #[arg(required = true)]
    traces: Vec<PathBuf>,
}

impl TraceArgs {
    fn load(&self) -> Result<Vec<TraceFile>> {
        let mode = if self.lenient {
            ParseMode::Lenient
        } else {
            ParseMode::Strict
        };
        self.traces
            .iter()
            .map(|path| TraceFile::load(path, mode))
            .collect()
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PolicyArg {
    Lru,
    Fifo,
}

impl From<PolicyArg> for ReplacementPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Lru => ReplacementPolicy::AgeRankLru,
            PolicyArg::Fifo => ReplacementPolicy::Fifo,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SweepParam {
    BlockSize,
    Associativity,
    Capacity,
    Policy,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run { cache, input } => run(&cache, &input),
        Command::Sweep {
            cache,
            vary,
            values,
            input,
        } => sweep(&cache, vary, &values, &input),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cache: &CacheArgs, input: &TraceArgs) -> Result<()> {
    let config = cache.to_config()?;
    let traces = input.load()?;

    for trace in &traces {
        let mut sim = Simulator::new(config.clone());
        sim.run_trace(&trace.entries);
        println!("\n== {} ==", trace.name);
        print_properties(sim.config());
        println!("\nCache Hit Rate Data:");
        match sim.report() {
            Ok(report) => println!("{report}"),
            Err(StatsError::NoData) => println!("No accesses in trace"),
        }
        if trace.skipped > 0 {
            println!("Skipped lines: {}", trace.skipped);
        }
    }
    Ok(())
}

fn print_properties(config: &CacheConfig) {
    println!("Cache Properties:");
    println!("Number of sets: {}", config.num_sets());
    println!("Number of blocks in each set: {}", config.associativity());
    println!("Block size (Bytes): {}", config.block_size());
    println!("Associativity: {}", config.associativity_label());
    println!("Replacement policy: {}", config.policy());
    println!("Cache Size (Bytes): {}", config.capacity());
}

fn sweep(cache: &CacheArgs, vary: SweepParam, values: &[u64], input: &TraceArgs) -> Result<()> {
    let base = cache.to_config()?;
    let traces = input.load()?;

    let scenarios: Vec<ScenarioConfig> = match vary {
        SweepParam::BlockSize => experiments::block_sizes(&base, values),
        SweepParam::Associativity => {
            let ways: Vec<usize> = values.iter().map(|&v| v as usize).collect();
            experiments::associativities(&base, &ways)
        }
        SweepParam::Capacity => experiments::capacities(&base, values),
        SweepParam::Policy => Ok(experiments::policies(&base)),
    }
    .context("Sweep produced an invalid cache configuration")?;
    let results = experiments::run_scenarios(&traces, &scenarios);
    print_section(&format!("{vary:?} sweep"), &results);
    Ok(())
}

fn print_section(title: &str, results: &[ScenarioResult]) {
    println!("\n== {title} ==");
    for scenario in results {
        print!("{scenario}");
    }
}
