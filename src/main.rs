//! # Relaxed FIFO Benchmark Harness - Main Entry Point
//!
//! Parses the command line, installs logging, and dispatches to one
//! subcommand:
//!
//! - `convert`, `tune`, `tune-pairs`, `prodcon`, `fill-ratio`: post-process
//!   existing raw result files
//! - `weakscale`: run the executable over a weak-scaling graph family
//! - `master`: build the executable and run the full sweep
//!
//! ## Error Handling
//!
//! Every subcommand returns `anyhow::Result`. The first error ends the
//! process with a `!!!` line and a non-zero exit code. The sweep is the
//! exception: it records per-unit failures and keeps going.

use anyhow::{Context, Result};
use clap::Parser;
use fifo_harness::{
    aggregate,
    cli::{
        self, Args, Command, ConvertArgs, FillRatioArgs, MasterArgs, ProdconArgs, TuneArgs,
        WeakscaleArgs,
    },
    exec::{BenchmarkMode, ProcessInvoker},
    logging::{self, FAILURE},
    orchestrator::{Orchestrator, SweepConfig},
    utils::get_cpu_cores,
    weakscaling::{WeakScalingDriver, WeakScalingJob},
};
use std::path::Path;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Keep the guard alive so the file writer flushes on exit
    let _guard = match logging::init(args.verbose, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} failed to initialize logging: {:#}", FAILURE, e);
            std::process::exit(2);
        }
    };

    debug!("Configuration: {:?}", args);

    if let Err(e) = run(args.command).await {
        error!("{} {:#}", FAILURE, e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Convert(args) => run_convert(args),
        Command::Tune(args) => run_tune(args),
        Command::TunePairs(args) => run_tune_pairs(args),
        Command::Weakscale(args) => run_weakscale(args).await,
        Command::Prodcon(args) => run_prodcon(args),
        Command::FillRatio(args) => run_fill_ratio(args),
        Command::Master(args) => run_master(args).await,
    }
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let input = cli::path_or_prompt(args.input, "Enter the CSV data file: ")?;
    let prefix = match args.prefix {
        Some(prefix) => prefix,
        None => cli::prompt("Enter the output prefix: ")?,
    };

    let written = aggregate::convert(&input, &args.out_dir, &prefix, args.single_sample)?;
    info!("Converted {} into {} file(s)", input.display(), written.len());
    Ok(())
}

fn run_tune(args: TuneArgs) -> Result<()> {
    let performance = cli::path_or_prompt(args.performance, "Enter the performance CSV data file: ")?;
    let quality = cli::path_or_prompt(args.quality, "Enter the quality CSV data file: ")?;

    let report = aggregate::tune(&performance, &quality)?;
    emit(&report.render(), args.output.as_deref())
}

fn run_tune_pairs(args: TuneArgs) -> Result<()> {
    let performance = cli::path_or_prompt(args.performance, "Enter the performance CSV data file: ")?;
    let quality = cli::path_or_prompt(args.quality, "Enter the quality CSV data file: ")?;

    let series = aggregate::pair_first_samples(&performance, &quality)?;
    emit(&aggregate::pairs::render(&series), args.output.as_deref())
}

async fn run_weakscale(args: WeakscaleArgs) -> Result<()> {
    let executable = cli::path_or_prompt(args.exe, "Enter the benchmark executable: ")?;
    let graph = cli::path_or_prompt(args.graph, "Enter the graph path prefix: ")?;

    let job = WeakScalingJob {
        executable,
        directory: args.dir,
        graph,
        mode: BenchmarkMode::from(args.mode),
        extra_args: args.extra,
    };
    let invoker = ProcessInvoker::new(args.timeout);
    let combined = WeakScalingDriver::new(&invoker, get_cpu_cores())
        .run(&job)
        .await?;
    info!("Weak scaling results in {}", combined.display());
    Ok(())
}

fn run_prodcon(args: ProdconArgs) -> Result<()> {
    let cpus = get_cpu_cores();
    let raw = match args.threads {
        Some(threads) => threads,
        None => cli::prompt(&format!("Enter the thread count (empty for {}): ", cpus))?,
    };
    let threads = cli::parse_threads(Some(&raw), cpus)?;

    let combined = aggregate::combine_producer_consumer(&args.dir, threads)?;
    info!("Producer-consumer results in {}", combined.display());
    Ok(())
}

fn run_fill_ratio(args: FillRatioArgs) -> Result<()> {
    let fill = cli::path_or_prompt(args.fill, "Enter the fill CSV data file: ")?;
    let empty = cli::path_or_prompt(args.empty, "Enter the empty CSV data file: ")?;

    let rows = aggregate::fill_empty_ratio(&fill, &empty, &args.output)?;
    info!("Wrote {} ratio row(s) to {}", rows, args.output.display());
    Ok(())
}

async fn run_master(mut args: MasterArgs) -> Result<()> {
    let cpus = get_cpu_cores();
    if args.threads.is_none() {
        args.threads = Some(cli::prompt(&format!(
            "Enter the thread count for tuning and producer-consumer (empty for {}): ",
            cpus
        ))?);
    }
    if args.experiments.is_none() {
        args.experiments = Some(cli::prompt(
            "Enter the experiments (tuning,performance,quality,prodcon,bfs; empty for all): ",
        )?);
    }

    let config = SweepConfig::from_args(&args)?;
    info!("Starting sweep in {}", config.workdir.display());
    debug!("Sweep configuration: {:?}", config);

    // --timeout applies to benchmark runs only
    let builder = ProcessInvoker::default();
    let invoker = ProcessInvoker::new(config.timeout);
    let report = Orchestrator::new(config, &builder, &invoker).run().await?;

    info!(
        "Sweep finished: {} completed, {} without result, {} failed",
        report.summary.completed, report.summary.no_result, report.summary.failed
    );
    Ok(())
}

/// Write a text report to `output`, or stdout when no file was given
fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
