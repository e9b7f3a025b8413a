//! # Relaxed FIFO Benchmark Harness Library
//!
//! Drives an external concurrent-FIFO benchmark executable and turns the raw
//! CSV files it writes into plot-ready datasets.
//!
//! ## Pipeline
//!
//! ```text
//! executable --(stderr: result path)--> raw/*.csv --aggregate--> data/*.dat
//! ```
//!
//! The executable is a black box: it takes a benchmark mode and flags, runs
//! the measurement, writes a headerless CSV file, and prints that file's
//! path on standard error. Everything else happens here.
//!
//! ## Architecture Overview
//!
//! - `row`: classifies CSV rows into key, variant and metric
//! - `stats`: mean and sample standard deviation
//! - `aggregate`: single-source, dual-source and paired aggregation
//! - `exec`: the executable contract and the `Invoker` seam
//! - `weakscaling`: per-thread-count runs over a graph family
//! - `orchestrator`: the build plus the full experiment sweep
//! - `results`: the JSON sweep report
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use fifo_harness::aggregate::{convert, SingleSamplePolicy};
//! use std::path::Path;
//!
//! fn main() -> fifo_harness::Result<()> {
//!     let written = convert(
//!         Path::new("raw/fifo-performance-0001.csv"),
//!         Path::new("data"),
//!         "performance",
//!         SingleSamplePolicy::Reject,
//!     )?;
//!     println!("wrote {} series", written.len());
//!     Ok(())
//! }
//! ```

/// Aggregation of raw result files
///
/// - `convert`: `implementation,threads,value` rows into one `.dat` per implementation
/// - `tuning`: performance and quality files into a mean/stdev report
/// - `pairs`: first performance and quality sample per configuration
/// - `prodcon`: producer-consumer split files into one CSV
/// - `ratio`: fill/empty time ratio
pub mod aggregate;

/// Command-line interface and configuration
///
/// Subcommands for every aggregation, the weak-scaling driver and the
/// sweep. Missing positional paths are prompted for on stdin.
pub mod cli;

pub mod error;

/// External executable contract, child process handling and timeouts
pub mod exec;

pub mod logging;

/// Full sweep: build, then every experiment for every implementation pattern
pub mod orchestrator;

/// Sweep outcome collection and the JSON report
pub mod results;

pub mod row;

pub mod stats;

pub mod utils;

pub mod weakscaling;

pub use aggregate::{convert, tune, SingleSamplePolicy};
pub use cli::{Args, Experiment};
pub use error::{HarnessError, Result};
pub use exec::{BenchmarkMode, Invocation, Invoker, ProcessInvoker};
pub use orchestrator::{Orchestrator, SweepConfig};
pub use results::{ResultsManager, SweepReport};
pub use weakscaling::{WeakScalingDriver, WeakScalingJob};

/// The current version of the harness
///
/// Populated from Cargo.toml and recorded in the sweep report.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Repeats per benchmark run in a sweep
    ///
    /// Two is the smallest count that gives a sample standard deviation.
    pub const REPEATS: usize = 2;

    /// Benchmark mode of the weak-scaling subcommand (BFS)
    pub const WEAK_SCALING_MODE: u32 = 7;

    /// Implementation filters swept when none are given
    pub const PATTERNS: [&str; 6] = [
        ".*bbq.*",
        ".*multififo.*",
        ".*kfifo.*",
        ".*dcbo.*",
        ".*lcrq",
        ".*faaaqueue.*",
    ];

    /// Build output, relative to the repository root
    pub const EXECUTABLE: &str = "build/relaxed_concurrent_fifo/relaxed_concurrent_fifo.exe";

    /// Raw results, relative to the work directory
    pub const RAW_DIR: &str = "raw";

    /// Aggregated datasets, relative to the work directory
    pub const DATA_DIR: &str = "data";

    pub const SS_GRAPHS_DIR: &str = "graphs/ss";

    pub const WS_GRAPHS_DIR: &str = "graphs/ws";

    /// Sweep report, relative to the data directory
    pub const REPORT_FILE: &str = "sweep-report.json";
}
