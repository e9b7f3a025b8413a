use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::aggregate::SingleSamplePolicy;

/// Relaxed FIFO benchmark harness - drives the queue benchmark and post-processes its results
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Verbose output (debug level unless RUST_LOG says otherwise)
    #[clap(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Also write an uncolored log to this file
    #[clap(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate `implementation,threads,value` rows into per-implementation .dat files
    Convert(ConvertArgs),

    /// Aggregate parameter tuning performance and quality files into a mean/stdev report
    Tune(TuneArgs),

    /// Pair the first performance and quality samples of a tuning run
    TunePairs(TuneArgs),

    /// Run a weak-scaling sweep over a family of graph files
    Weakscale(WeakscaleArgs),

    /// Combine producer-consumer result files into one CSV
    Prodcon(ProdconArgs),

    /// Compute the fill/empty time ratio of two result files
    FillRatio(FillRatioArgs),

    /// Build the benchmark and run the full experiment sweep
    Master(MasterArgs),
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Raw CSV data file
    pub input: Option<PathBuf>,

    /// Output file prefix
    pub prefix: Option<String>,

    /// Directory for the .dat files
    #[clap(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// How to treat a thread count with a single trial
    #[clap(long, value_enum, default_value_t = SingleSamplePolicy::Reject)]
    pub single_sample: SingleSamplePolicy,
}

#[derive(clap::Args, Debug)]
pub struct TuneArgs {
    /// Performance CSV data file
    pub performance: Option<PathBuf>,

    /// Quality CSV data file
    pub quality: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct WeakscaleArgs {
    /// Benchmark executable
    pub exe: Option<PathBuf>,

    /// Graph path without the thread count and .gr suffix
    pub graph: Option<PathBuf>,

    /// Benchmark mode passed as the first argument
    #[clap(default_value_t = crate::defaults::WEAK_SCALING_MODE)]
    pub mode: u32,

    /// Extra arguments passed through to every run
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,

    /// Working directory for the runs and the combined file
    #[clap(long, default_value = ".")]
    pub dir: PathBuf,

    /// Kill a run that takes longer than this (e.g. "30m")
    #[clap(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,
}

#[derive(clap::Args, Debug)]
pub struct ProdconArgs {
    /// Total thread count of the producer-consumer runs
    pub threads: Option<String>,

    /// Directory holding the raw result files
    #[clap(long, default_value = ".")]
    pub dir: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct FillRatioArgs {
    /// Fill benchmark CSV data file
    pub fill: Option<PathBuf>,

    /// Empty benchmark CSV data file
    pub empty: Option<PathBuf>,

    #[clap(short = 'o', long, default_value = crate::aggregate::ratio::FILL_EMPTY_OUTPUT)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct MasterArgs {
    /// Thread count for parameter tuning and producer-consumer (empty: all cores)
    pub threads: Option<String>,

    /// Comma-separated experiments (tuning,performance,quality,prodcon,bfs or all)
    pub experiments: Option<String>,

    /// Implementation filter patterns
    pub patterns: Vec<String>,

    /// Directory holding graphs/ and receiving raw/ and data/
    #[clap(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Repository root to build (defaults to the parent of the work directory)
    #[clap(long)]
    pub root: Option<PathBuf>,

    /// Benchmark executable (defaults to the build output under the root)
    #[clap(long)]
    pub exe: Option<PathBuf>,

    /// Repeats per benchmark
    #[clap(short = 'r', long, default_value_t = crate::defaults::REPEATS)]
    pub repeats: usize,

    /// Do not run the CMake build first
    #[clap(long, default_value_t = false)]
    pub skip_build: bool,

    /// Kill a benchmark run that takes longer than this (e.g. "2h")
    #[clap(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,
}

/// Experiments the sweep can run for each implementation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Experiment {
    Tuning,
    Performance,
    Quality,
    Prodcon,
    Bfs,
}

impl std::fmt::Display for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Experiment::Tuning => write!(f, "tuning"),
            Experiment::Performance => write!(f, "performance"),
            Experiment::Quality => write!(f, "quality"),
            Experiment::Prodcon => write!(f, "prodcon"),
            Experiment::Bfs => write!(f, "bfs"),
        }
    }
}

impl Experiment {
    /// Sweep order
    pub const ALL: [Experiment; 5] = [
        Experiment::Tuning,
        Experiment::Bfs,
        Experiment::Performance,
        Experiment::Quality,
        Experiment::Prodcon,
    ];

    /// Parse a comma-separated list; `all` or an empty list selects every experiment
    pub fn parse_list(list: &str) -> Result<Vec<Experiment>> {
        let mut selected = Vec::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if name.eq_ignore_ascii_case("all") {
                return Ok(Self::ALL.to_vec());
            }
            let experiment = Experiment::from_str(name, true)
                .map_err(|_| anyhow::anyhow!("unknown experiment '{}'", name))?;
            if !selected.contains(&experiment) {
                selected.push(experiment);
            }
        }
        if selected.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        Ok(selected)
    }
}

/// Parse a thread count; empty or missing means "all cores"
pub fn parse_threads(raw: Option<&str>, cpus: usize) -> Result<usize> {
    match raw.map(str::trim) {
        None | Some("") => Ok(cpus),
        Some(s) => {
            let threads: usize = s
                .parse()
                .with_context(|| format!("invalid thread count '{}'", s))?;
            if threads == 0 {
                bail!("thread count must be greater than 0");
            }
            Ok(threads)
        }
    }
}

/// Ask on stdin for a value that was not given on the command line
pub fn prompt(message: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", message)?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// Use `value` if present, otherwise prompt for a path
pub fn path_or_prompt(value: Option<PathBuf>, message: &str) -> Result<PathBuf> {
    match value {
        Some(path) => Ok(path),
        None => Ok(PathBuf::from(prompt(message)?)),
    }
}

/// Parse duration from string (e.g., "10s", "5m", "1h")
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s")
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    let seconds = match unit {
        "ms" => num / 1000.0,
        "s" => num,
        "m" => num * 60.0,
        "h" => num * 3600.0,
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    // Negative, NaN and overflowing values are rejected, not panicked on
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("Invalid duration {}: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));

        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("invalid").is_err());
    }

    #[test]
    fn test_parse_duration_rejects_out_of_range() {
        for bad in ["-1s", "-5m", "-100ms", "nan", "NaNs", "inf", "1e30h"] {
            let err = parse_duration(bad).unwrap_err();
            assert!(err.starts_with("Invalid duration"), "{}: {}", bad, err);
        }
    }

    #[test]
    fn test_bad_timeout_is_a_usage_error() {
        let parsed = Args::try_parse_from([
            "fifo-harness",
            "master",
            "--timeout=-1s",
            "--skip-build",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_experiment_parse_list() {
        assert_eq!(
            Experiment::parse_list("bfs,tuning").unwrap(),
            vec![Experiment::Bfs, Experiment::Tuning]
        );
        assert_eq!(
            Experiment::parse_list(" quality , quality ").unwrap(),
            vec![Experiment::Quality]
        );
        assert_eq!(Experiment::parse_list("all").unwrap(), Experiment::ALL.to_vec());
        assert_eq!(Experiment::parse_list("").unwrap(), Experiment::ALL.to_vec());
        assert!(Experiment::parse_list("latency").is_err());
    }

    #[test]
    fn test_experiment_display() {
        assert_eq!(Experiment::Prodcon.to_string(), "prodcon");
        assert_eq!(Experiment::Tuning.to_string(), "tuning");
    }

    #[test]
    fn test_parse_threads() {
        assert_eq!(parse_threads(None, 8).unwrap(), 8);
        assert_eq!(parse_threads(Some(""), 8).unwrap(), 8);
        assert_eq!(parse_threads(Some("64"), 8).unwrap(), 64);
        assert!(parse_threads(Some("0"), 8).is_err());
        assert!(parse_threads(Some("many"), 8).is_err());
    }

    #[test]
    fn test_master_positionals() {
        let args = Args::parse_from([
            "fifo-harness",
            "master",
            "16",
            "bfs,prodcon",
            ".*bbq.*",
            ".*lcrq",
            "--skip-build",
        ]);
        match args.command {
            Command::Master(m) => {
                assert_eq!(m.threads.as_deref(), Some("16"));
                assert_eq!(m.experiments.as_deref(), Some("bfs,prodcon"));
                assert_eq!(m.patterns, vec![".*bbq.*", ".*lcrq"]);
                assert!(m.skip_build);
                assert_eq!(m.repeats, crate::defaults::REPEATS);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_weakscale_passes_extra_flags_through() {
        let args = Args::parse_from([
            "fifo-harness",
            "weakscale",
            "--dir",
            "raw",
            "./fifo",
            "graphs/ws/road_t_",
            "7",
            "-i",
            "bbq",
            "-q",
        ]);
        match args.command {
            Command::Weakscale(w) => {
                assert_eq!(w.dir, PathBuf::from("raw"));
                assert_eq!(w.mode, 7);
                assert_eq!(w.extra, vec!["-i", "bbq", "-q"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
