//! # Sweep Orchestrator
//!
//! Builds the benchmark, then runs every enabled experiment for every
//! implementation pattern and post-processes what comes back.
//!
//! ## Layout
//!
//! ```text
//! <root>/build/...                    benchmark build output
//! <workdir>/graphs/ss/*.gr            strong-scaling BFS inputs
//! <workdir>/graphs/ws/*_t_{n}.gr      weak-scaling BFS inputs
//! <workdir>/raw/                      raw result files (executable cwd)
//! <workdir>/data/                     .dat series, tuning reports, sweep report
//! ```
//!
//! ## Failure Handling
//!
//! This is the only recovery boundary in the crate. A failed build stops
//! everything; any other failure is logged with a `!!!` marker, recorded in
//! the sweep report, and the sweep moves on to the next unit.

use crate::{
    aggregate::{self, SingleSamplePolicy},
    cli::{parse_threads, Experiment, MasterArgs},
    exec::{BenchmarkMode, Invocation, Invoker},
    logging::{FAILURE, PROGRESS},
    results::{ResultsManager, SweepReport, UnitOutcome, UnitStatus},
    utils::{absolute, absolute_program, format_duration, get_cpu_cores, pattern_label},
    weakscaling::{WeakScalingDriver, WeakScalingJob},
};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Resolved configuration of one sweep
#[derive(Clone, Debug)]
pub struct SweepConfig {
    pub workdir: PathBuf,
    pub root: PathBuf,
    pub executable: PathBuf,
    /// Thread count for parameter tuning and producer-consumer runs
    pub threads: usize,
    /// Cores available for the weak-scaling ladder
    pub cpus: usize,
    pub repeats: usize,
    pub experiments: Vec<Experiment>,
    pub patterns: Vec<String>,
    pub build: bool,
    pub timeout: Option<Duration>,
}

impl SweepConfig {
    pub fn from_args(args: &MasterArgs) -> Result<Self> {
        let cpus = get_cpu_cores();
        let threads = parse_threads(args.threads.as_deref(), cpus)?;
        let experiments = Experiment::parse_list(args.experiments.as_deref().unwrap_or("all"))?;
        if args.repeats == 0 {
            bail!("repeats must be greater than 0");
        }

        let patterns = if args.patterns.is_empty() {
            crate::defaults::PATTERNS.iter().map(|p| p.to_string()).collect()
        } else {
            args.patterns.clone()
        };

        // The executable runs inside raw/, so nothing may stay relative
        let workdir = absolute(&args.workdir)?;
        let root = match &args.root {
            Some(root) => absolute(root)?,
            None => workdir.join(".."),
        };
        let executable = match &args.exe {
            Some(exe) => absolute_program(exe)?,
            None => root.join(crate::defaults::EXECUTABLE),
        };

        Ok(Self {
            workdir,
            root,
            executable,
            threads,
            cpus,
            repeats: args.repeats,
            experiments,
            patterns,
            build: !args.skip_build,
            timeout: args.timeout,
        })
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.workdir.join(crate::defaults::RAW_DIR)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.workdir.join(crate::defaults::DATA_DIR)
    }

    pub fn ss_graphs_dir(&self) -> PathBuf {
        self.workdir.join(crate::defaults::SS_GRAPHS_DIR)
    }

    pub fn ws_graphs_dir(&self) -> PathBuf {
        self.workdir.join(crate::defaults::WS_GRAPHS_DIR)
    }

    /// A single trial cannot have a sample deviation; with one repeat the
    /// series are written with zero deviation instead of failing.
    pub fn single_sample_policy(&self) -> SingleSamplePolicy {
        if self.repeats < 2 {
            SingleSamplePolicy::Zero
        } else {
            SingleSamplePolicy::Reject
        }
    }

    fn enabled(&self, experiment: Experiment) -> bool {
        self.experiments.contains(&experiment)
    }
}

/// `Ok(Some(outputs))` when the unit completed, `Ok(None)` when the
/// executable produced nothing to post-process
type UnitResult = Result<Option<Vec<PathBuf>>>;

pub struct Orchestrator<'a> {
    config: SweepConfig,
    /// Runs cmake; never subject to the benchmark timeout
    builder: &'a dyn Invoker,
    invoker: &'a dyn Invoker,
    results: ResultsManager,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: SweepConfig, builder: &'a dyn Invoker, invoker: &'a dyn Invoker) -> Self {
        let report = config.data_dir().join(crate::defaults::REPORT_FILE);
        let results = ResultsManager::new(&report, config.threads, config.repeats);
        Self {
            config,
            builder,
            invoker,
            results,
        }
    }

    /// Run the whole sweep and write the report
    pub async fn run(mut self) -> Result<SweepReport> {
        if self.config.build {
            self.build().await?;
        }

        for dir in [self.config.raw_dir(), self.config.data_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        info!(
            "Sweeping {} pattern(s) over {:?} with {} threads",
            self.config.patterns.len(),
            self.config.experiments,
            self.config.threads
        );

        for pattern in self.config.patterns.clone() {
            for experiment in Experiment::ALL {
                if !self.config.enabled(experiment) {
                    continue;
                }
                match experiment {
                    Experiment::Bfs => self.bfs(&pattern).await,
                    Experiment::Tuning => {
                        let result = self.tuning(&pattern).await;
                        self.settle(&pattern, experiment, None, result);
                    }
                    Experiment::Performance | Experiment::Quality | Experiment::Prodcon => {
                        let result = self.fixed(&pattern, experiment).await;
                        self.settle(&pattern, experiment, None, result);
                    }
                }
            }
        }

        self.results.finalize()
    }

    async fn build(&self) -> Result<()> {
        let steps = [
            vec!["-B", "build", "-S", ".", "-DCMAKE_BUILD_TYPE=Release", "-G", "Ninja"],
            vec!["--build", "build"],
        ];
        for step in steps {
            let invocation = Invocation::new("cmake", &self.config.root).args(step);
            info!("{} {}", PROGRESS, invocation);
            let output = self.builder.invoke(&invocation).await?;
            if !output.success() {
                error!("{} Build failed:\n{}", FAILURE, output.stderr.trim_end());
            }
            output.check(Path::new("cmake"))?;
        }
        Ok(())
    }

    /// Run `exe <mode> [extra] -r <repeats> -i <pattern>.* -q -n` in the raw
    /// directory and return the result file it reports.
    async fn run_benchmark(
        &self,
        pattern: &str,
        name: &str,
        mode: BenchmarkMode,
        extra: &[String],
    ) -> Result<Option<PathBuf>> {
        info!("{} Running executable on {} for {}.", PROGRESS, pattern, name);

        let raw = self.config.raw_dir();
        let invocation = Invocation::benchmark(&self.config.executable, mode, &raw)
            .args(extra.iter().cloned())
            .args(["-r".to_string(), self.config.repeats.to_string()])
            .args(["-i".to_string(), format!("{}.*", pattern)])
            .args(["-q", "-n"]);

        let output = self.invoker.invoke(&invocation).await?;
        let code = output
            .code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        info!(
            "{} Exited with {} after {}.",
            PROGRESS,
            code,
            format_duration(output.elapsed)
        );

        Ok(output.result_path().map(|p| raw.join(p)))
    }

    async fn tuning(&self, pattern: &str) -> UnitResult {
        let extra = vec![
            "--parameter-tuning".to_string(),
            "-t".to_string(),
            self.config.threads.to_string(),
        ];
        let mut performance_extra = extra.clone();
        performance_extra.extend(["-s".to_string(), "1".to_string()]);

        let performance = self
            .run_benchmark(pattern, "performance-pt", BenchmarkMode::Performance, &performance_extra)
            .await?;
        let quality = self
            .run_benchmark(pattern, "quality-pt", BenchmarkMode::Quality, &extra)
            .await?;

        let (Some(performance), Some(quality)) = (performance, quality) else {
            return Ok(None);
        };

        let report = aggregate::tune(&performance, &quality)?;
        let path = self
            .config
            .data_dir()
            .join(format!("tuning-{}.txt", pattern_label(pattern)));
        std::fs::write(&path, report.render())
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Tuning report written to {}", path.display());
        Ok(Some(vec![path]))
    }

    async fn fixed(&self, pattern: &str, experiment: Experiment) -> UnitResult {
        let policy = self.config.single_sample_policy();
        let data = self.config.data_dir();

        match experiment {
            Experiment::Performance | Experiment::Quality => {
                let (mode, prefix) = if experiment == Experiment::Performance {
                    (BenchmarkMode::Performance, "performance")
                } else {
                    (BenchmarkMode::Quality, "quality")
                };
                let Some(raw) = self.run_benchmark(pattern, prefix, mode, &[]).await? else {
                    return Ok(None);
                };
                Ok(Some(aggregate::convert(&raw, &data, prefix, policy)?))
            }
            Experiment::Prodcon => {
                let extra = vec!["-t".to_string(), self.config.threads.to_string()];
                let result = self
                    .run_benchmark(pattern, "prodcon", BenchmarkMode::ProducerConsumer, &extra)
                    .await?;
                if result.is_none() {
                    return Ok(None);
                }
                let combined =
                    aggregate::combine_producer_consumer(&self.config.raw_dir(), self.config.threads)?;
                Ok(Some(aggregate::convert(&combined, &data, "prodcon", policy)?))
            }
            Experiment::Tuning | Experiment::Bfs => {
                bail!("{} is not a fixed-thread experiment", experiment)
            }
        }
    }

    /// Strong scaling on every graph in `graphs/ss`, weak scaling on every
    /// `*_t_1.gr` family in `graphs/ws`. Each graph is its own unit.
    async fn bfs(&mut self, pattern: &str) {
        match list_files(&self.config.ss_graphs_dir()) {
            Ok(graphs) => {
                for graph in graphs {
                    info!("{} Running BFS for {}", PROGRESS, graph);
                    let result = self.strong_scaling(pattern, &graph).await;
                    self.settle(pattern, Experiment::Bfs, Some(&graph), result);
                }
            }
            Err(e) => self.settle(pattern, Experiment::Bfs, Some("ss"), Err(e)),
        }

        match list_files(&self.config.ws_graphs_dir()) {
            Ok(graphs) => {
                for file in graphs {
                    let Some(graph) = weak_scaling_base(&file) else {
                        continue;
                    };
                    info!("{} Running WS BFS for {}", PROGRESS, graph);
                    let result = self.weak_scaling(pattern, graph).await;
                    self.settle(pattern, Experiment::Bfs, Some(graph), result);
                }
            }
            Err(e) => self.settle(pattern, Experiment::Bfs, Some("ws"), Err(e)),
        }
    }

    async fn strong_scaling(&self, pattern: &str, graph: &str) -> UnitResult {
        let graph_path = self.config.ss_graphs_dir().join(graph);
        let extra = vec![graph_path.to_string_lossy().into_owned()];
        let Some(raw) = self
            .run_benchmark(pattern, "bfs", BenchmarkMode::Bfs, &extra)
            .await?
        else {
            return Ok(None);
        };
        let out_dir = self.config.data_dir().join("ss").join(graph);
        Ok(Some(aggregate::convert(
            &raw,
            &out_dir,
            "bfs-ss",
            self.config.single_sample_policy(),
        )?))
    }

    async fn weak_scaling(&self, pattern: &str, graph: &str) -> UnitResult {
        let job = WeakScalingJob {
            executable: self.config.executable.clone(),
            directory: self.config.raw_dir(),
            graph: self.config.ws_graphs_dir().join(graph),
            mode: BenchmarkMode::Bfs,
            extra_args: vec!["-i".to_string(), pattern.to_string(), "-q".to_string()],
        };
        let driver = WeakScalingDriver::new(self.invoker, self.config.cpus);
        let combined = driver.run(&job).await?;

        let out_dir = self.config.data_dir().join("ws").join(graph);
        Ok(Some(aggregate::convert(
            &combined,
            &out_dir,
            "bfs-ws",
            self.config.single_sample_policy(),
        )?))
    }

    /// Log and record the outcome of one unit
    fn settle(&mut self, pattern: &str, experiment: Experiment, target: Option<&str>, result: UnitResult) {
        let unit = match target {
            Some(t) => format!("{} ({}) on {}", experiment, t, pattern),
            None => format!("{} on {}", experiment, pattern),
        };
        let outcome = match result {
            Ok(Some(outputs)) => {
                info!("{} {} completed, {} file(s) written", PROGRESS, unit, outputs.len());
                UnitOutcome::new(pattern, experiment, target, UnitStatus::Completed).with_outputs(outputs)
            }
            Ok(None) => {
                warn!("{} {} produced no result, skipping post-processing", FAILURE, unit);
                UnitOutcome::new(pattern, experiment, target, UnitStatus::NoResult)
            }
            Err(e) => {
                error!("{} {} failed!", FAILURE, unit);
                error!("{:#}", e);
                UnitOutcome::new(pattern, experiment, target, UnitStatus::Failed).with_error(format!("{:#}", e))
            }
        };
        self.results.record(outcome);
    }
}

/// Regular files in `dir`, sorted by name
fn list_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// `road_t_1.gr` -> `road_t_`; anything else is not a weak-scaling family head
fn weak_scaling_base(file: &str) -> Option<&str> {
    if file.ends_with("_t_1.gr") {
        file.strip_suffix("1.gr")
    } else {
        None
    }
}
