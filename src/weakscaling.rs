//! # Weak-Scaling Driver
//!
//! Weak-scaling inputs come as a family of graph files, one per thread
//! count, sized so that every thread gets roughly the same amount of work:
//! `road_t_1.gr`, `road_t_2.gr`, `road_t_4.gr`, ...
//!
//! The driver walks the thread ladder, runs the executable once per thread
//! count whose input exists, and concatenates the newest raw result of each
//! run into `weakscaling-{graph}.csv`.
//!
//! ## Protocol
//!
//! 1. Build the ladder `1, 2, 4, ..., cpus` (the core count is always the
//!    last rung, power of two or not).
//! 2. Stop at the first rung whose `{graph}{t}.gr` is missing. Later rungs
//!    are never attempted, even if their files exist.
//! 3. Run `exe <mode> {graph}{t}.gr -n -t t <extra...>` for every rung below
//!    that point. A failing run aborts the driver.
//! 4. Append the newest file containing `{basename}{t}.gr` for each rung, in
//!    ladder order.

use crate::error::{HarnessError, Result};
use crate::exec::{BenchmarkMode, Invocation, Invoker};
use crate::utils::{absolute, absolute_program, format_duration, require_latest_matching};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Thread counts `1, 2, 4, ...` below `cpus`, then `cpus` itself
pub fn thread_ladder(cpus: usize) -> Vec<usize> {
    let mut ladder = Vec::new();
    let mut t = 1;
    while t < cpus {
        ladder.push(t);
        t *= 2;
    }
    ladder.push(cpus.max(1));
    ladder
}

/// One weak-scaling sweep over a graph family
#[derive(Clone, Debug)]
pub struct WeakScalingJob {
    pub executable: PathBuf,
    /// Working directory of the executable; raw results land here
    pub directory: PathBuf,
    /// Graph path without the thread count and `.gr` suffix
    pub graph: PathBuf,
    pub mode: BenchmarkMode,
    pub extra_args: Vec<String>,
}

impl WeakScalingJob {
    /// Input graph for `threads`
    pub fn graph_file(&self, threads: usize) -> PathBuf {
        let mut path = self.graph.clone().into_os_string();
        path.push(format!("{}.gr", threads));
        PathBuf::from(path)
    }

    fn graph_name(&self) -> String {
        self.graph
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name fragment shared by every raw result of the `threads` run
    pub fn result_needle(&self, threads: usize) -> String {
        format!("{}{}.gr", self.graph_name(), threads)
    }

    pub fn combined_path(&self) -> PathBuf {
        self.directory
            .join(format!("weakscaling-{}.csv", self.graph_name()))
    }

    /// Copy with the executable and graph anchored at the current directory,
    /// since the runs happen inside `directory`
    pub fn resolved(&self) -> Result<Self> {
        Ok(Self {
            executable: absolute_program(&self.executable)?,
            graph: absolute(&self.graph)?,
            ..self.clone()
        })
    }
}

pub struct WeakScalingDriver<'a> {
    invoker: &'a dyn Invoker,
    cpus: usize,
}

impl<'a> WeakScalingDriver<'a> {
    pub fn new(invoker: &'a dyn Invoker, cpus: usize) -> Self {
        Self { invoker, cpus }
    }

    /// Rungs whose input graph exists, up to the first missing one
    pub fn available_threads(&self, job: &WeakScalingJob) -> Vec<usize> {
        let mut available = Vec::new();
        for t in thread_ladder(self.cpus) {
            let graph = job.graph_file(t);
            if !graph.is_file() {
                info!(
                    "{} not found, stopping weak scaling below {} threads",
                    graph.display(),
                    t
                );
                break;
            }
            available.push(t);
        }
        available
    }

    /// Run the sweep and return the combined result file
    pub async fn run(&self, job: &WeakScalingJob) -> Result<PathBuf> {
        let job = &job.resolved()?;
        let threads = self.available_threads(job);

        for &t in &threads {
            let invocation = Invocation::benchmark(&job.executable, job.mode, &job.directory)
                .arg(job.graph_file(t).to_string_lossy().into_owned())
                .args(["-n", "-t"])
                .arg(t.to_string())
                .args(job.extra_args.iter().cloned());

            info!(">>> Weak scaling with {} threads", t);
            let output = self.invoker.invoke(&invocation).await?;
            let output = output.check(&job.executable)?;
            debug!("{} threads finished in {}", t, format_duration(output.elapsed));
        }

        let mut sources = Vec::with_capacity(threads.len());
        for &t in &threads {
            sources.push(require_latest_matching(&job.directory, &job.result_needle(t))?);
        }

        let combined = job.combined_path();
        concatenate(&sources, &combined)?;
        info!("Combined results written to {}", combined.display());
        Ok(combined)
    }
}

/// Copy every line of `sources`, in order, into a fresh `target`.
///
/// Lines go to a temporary file next to `target` that is renamed into place
/// only once every source has been copied.
fn concatenate(sources: &[PathBuf], target: &Path) -> Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staging = NamedTempFile::new_in(dir).map_err(|e| HarnessError::io(dir, e))?;

    {
        let mut out = BufWriter::new(staging.as_file());
        for source in sources {
            info!("{}", source.display());
            let input = File::open(source).map_err(|e| HarnessError::io(source, e))?;
            for line in BufReader::new(input).lines() {
                let line = line.map_err(|e| HarnessError::io(source, e))?;
                writeln!(out, "{}", line).map_err(|e| HarnessError::io(staging.path(), e))?;
            }
        }
        out.flush().map_err(|e| HarnessError::io(staging.path(), e))?;
    }

    staging
        .persist(target)
        .map_err(|e| HarnessError::io(target, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::InvocationOutput;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Records calls and writes a raw result the way the executable would
    struct FakeExecutable {
        calls: Mutex<Vec<Invocation>>,
        fail_on_threads: Option<String>,
    }

    impl FakeExecutable {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on_threads: None,
            }
        }

        fn threads_called(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|inv| inv.args[4].clone())
                .collect()
        }
    }

    #[async_trait]
    impl Invoker for FakeExecutable {
        async fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            let threads = invocation.args[4].clone();
            if self.fail_on_threads.as_deref() == Some(threads.as_str()) {
                return Ok(InvocationOutput {
                    code: Some(1),
                    stderr: String::new(),
                    elapsed: Duration::ZERO,
                });
            }

            let graph = Path::new(&invocation.args[1]);
            let name = format!(
                "fifo-bfs-{}-0001.csv",
                graph.file_name().unwrap().to_string_lossy()
            );
            fs::write(
                invocation.cwd.join(&name),
                format!("bbq,{},{}.5\n", threads, threads),
            )
            .unwrap();
            Ok(InvocationOutput {
                code: Some(0),
                stderr: name,
                elapsed: Duration::ZERO,
            })
        }
    }

    fn job(graphs: &Path, raw: &Path) -> WeakScalingJob {
        WeakScalingJob {
            executable: PathBuf::from("/opt/fifo/relaxed_concurrent_fifo"),
            directory: raw.to_path_buf(),
            graph: graphs.join("road_t_"),
            mode: BenchmarkMode::Bfs,
            extra_args: vec!["-i".to_string(), "bbq".to_string(), "-q".to_string()],
        }
    }

    #[test]
    fn test_thread_ladder() {
        assert_eq!(thread_ladder(1), vec![1]);
        assert_eq!(thread_ladder(2), vec![1, 2]);
        assert_eq!(thread_ladder(6), vec![1, 2, 4, 6]);
        assert_eq!(thread_ladder(8), vec![1, 2, 4, 8]);
        assert_eq!(thread_ladder(12), vec![1, 2, 4, 8, 12]);
    }

    #[test]
    fn test_job_paths() {
        let j = job(Path::new("/graphs/ws"), Path::new("/raw"));
        assert_eq!(j.graph_file(4), PathBuf::from("/graphs/ws/road_t_4.gr"));
        assert_eq!(j.result_needle(4), "road_t_4.gr");
        assert_eq!(
            j.combined_path(),
            PathBuf::from("/raw/weakscaling-road_t_.csv")
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_missing_graph() {
        let graphs = tempdir().unwrap();
        let raw = tempdir().unwrap();
        // t = 4 is missing; t = 8 exists but must never be used
        for t in [1, 2, 8] {
            fs::write(graphs.path().join(format!("road_t_{}.gr", t)), "p sp 1 0\n").unwrap();
        }

        let fake = FakeExecutable::new();
        let driver = WeakScalingDriver::new(&fake, 8);
        let j = job(graphs.path(), raw.path());

        let combined = driver.run(&j).await.unwrap();
        assert_eq!(fake.threads_called(), vec!["1", "2"]);
        assert_eq!(
            fs::read_to_string(combined).unwrap(),
            "bbq,1,1.5\nbbq,2,2.5\n"
        );

        let calls = fake.calls.lock().unwrap();
        let first = &calls[0];
        assert_eq!(first.cwd, raw.path());
        assert_eq!(
            first.args,
            vec![
                "7".to_string(),
                graphs.path().join("road_t_1.gr").to_string_lossy().into_owned(),
                "-n".to_string(),
                "-t".to_string(),
                "1".to_string(),
                "-i".to_string(),
                "bbq".to_string(),
                "-q".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_picks_newest_result_per_rung() {
        let graphs = tempdir().unwrap();
        let raw = tempdir().unwrap();
        fs::write(graphs.path().join("road_t_1.gr"), "").unwrap();
        fs::write(raw.path().join("fifo-bfs-road_t_1.gr-9999.csv"), "newest\n").unwrap();
        fs::write(raw.path().join("fifo-bfs-road_t_1.gr-0000.csv"), "stale\n").unwrap();

        let fake = FakeExecutable::new();
        let driver = WeakScalingDriver::new(&fake, 1);
        let combined = driver.run(&job(graphs.path(), raw.path())).await.unwrap();
        assert_eq!(fs::read_to_string(combined).unwrap(), "newest\n");
    }

    #[tokio::test]
    async fn test_failed_run_is_fatal() {
        let graphs = tempdir().unwrap();
        let raw = tempdir().unwrap();
        for t in [1, 2, 4] {
            fs::write(graphs.path().join(format!("road_t_{}.gr", t)), "").unwrap();
        }

        let mut fake = FakeExecutable::new();
        fake.fail_on_threads = Some("2".to_string());
        let driver = WeakScalingDriver::new(&fake, 4);
        let j = job(graphs.path(), raw.path());

        assert!(matches!(
            driver.run(&j).await,
            Err(HarnessError::SubprocessFailed { .. })
        ));
        assert_eq!(fake.threads_called(), vec!["1", "2"]);
        assert!(!j.combined_path().exists());
    }

    #[tokio::test]
    async fn test_relative_graph_is_passed_absolute() {
        // Relative to the test's working directory, like `graphs/ws/road_t_`
        let graphs = tempfile::tempdir_in(".").unwrap();
        let raw = tempdir().unwrap();
        fs::write(graphs.path().join("road_t_1.gr"), "").unwrap();
        assert!(graphs.path().is_relative());

        let fake = FakeExecutable::new();
        let driver = WeakScalingDriver::new(&fake, 1);
        let mut j = job(graphs.path(), raw.path());
        j.executable = PathBuf::from("./build/relaxed_concurrent_fifo");
        driver.run(&j).await.unwrap();

        let cwd = std::env::current_dir().unwrap();
        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, cwd.join("./build/relaxed_concurrent_fifo"));
        let graph_arg = PathBuf::from(&calls[0].args[1]);
        assert!(graph_arg.is_absolute());
        assert_eq!(graph_arg, cwd.join(graphs.path()).join("road_t_1.gr"));
    }

    #[test]
    fn test_concatenate_leaves_nothing_on_failure() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("a.csv");
        fs::write(&good, "bbq,1,1.0\n").unwrap();
        let target = dir.path().join("weakscaling-road_t_.csv");

        let sources = vec![good.clone(), dir.path().join("vanished.csv")];
        assert!(matches!(
            concatenate(&sources, &target),
            Err(HarnessError::Io { .. })
        ));
        assert!(!target.exists());
        // only the source remains; the staging file was cleaned up
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        concatenate(&[good], &target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "bbq,1,1.0\n");
    }

    #[tokio::test]
    async fn test_no_inputs_gives_empty_file() {
        let graphs = tempdir().unwrap();
        let raw = tempdir().unwrap();

        let fake = FakeExecutable::new();
        let driver = WeakScalingDriver::new(&fake, 4);
        let combined = driver.run(&job(graphs.path(), raw.path())).await.unwrap();
        assert!(fake.threads_called().is_empty());
        assert_eq!(fs::read_to_string(combined).unwrap(), "");
    }
}
