//! # Benchmark Executable Contract
//!
//! The queue benchmark is an external program. It is invoked as
//! `exe <mode> <args...>`, blocks until every benchmark thread is done, and
//! reports the path of the raw result file it wrote on standard error.
//! Standard output is left attached to the terminal so progress stays
//! visible.
//!
//! ## Recognized flags
//!
//! | flag | meaning |
//! |------|---------|
//! | `-t <n>` | thread count |
//! | `-r <n>` | repeat count |
//! | `-i <pattern>` | implementation filter (regex) |
//! | `-q` | quiet |
//! | `-n` | no interactive prompt |
//! | `-s <n>` | sub-mode |
//! | `--parameter-tuning` | sweep implementation parameters |
//!
//! Invocations go through the [`Invoker`] trait so drivers can be exercised
//! without the real executable.

use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// Benchmark selected by the first argument of the executable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BenchmarkMode {
    Performance,
    Quality,
    QualityMax,
    Fill,
    Empty,
    ProducerConsumer,
    Bfs,
    Other(u32),
}

impl BenchmarkMode {
    pub fn index(self) -> u32 {
        match self {
            BenchmarkMode::Performance => 1,
            BenchmarkMode::Quality => 2,
            BenchmarkMode::QualityMax => 3,
            BenchmarkMode::Fill => 4,
            BenchmarkMode::Empty => 5,
            BenchmarkMode::ProducerConsumer => 6,
            BenchmarkMode::Bfs => 7,
            BenchmarkMode::Other(i) => i,
        }
    }
}

impl From<u32> for BenchmarkMode {
    fn from(index: u32) -> Self {
        match index {
            1 => BenchmarkMode::Performance,
            2 => BenchmarkMode::Quality,
            3 => BenchmarkMode::QualityMax,
            4 => BenchmarkMode::Fill,
            5 => BenchmarkMode::Empty,
            6 => BenchmarkMode::ProducerConsumer,
            7 => BenchmarkMode::Bfs,
            i => BenchmarkMode::Other(i),
        }
    }
}

impl fmt::Display for BenchmarkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// One run of an external program
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Benchmark call shape: `exe <mode> <args...>`
    pub fn benchmark(exe: &Path, mode: BenchmarkMode, cwd: &Path) -> Self {
        Self::new(exe, cwd).arg(mode.index().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// What a finished run left behind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationOutput {
    /// Exit code; `None` if the process was killed by a signal
    pub code: Option<i32>,
    pub stderr: String,
    pub elapsed: Duration,
}

impl InvocationOutput {
    pub fn from_status(status: ExitStatus, stderr: String, elapsed: Duration) -> Self {
        Self {
            code: status.code(),
            stderr,
            elapsed,
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Result file reported on stderr, if the run succeeded and reported one
    pub fn result_path(&self) -> Option<&str> {
        let path = self.stderr.trim();
        if self.success() && !path.is_empty() {
            Some(path)
        } else {
            None
        }
    }

    /// Turn a failed run into [`HarnessError::SubprocessFailed`]
    pub fn check(self, program: &Path) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let status = match self.code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        };
        Err(HarnessError::SubprocessFailed {
            program: program.to_path_buf(),
            status,
        })
    }
}

/// Runs external programs to completion
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput>;
}

/// [`Invoker`] backed by real child processes
#[derive(Clone, Debug, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput> {
        debug!("Spawning: {} (in {})", invocation, invocation.cwd.display());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = cmd.spawn().map_err(|source| HarnessError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    return Err(HarnessError::SubprocessTimeout {
                        program: invocation.program.clone(),
                        timeout: limit,
                    })
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| HarnessError::io(&invocation.program, e))?;

        Ok(InvocationOutput::from_status(
            output.status,
            String::from_utf8_lossy(&output.stderr).into_owned(),
            start.elapsed(),
        ))
    }
}
