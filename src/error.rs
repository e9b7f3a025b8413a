//! # Harness Error Types
//!
//! Every failure the results pipeline can hit is one of a small number of
//! kinds: an input that is not there, a row that does not have the expected
//! shape, a pairing that does not line up, or an external process that did
//! not behave. Low-level tools surface these as [`HarnessError`] and stop;
//! only the sweep orchestrator catches them and moves on to the next unit.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result alias used by the aggregation and driver modules
pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Reading or writing a file or directory failed
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader rejected the file
    #[error("CSV error in {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// An expected input file does not exist
    #[error("missing input file: {0}")]
    MissingInput(PathBuf),

    /// A row could not be interpreted
    #[error("malformed row {line} in {path}: {reason}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// A key was seen in one input of a paired aggregation but not the other
    #[error("missing paired key {key:?} for implementation '{implementation}'")]
    MissingPairedKey {
        implementation: String,
        key: Vec<String>,
    },

    /// Sample statistics need more data than the group holds
    #[error("insufficient samples for {group}: {count} (need at least 2)")]
    InsufficientSamples { group: String, count: usize },

    /// The benchmark executable could not be started
    #[error("failed to start {program}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The benchmark executable exited unsuccessfully
    #[error("{program} exited with {status}")]
    SubprocessFailed { program: PathBuf, status: String },

    /// The benchmark executable did not finish in time and was killed
    #[error("{program} did not finish within {timeout:?}")]
    SubprocessTimeout { program: PathBuf, timeout: Duration },

    /// No raw result file matched the discovery pattern
    #[error("no result file containing '{needle}' in {directory}")]
    MissingResult { directory: PathBuf, needle: String },
}

impl HarnessError {
    /// Wrap an I/O error together with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        HarnessError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        HarnessError::MalformedRow {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}
