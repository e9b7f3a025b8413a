use crate::cli::Experiment;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How one (implementation, experiment[, graph]) unit of a sweep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Ran and post-processed
    Completed,
    /// The executable failed or reported no result file; nothing was post-processed
    NoResult,
    /// Post-processing or the driver itself failed
    Failed,
}

/// Record of one sweep unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub pattern: String,
    pub experiment: Experiment,
    /// Graph name for BFS units
    pub target: Option<String>,
    pub status: UnitStatus,
    pub outputs: Vec<PathBuf>,
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl UnitOutcome {
    pub fn new(pattern: &str, experiment: Experiment, target: Option<&str>, status: UnitStatus) -> Self {
        Self {
            pattern: pattern.to_string(),
            experiment,
            target: target.map(str::to_string),
            status,
            outputs: Vec::new(),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_outputs(mut self, outputs: Vec<PathBuf>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub harness_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
            harness_version: crate::VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepMetadata {
    pub started: chrono::DateTime<chrono::Utc>,
    pub finished: chrono::DateTime<chrono::Utc>,
    pub threads: usize,
    pub repeats: usize,
    pub system_info: SystemInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub completed: usize,
    pub no_result: usize,
    pub failed: usize,
}

/// Final sweep report written as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub metadata: SweepMetadata,
    pub outcomes: Vec<UnitOutcome>,
    pub summary: SweepSummary,
}

/// Collects unit outcomes during a sweep and writes the report at the end
pub struct ResultsManager {
    output_file: PathBuf,
    outcomes: Vec<UnitOutcome>,
    started: chrono::DateTime<chrono::Utc>,
    threads: usize,
    repeats: usize,
}

impl ResultsManager {
    pub fn new(output_file: &Path, threads: usize, repeats: usize) -> Self {
        Self {
            output_file: output_file.to_path_buf(),
            outcomes: Vec::new(),
            started: chrono::Utc::now(),
            threads,
            repeats,
        }
    }

    pub fn record(&mut self, outcome: UnitOutcome) {
        debug!(
            "Recording {:?} for {} / {}",
            outcome.status, outcome.pattern, outcome.experiment
        );
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[UnitOutcome] {
        &self.outcomes
    }

    fn summary(&self) -> SweepSummary {
        let mut summary = SweepSummary::default();
        for outcome in &self.outcomes {
            match outcome.status {
                UnitStatus::Completed => summary.completed += 1,
                UnitStatus::NoResult => summary.no_result += 1,
                UnitStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }

    /// Write the JSON report and return it
    pub fn finalize(self) -> Result<SweepReport> {
        let summary = self.summary();
        let report = SweepReport {
            metadata: SweepMetadata {
                started: self.started,
                finished: chrono::Utc::now(),
                threads: self.threads,
                repeats: self.repeats,
                system_info: SystemInfo::default(),
            },
            outcomes: self.outcomes,
            summary,
        };

        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&self.output_file, json)?;

        info!("Sweep report written to: {:?}", self.output_file);
        Ok(report)
    }
}
