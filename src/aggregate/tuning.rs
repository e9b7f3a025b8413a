//! Dual-source aggregation for parameter tuning runs.
//!
//! A tuning sweep writes one performance file and one quality file. Both
//! carry the same rows: the parameter values of the configuration, then the
//! implementation, then an iteration index, then the measurement. Rows are
//! grouped by implementation and parameter tuple, and every group must have
//! samples from both files.

use super::{read_rows, OrderedGroups};
use crate::error::{HarnessError, Result};
use crate::row::Observation;
use crate::stats::Summary;
use crate::utils::format_float;
use std::path::Path;
use tracing::debug;

/// Samples of one implementation under one parameter configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    pub performance: Vec<f64>,
    pub quality: Vec<f64>,
}

/// Accumulates both input files before anything is summarized.
///
/// Performance rows create groups; quality rows may only extend groups
/// that already exist.
#[derive(Debug, Default)]
pub struct TuningAccumulator {
    groups: OrderedGroups<String, OrderedGroups<Vec<String>, ParameterSet>>,
}

impl TuningAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_performance(&mut self, obs: Observation) {
        self.groups
            .entry_or_default(obs.variant)
            .entry_or_default(obs.key)
            .performance
            .push(obs.metric);
    }

    pub fn add_quality(&mut self, obs: Observation) -> Result<()> {
        let set = self
            .groups
            .get_mut(obs.variant.as_str())
            .and_then(|params| params.get_mut(&obs.key));
        match set {
            Some(set) => {
                set.quality.push(obs.metric);
                Ok(())
            }
            None => Err(HarnessError::MissingPairedKey {
                implementation: obs.variant,
                key: obs.key,
            }),
        }
    }

    /// Summarize every group into a report
    pub fn finish(self) -> Result<TuningReport> {
        let mut implementations = Vec::with_capacity(self.groups.len());

        for (implementation, params) in self.groups {
            let mut points = Vec::with_capacity(params.len());
            for (parameters, set) in params {
                if set.quality.is_empty() {
                    return Err(HarnessError::MissingPairedKey {
                        implementation,
                        key: parameters,
                    });
                }
                let label = format!("{} [{}]", implementation, parameters.join(","));
                points.push(TuningPoint {
                    quality: Summary::of(&set.quality, &format!("{} quality", label))?,
                    performance: Summary::of(&set.performance, &format!("{} performance", label))?,
                    parameters,
                });
            }
            implementations.push((implementation, points));
        }

        Ok(TuningReport { implementations })
    }
}

/// One point of the quality/performance scatter, with error bars
#[derive(Debug, Clone, PartialEq)]
pub struct TuningPoint {
    pub parameters: Vec<String>,
    pub quality: Summary,
    pub performance: Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuningReport {
    pub implementations: Vec<(String, Vec<TuningPoint>)>,
}

impl TuningReport {
    /// Plain-text report: per implementation a name line, one
    /// `quality_mean performance_mean quality_std performance_std params...`
    /// line per configuration, and a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (implementation, points) in &self.implementations {
            out.push_str(implementation);
            out.push('\n');
            for p in points {
                let mut line = format!(
                    "{} {} {} {}",
                    format_float(p.quality.mean),
                    format_float(p.performance.mean),
                    format_float(p.quality.stdev),
                    format_float(p.performance.stdev)
                );
                for param in &p.parameters {
                    line.push(' ');
                    line.push_str(param);
                }
                out.push_str(&line);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }
}

fn classify(path: &Path, line: u64, fields: &[&str]) -> Result<Observation> {
    Observation::classify(fields).map_err(|reason| HarnessError::malformed(path, line, reason))
}

/// Aggregate a performance file and a quality file
pub fn tune(performance: &Path, quality: &Path) -> Result<TuningReport> {
    let mut acc = TuningAccumulator::new();

    let rows = read_rows(performance)?;
    debug!("{} performance rows in {}", rows.len(), performance.display());
    for row in rows {
        acc.add_performance(classify(performance, row.line, &row.fields())?);
    }

    let rows = read_rows(quality)?;
    debug!("{} quality rows in {}", rows.len(), quality.display());
    for row in rows {
        acc.add_quality(classify(quality, row.line, &row.fields())?)?;
    }

    acc.finish()
}
