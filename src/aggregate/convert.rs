//! Single-source aggregation: `(implementation, threads, value)` rows into
//! one `.dat` series per implementation.
//!
//! ```text
//! threads its std
//! 1 2.0 1.4142135623730951
//! 2 5.0 0.0
//! ```

use super::{read_rows, write_output, OrderedGroups};
use crate::error::{HarnessError, Result};
use crate::stats::Summary;
use crate::utils::format_float;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header line of every `.dat` file
pub const DAT_HEADER: &str = "threads its std";

/// What to do with a thread count that only has one trial
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum SingleSamplePolicy {
    /// Fail the whole conversion with an insufficient-samples error
    #[default]
    Reject,
    /// Report a standard deviation of zero
    Zero,
}

/// Raw trials of one implementation, by thread count
pub type ThreadSamples = BTreeMap<u64, Vec<f64>>;

/// Summarized series for one implementation, ascending by thread count
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedSeries {
    pub implementation: String,
    pub points: Vec<(u64, Summary)>,
}

impl ConvertedSeries {
    /// Render as `.dat` text, header included
    pub fn render(&self) -> String {
        let mut out = String::from(DAT_HEADER);
        out.push('\n');
        for (threads, summary) in &self.points {
            out.push_str(&format!(
                "{} {} {}\n",
                threads,
                format_float(summary.mean),
                format_float(summary.stdev)
            ));
        }
        out
    }
}

/// Group every row of `path` by implementation and thread count
pub fn load_samples(path: &Path) -> Result<OrderedGroups<String, ThreadSamples>> {
    let mut groups: OrderedGroups<String, ThreadSamples> = OrderedGroups::new();

    for row in read_rows(path)? {
        let fields = row.fields();
        if fields.len() < 3 {
            return Err(HarnessError::malformed(
                path,
                row.line,
                format!("expected 3 fields, found {}", fields.len()),
            ));
        }
        let threads: u64 = fields[1].trim().parse().map_err(|_| {
            HarnessError::malformed(
                path,
                row.line,
                format!("thread count '{}' is not an integer", fields[1]),
            )
        })?;
        let value = crate::row::parse_metric(fields[2])
            .map_err(|reason| HarnessError::malformed(path, row.line, reason))?;

        groups
            .entry_or_default(fields[0].to_string())
            .entry(threads)
            .or_default()
            .push(value);
    }

    Ok(groups)
}

/// Summarize every group; any failing group fails the whole set
pub fn summarize(
    groups: OrderedGroups<String, ThreadSamples>,
    policy: SingleSamplePolicy,
) -> Result<Vec<ConvertedSeries>> {
    let mut series = Vec::with_capacity(groups.len());
    for (implementation, samples) in groups {
        let mut points = Vec::with_capacity(samples.len());
        for (threads, values) in samples {
            let label = format!("{} @ {} threads", implementation, threads);
            let summary = match policy {
                SingleSamplePolicy::Reject => Summary::of(&values, &label)?,
                SingleSamplePolicy::Zero => Summary::of_lenient(&values, &label)?,
            };
            points.push((threads, summary));
        }
        series.push(ConvertedSeries {
            implementation,
            points,
        });
    }
    Ok(series)
}

/// Convert `input` into `{out_dir}/{prefix}-{implementation}.dat` files.
///
/// Returns the written paths in first-seen implementation order.
pub fn convert(
    input: &Path,
    out_dir: &Path,
    prefix: &str,
    policy: SingleSamplePolicy,
) -> Result<Vec<PathBuf>> {
    let groups = load_samples(input)?;
    debug!(
        "Loaded {} implementation(s) from {}",
        groups.len(),
        input.display()
    );
    let series = summarize(groups, policy)?;

    std::fs::create_dir_all(out_dir).map_err(|e| HarnessError::io(out_dir, e))?;

    let mut written = Vec::with_capacity(series.len());
    for s in &series {
        let path = out_dir.join(format!("{}-{}.dat", prefix, s.implementation));
        write_output(&path, &s.render())?;
        info!("Wrote {} ({} thread counts)", path.display(), s.points.len());
        written.push(path);
    }
    Ok(written)
}
