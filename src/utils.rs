//! # Utility Functions
//!
//! Small helpers shared by the aggregation tools and the drivers:
//!
//! - **Result discovery**: picking the newest raw result file by name
//! - **Number formatting**: shortest round-trip float text for `.dat` output
//! - **System information**: CPU core detection
//! - **Display helpers**: durations and file-name-safe labels
//!
//! ## Result Discovery
//!
//! The benchmark executable names each raw result file after the run that
//! produced it, ending in a sortable suffix. [`latest_matching`] relies on
//! those suffixes sorting lexicographically in production order, so they
//! must be fixed-width (zero-padded counters or timestamps). With unpadded
//! counters `run-2` sorts after `run-10` and the wrong file is chosen.

use crate::error::{HarnessError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Return the regular file in `dir` whose name contains `needle` and sorts
/// last, or `None` if nothing matches.
///
/// ## Examples
///
/// ```rust,no_run
/// # use fifo_harness::utils::latest_matching;
/// # fn main() -> fifo_harness::error::Result<()> {
/// if let Some(path) = latest_matching("raw".as_ref(), "road-ny8.gr")? {
///     println!("newest result: {}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub fn latest_matching(dir: &Path, needle: &str) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| HarnessError::io(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::io(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| HarnessError::io(entry.path(), e))?
            .is_file();
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.contains(needle) {
                names.push(name.to_string());
            }
        }
    }

    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names.into_iter().next().map(|name| dir.join(name)))
}

/// Like [`latest_matching`], but a missing match is an error
pub fn require_latest_matching(dir: &Path, needle: &str) -> Result<PathBuf> {
    latest_matching(dir, needle)?.ok_or_else(|| HarnessError::MissingResult {
        directory: dir.to_path_buf(),
        needle: needle.to_string(),
    })
}

/// Anchor a relative path at the current directory.
///
/// Child processes run in `raw/`, so every path handed to them must not
/// depend on the harness's own working directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| HarnessError::io(".", e))?;
    Ok(cwd.join(path))
}

/// Like [`absolute`], but a bare program name (`cmake`, `sh`) is left alone
/// so it is still looked up on `PATH`.
pub fn absolute_program(program: &Path) -> Result<PathBuf> {
    if program.components().count() > 1 {
        absolute(program)
    } else {
        Ok(program.to_path_buf())
    }
}

/// Render a float in shortest round-trip form.
///
/// Integral values keep a trailing `.0` (`5.0`, not `5`) so columns read
/// the same as older result sets.
pub fn format_float(value: f64) -> String {
    let mut buffer = ryu::Buffer::new();
    buffer.format(value).to_string()
}

/// Get the number of available CPU cores
///
/// Uses `num_cpus`, which respects cgroup limits and process affinity.
pub fn get_cpu_cores() -> usize {
    num_cpus::get()
}

/// Turn an implementation filter pattern into a file-name-safe label.
///
/// `.*bbq.*` becomes `bbq`; anything that is not alphanumeric, `-` or `_`
/// is dropped. An all-symbol pattern falls back to `all`.
pub fn pattern_label(pattern: &str) -> String {
    let label: String = pattern
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if label.is_empty() {
        "all".to_string()
    } else {
        label
    }
}

/// Format a duration in a human-readable way
///
/// Sub-second values use two decimals of the largest fitting unit; anything
/// from a minute upwards is shown as `Xm Ys` or `Xh Ym Zs`.
pub fn format_duration(duration: Duration) -> String {
    let total_ns = duration.as_nanos();

    if total_ns < 1_000 {
        format!("{}ns", total_ns)
    } else if total_ns < 1_000_000 {
        format!("{:.2}μs", total_ns as f64 / 1_000.0)
    } else if total_ns < 1_000_000_000 {
        format!("{:.2}ms", total_ns as f64 / 1_000_000.0)
    } else if total_ns < 60_000_000_000 {
        format!("{:.2}s", total_ns as f64 / 1_000_000_000.0)
    } else {
        let seconds = duration.as_secs();
        let minutes = seconds / 60;
        if minutes < 60 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}h {}m {}s", minutes / 60, minutes % 60, seconds % 60)
        }
    }
}
