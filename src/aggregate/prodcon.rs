//! Combines producer-consumer runs into one CSV.
//!
//! The executable writes one raw file per producer/consumer split, named
//! `fifo-prodcon-{producers}-{consumers}-...`. This walks the splits in
//! steps of one sixteenth of the total thread count and rewrites each data
//! row as `implementation,producers,value`, so the result can go through
//! [`super::convert`] with producers in the thread-count column.

use super::{read_rows, write_output};
use crate::error::{HarnessError, Result};
use crate::row::is_numeric;
use crate::utils::require_latest_matching;
use std::path::{Path, PathBuf};
use tracing::info;

/// Producer counts visited for `threads` total threads
pub fn producer_steps(threads: usize) -> Vec<usize> {
    let step = (threads / 16).max(1);
    (1..)
        .map(|n| n * step)
        .take_while(|&producers| producers < threads)
        .collect()
}

/// Needle identifying raw files of one split
pub fn split_needle(producers: usize, consumers: usize) -> String {
    format!("fifo-prodcon-{}-{}-", producers, consumers)
}

/// Write `{dir}/producer-consumer-{threads}.csv` and return its path
pub fn combine_producer_consumer(dir: &Path, threads: usize) -> Result<PathBuf> {
    let mut out = String::new();

    for producers in producer_steps(threads) {
        let needle = split_needle(producers, threads - producers);
        let source = require_latest_matching(dir, &needle)?;
        info!("{}", source.display());

        for row in read_rows(&source)? {
            let fields = row.fields();
            let Some(second) = fields.get(1) else {
                return Err(HarnessError::malformed(&source, row.line, "expected at least 2 fields"));
            };
            // header and summary rows carry a name in the second column
            if !is_numeric(second) {
                continue;
            }
            let value = fields.get(2).ok_or_else(|| {
                HarnessError::malformed(&source, row.line, "expected a value in field 2")
            })?;
            out.push_str(&format!("{},{},{}\n", fields[0], producers, value));
        }
    }

    let path = dir.join(format!("producer-consumer-{}.csv", threads));
    write_output(&path, &out)?;
    Ok(path)
}
