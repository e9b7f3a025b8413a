//! # Result Aggregation
//!
//! Folds raw benchmark rows into per-group summaries. Every tool in here
//! follows the same all-or-nothing shape: read every input row into an
//! explicit accumulator, summarize, and only then write output. A bad row,
//! an unpaired key or a group that is too small stops the tool before any
//! output file is touched.
//!
//! - [`convert`]: `(implementation, threads, value)` rows into `.dat` series
//! - [`tuning`]: performance/quality files into a mean/stdev scatter report
//! - [`pairs`]: performance/quality files into first-sample scatter points
//! - [`prodcon`]: per-split producer-consumer files into one CSV
//! - [`ratio`]: fill/empty timing files into a ratio CSV

pub mod convert;
pub mod pairs;
pub mod prodcon;
pub mod ratio;
pub mod tuning;

pub use convert::{convert, ConvertedSeries, SingleSamplePolicy};
pub use pairs::{pair_first_samples, PairedSeries};
pub use prodcon::combine_producer_consumer;
pub use ratio::fill_empty_ratio;
pub use tuning::{tune, ParameterSet, TuningAccumulator, TuningPoint, TuningReport};

use crate::error::{HarnessError, Result};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;

/// One headerless CSV row and the line it came from
pub(crate) struct CsvRow {
    pub line: u64,
    pub record: csv::StringRecord,
}

impl CsvRow {
    pub fn fields(&self) -> Vec<&str> {
        self.record.iter().collect()
    }
}

/// Read every row of a headerless, possibly ragged CSV file
pub(crate) fn read_rows(path: &Path) -> Result<Vec<CsvRow>> {
    if !path.is_file() {
        return Err(HarnessError::MissingInput(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| HarnessError::csv(path, e))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| HarnessError::csv(path, e))?;
        let line = record.position().map_or(0, |p| p.line());
        rows.push(CsvRow { line, record });
    }
    Ok(rows)
}

pub(crate) fn write_output(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| HarnessError::io(path, e))
}

/// Map that remembers first-insertion order.
///
/// Reports list implementations and parameter sets in the order they first
/// appear in the input, so two runs over the same file produce identical
/// text.
#[derive(Debug, Clone)]
pub struct OrderedGroups<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, V)>,
}

impl<K: Eq + Hash + Clone, V> OrderedGroups<K, V> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Get the group for `key`, creating it at the end if it is new
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.clone(), V::default()));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key) {
            Some(&idx) => Some(&mut self.entries[idx].1),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> Default for OrderedGroups<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> IntoIterator for OrderedGroups<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_ordered_groups_keep_first_seen_order() {
        let mut groups: OrderedGroups<String, Vec<u32>> = OrderedGroups::new();
        groups.entry_or_default("kfifo".to_string()).push(1);
        groups.entry_or_default("bbq".to_string()).push(2);
        groups.entry_or_default("kfifo".to_string()).push(3);

        let names: Vec<&String> = groups.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["kfifo", "bbq"]);
        assert_eq!(groups.get("kfifo"), Some(&vec![1, 3]));
        assert_eq!(groups.len(), 2);
        assert!(groups.get_mut("lcrq").is_none());
    }

    #[test]
    fn test_read_rows_ragged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        fs::write(&path, "bbq,1,2.0\n4,bbq,0,1.5\n").unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields(), vec!["bbq", "1", "2.0"]);
        assert_eq!(rows[1].fields().len(), 4);
        assert_eq!(rows[1].line, 2);
    }

    #[test]
    fn test_read_rows_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        assert!(matches!(
            read_rows(&path),
            Err(HarnessError::MissingInput(p)) if p == path
        ));
    }
}
