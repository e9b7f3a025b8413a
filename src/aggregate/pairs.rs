//! First-sample pairing of tuning files for quick scatter plots.
//!
//! Unlike [`super::tuning`] this does not average anything: for each
//! implementation and configuration key it pairs the first quality sample
//! with the first performance sample. Later trials are ignored, so the
//! output is only good for eyeballing a sweep.

use super::{read_rows, OrderedGroups};
use crate::error::{HarnessError, Result};
use crate::row::RowLayout;
use std::path::Path;

/// `(quality, performance)` points of one implementation
#[derive(Debug, Clone, PartialEq)]
pub struct PairedSeries {
    pub implementation: String,
    pub points: Vec<(f64, f64)>,
}

type FirstSamples = OrderedGroups<String, OrderedGroups<String, Vec<f64>>>;

fn load(path: &Path) -> Result<FirstSamples> {
    let mut groups = FirstSamples::new();
    for row in read_rows(path)? {
        let layout = RowLayout::classify(&row.fields())
            .map_err(|reason| HarnessError::malformed(path, row.line, reason))?;
        if let Some((key, variant, metric)) = layout.into_parts() {
            groups
                .entry_or_default(variant)
                .entry_or_default(key)
                .push(metric);
        }
    }
    Ok(groups)
}

/// Pair the first samples of every performance key with the quality file.
///
/// A performance key the quality file never mentions is an error. Two keys
/// with the same first quality value collapse into one point; the later
/// key's performance wins.
pub fn pair_first_samples(performance: &Path, quality: &Path) -> Result<Vec<PairedSeries>> {
    let p = load(performance)?;
    let q = load(quality)?;

    let mut series = Vec::with_capacity(p.len());
    for (implementation, keys) in p {
        let mut points: Vec<(f64, f64)> = Vec::new();
        for (key, samples) in keys {
            let first_quality = q
                .get(implementation.as_str())
                .and_then(|qk| qk.get(key.as_str()))
                .and_then(|s| s.first().copied())
                .ok_or_else(|| HarnessError::MissingPairedKey {
                    implementation: implementation.clone(),
                    key: vec![key.clone()],
                })?;
            // groups are only created with a sample, so `first` is present
            let Some(&first_performance) = samples.first() else {
                continue;
            };

            match points
                .iter_mut()
                .find(|(x, _)| x.to_bits() == first_quality.to_bits())
            {
                Some(point) => point.1 = first_performance,
                None => points.push((first_quality, first_performance)),
            }
        }
        series.push(PairedSeries {
            implementation,
            points,
        });
    }
    Ok(series)
}

/// Render as name line, `quality performance` lines, blank line
pub fn render(series: &[PairedSeries]) -> String {
    use crate::utils::format_float;

    let mut out = String::new();
    for s in series {
        out.push_str(&s.implementation);
        out.push('\n');
        for (x, y) in &s.points {
            out.push_str(&format!("{} {}\n", format_float(*x), format_float(*y)));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_first_samples_win() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("p.csv");
        let q = dir.path().join("q.csv");
        fs::write(
            &p,
            "4,16,bbq,0,100\n4,16,bbq,1,999\n8,bbq,0,50\nx\n",
        )
        .unwrap();
        fs::write(&q, "4,16,bbq,0,2\n4,16,bbq,1,3\n8,bbq,0,1\n").unwrap();

        let series = pair_first_samples(&p, &q).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].implementation, "bbq");
        assert_eq!(series[0].points, vec![(2.0, 100.0), (1.0, 50.0)]);

        let text = render(&series);
        assert_eq!(text, "bbq\n2.0 100.0\n1.0 50.0\n\n");
    }

    #[test]
    fn test_unpaired_key() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("p.csv");
        let q = dir.path().join("q.csv");
        fs::write(&p, "4,bbq,0,100\n8,bbq,0,50\n").unwrap();
        fs::write(&q, "4,bbq,0,2\n").unwrap();

        match pair_first_samples(&p, &q) {
            Err(HarnessError::MissingPairedKey { key, .. }) => {
                assert_eq!(key, vec!["8".to_string()])
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
