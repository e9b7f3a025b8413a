//! # Summary Statistics
//!
//! Repeated trials are folded into a mean and a sample standard deviation
//! (n - 1 denominator). A single trial has no sample deviation; asking for
//! one is an [`HarnessError::InsufficientSamples`] rather than a silent zero,
//! and callers that want a zero must say so.

use crate::error::{HarnessError, Result};

/// Mean and sample standard deviation of one group of trials
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub stdev: f64,
}

impl Summary {
    /// Summarize `samples`, failing on fewer than two values.
    ///
    /// `group` is only used to label the error.
    pub fn of(samples: &[f64], group: &str) -> Result<Self> {
        Ok(Self {
            count: samples.len(),
            mean: mean(samples, group)?,
            stdev: sample_stdev(samples, group)?,
        })
    }

    /// Summarize `samples`, reporting a deviation of zero for a single value.
    pub fn of_lenient(samples: &[f64], group: &str) -> Result<Self> {
        if samples.len() == 1 {
            return Ok(Self {
                count: 1,
                mean: samples[0],
                stdev: 0.0,
            });
        }
        Self::of(samples, group)
    }
}

/// Arithmetic mean; errors on an empty slice
pub fn mean(samples: &[f64], group: &str) -> Result<f64> {
    if samples.is_empty() {
        return Err(HarnessError::InsufficientSamples {
            group: group.to_string(),
            count: 0,
        });
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Sample standard deviation (Bessel-corrected)
pub fn sample_stdev(samples: &[f64], group: &str) -> Result<f64> {
    if samples.len() < 2 {
        return Err(HarnessError::InsufficientSamples {
            group: group.to_string(),
            count: samples.len(),
        });
    }
    let mean = mean(samples, group)?;
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64;
    Ok(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_stdev() {
        let summary = Summary::of(&[2.0, 4.0, 6.0], "g").unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.mean, 4.0);
        assert!((summary.stdev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_samples() {
        let summary = Summary::of(&[1.0, 3.0], "g").unwrap();
        assert_eq!(summary.mean, 2.0);
        assert!((summary.stdev - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_single_sample_is_insufficient() {
        match Summary::of(&[5.0], "bbq @ 2") {
            Err(HarnessError::InsufficientSamples { group, count }) => {
                assert_eq!(group, "bbq @ 2");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_single_sample_lenient() {
        let summary = Summary::of_lenient(&[5.0], "g").unwrap();
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.stdev, 0.0);
    }

    #[test]
    fn test_empty_mean() {
        assert!(mean(&[], "g").is_err());
        assert!(Summary::of_lenient(&[], "g").is_err());
    }
}
