//! Summary statistics over execution-duration samples.
//!
//! All reducers are pure and reject an empty sample set instead of returning
//! a sentinel value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatisticsError {
    #[error("no samples to summarize")]
    Empty,
}

pub type Result<T> = std::result::Result<T, StatisticsError>;

pub fn min(samples: &[f64]) -> Result<f64> {
    samples
        .iter()
        .copied()
        .reduce(f64::min)
        .ok_or(StatisticsError::Empty)
}

pub fn max(samples: &[f64]) -> Result<f64> {
    samples
        .iter()
        .copied()
        .reduce(f64::max)
        .ok_or(StatisticsError::Empty)
}

pub fn mean(samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(StatisticsError::Empty);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Median of the samples.
///
/// For an even number of samples this is the mean of the elements at sorted
/// positions `n/2 - 1` and `n/2`.
pub fn median(samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(StatisticsError::Empty);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// The four statistics reported per configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl Summary {
    pub fn from_samples(samples: &[f64]) -> Result<Self> {
        Ok(Self {
            min: min(samples)?,
            max: max(samples)?,
            mean: mean(samples)?,
            median: median(samples)?,
        })
    }
}
