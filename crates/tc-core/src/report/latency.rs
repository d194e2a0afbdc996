//! Latency samples and summary statistics.

use serde::Serialize;
use tracing::info;

/// Accumulated positive latency samples (milliseconds) for one cluster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencySamples {
    samples: Vec<f64>,
    excluded: usize,
}

impl LatencySamples {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample. Missing latencies are ignored; non-positive ones are
    /// excluded from the statistics and logged.
    pub fn push(&mut self, latency_ms: Option<i64>) {
        match latency_ms {
            None => {}
            Some(ms) if ms > 0 => self.samples.push(ms as f64),
            Some(ms) => {
                self.excluded += 1;
                info!(
                    latency_ms = ms,
                    "a non positive latency was found and will be excluded from the final performance stats"
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of non-positive samples that were dropped.
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Summary statistics, or `None` without samples.
    pub fn stats(&self) -> Option<LatencyStats> {
        LatencyStats::from_samples(&self.samples)
    }
}

/// Percentiles and mean over a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: usize,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    pub mean: f64,
}

impl LatencyStats {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            count: sorted.len(),
            p50: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            p99: percentile(&sorted, 99.0),
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
        })
    }
}

/// Linear interpolation between closest ranks over sorted, non-empty data.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
