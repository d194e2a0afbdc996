//! Latency report: percentiles and mean per cluster.

use super::latency::{LatencySamples, LatencyStats};
use super::{Report, ReportOptions};
use crate::compare::Comparison;
use serde::Serialize;
use serde_json::Value;

/// Latency samples for both clusters, summarized at render time.
#[derive(Debug, Clone, Default)]
pub struct PerformanceReport {
    primary: LatencySamples,
    shadow: LatencySamples,
}

#[derive(Serialize)]
struct ClusterExport {
    stats: Option<LatencyStats>,
    excluded_samples: usize,
}

#[derive(Serialize)]
struct PerformanceExport {
    primary: ClusterExport,
    shadow: ClusterExport,
}

impl PerformanceReport {
    pub const NAME: &'static str = "PerformanceReport";
    pub const DESCRIPTION: &'static str = "Provides basic performance data including average, median, \
        p90 and p99 latencies for each cluster.";

    pub fn new(_options: &ReportOptions) -> Self {
        Self::default()
    }

    pub fn primary(&self) -> &LatencySamples {
        &self.primary
    }

    pub fn shadow(&self) -> &LatencySamples {
        &self.shadow
    }
}

fn render_cluster(label: &str, samples: &LatencySamples) -> String {
    let body = match samples.stats() {
        Some(stats) => format!(
            "99th percentile = {:.1}\n90th percentile = {:.1}\n50th percentile = {:.1}\nAverage Latency = {:.1}\n",
            stats.p99, stats.p90, stats.p50, stats.mean
        ),
        None => "no latency samples\n".to_string(),
    };
    format!("==Stats for {label} cluster==\n{body}")
}

impl Report for PerformanceReport {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn record(&mut self, comparison: &Comparison) {
        self.primary.push(comparison.primary_response().latency());
        self.shadow.push(comparison.shadow_response().latency());
    }

    fn render(&self) -> String {
        format!(
            "{}\n{}",
            render_cluster("primary", &self.primary),
            render_cluster("shadow", &self.shadow)
        )
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(PerformanceExport {
            primary: ClusterExport {
                stats: self.primary.stats(),
                excluded_samples: self.primary.excluded(),
            },
            shadow: ClusterExport {
                stats: self.shadow.stats(),
                excluded_samples: self.shadow.excluded(),
            },
        })
    }
}
