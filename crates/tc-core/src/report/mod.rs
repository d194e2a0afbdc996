//! Reports over a stream of comparisons.
//!
//! Reports are looked up by name in an explicit [`ReportRegistry`] and fed
//! one comparison at a time by the [`ReportAggregator`]. Each report renders
//! a human-readable summary and a JSON export.

pub mod aggregator;
pub mod diff;
pub mod latency;
pub mod performance;
pub mod registry;

pub use aggregator::{
    AggregatorState, ExportOutcome, FinalizedReports, ReportAggregator, Snapshot, Tally,
};
pub use diff::DiffReport;
pub use latency::{LatencySamples, LatencyStats};
pub use performance::PerformanceReport;
pub use registry::{ReportDescriptor, ReportRegistry};

use crate::compare::Comparison;
use std::path::PathBuf;
use std::str::FromStr;
use tc_config::settings::DEFAULT_MAX_RECORDED_MISMATCHES;
use thiserror::Error;

/// A named, incrementally updated report.
pub trait Report: Send {
    /// Registry name, e.g. `DiffReport`.
    fn name(&self) -> &'static str;

    /// Fold one comparison into the report.
    fn record(&mut self, comparison: &Comparison);

    /// Note primary requests that never got a counterpart.
    fn record_unmatched(&mut self, _count: usize) {}

    /// Human-readable summary.
    fn render(&self) -> String;

    /// Export payload.
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
}

/// Parameters shared by report constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Cap on non-identical comparisons a report keeps for export.
    pub max_recorded_mismatches: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_recorded_mismatches: DEFAULT_MAX_RECORDED_MISMATCHES,
        }
    }
}

/// Errors from building, rendering or exporting reports.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("the report type '{0}' is unknown or unavailable")]
    UnknownReportType(String),

    #[error("report {report} could not be serialized: {source}")]
    Serialize {
        report: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("report {report} could not be written to {path}: {source}")]
    Write {
        report: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ReportError> for tc_common::Error {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::UnknownReportType(name) => tc_common::Error::UnknownReportType(name),
            ReportError::Serialize { report, source } => tc_common::Error::ExportFailed {
                report,
                reason: source.to_string(),
            },
            ReportError::Write {
                report,
                path,
                source,
            } => tc_common::Error::ExportFailed {
                report,
                reason: format!("{}: {source}", path.display()),
            },
        }
    }
}

/// A `NAME=PATH` export request; `-` as the path means stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub report_name: String,
    pub path: PathBuf,
}

impl FromStr for ExportRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, path) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=PATH, got '{s}'"))?;
        let name = name.trim();
        if name.is_empty() || path.is_empty() {
            return Err(format!("expected NAME=PATH, got '{s}'"));
        }
        Ok(Self {
            report_name: name.to_string(),
            path: PathBuf::from(path),
        })
    }
}

/// How a requested report is used at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportUse {
    pub display: bool,
    pub export: Option<PathBuf>,
}

impl ReportUse {
    pub fn displayed() -> Self {
        Self {
            display: true,
            export: None,
        }
    }

    pub fn exported(path: impl Into<PathBuf>) -> Self {
        Self {
            display: false,
            export: Some(path.into()),
        }
    }
}

/// Percentage with two decimals, `0.00%` for an empty denominator.
pub(crate) fn percent(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", 100.0 * part as f64 / whole as f64)
}

/// Ratio in `[0, 1]`, `0.0` for an empty denominator.
pub(crate) fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
