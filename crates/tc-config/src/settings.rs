//! Configuration file types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default cadence for streaming report snapshots.
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 60;

/// Default cap on non-identical comparisons kept for diff exports.
pub const DEFAULT_MAX_RECORDED_MISMATCHES: usize = 1000;

/// Complete comparator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Captured traffic from the primary cluster (batch `run` mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_log_file: Option<PathBuf>,

    /// Captured traffic from the shadow cluster (batch `run` mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_log_file: Option<PathBuf>,

    pub comparison: ComparisonSettings,

    pub streaming: StreamingSettings,

    pub reports: Vec<ReportConfig>,
}

/// Exclusion and case-handling knobs for response comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    /// Keep the built-in header/body exclusions for cluster-specific fields.
    pub use_default_exclusions: bool,

    /// Extra header names (or full header paths) to ignore.
    pub header_exclusions: Vec<String>,

    /// Extra literal body paths to ignore, e.g. `root['hits']['max_score']`.
    pub body_exclusions: Vec<String>,

    /// Regular expressions matched against full body paths.
    pub body_exclusion_patterns: Vec<String>,

    /// Compare header values case-insensitively.
    pub case_insensitive_headers: bool,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            use_default_exclusions: true,
            header_exclusions: Vec::new(),
            body_exclusions: Vec::new(),
            body_exclusion_patterns: Vec::new(),
            case_insensitive_headers: true,
        }
    }
}

/// Streaming report cadence and memory bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    pub snapshot_interval_secs: u64,
    pub max_recorded_mismatches: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: DEFAULT_SNAPSHOT_INTERVAL_SECS,
            max_recorded_mismatches: DEFAULT_MAX_RECORDED_MISMATCHES,
        }
    }
}

/// A report to display and/or export at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub report_name: String,

    #[serde(default)]
    pub display: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_filename: Option<PathBuf>,
}

impl Config {
    /// Names of reports flagged for display.
    pub fn displayed_reports(&self) -> impl Iterator<Item = &str> {
        self.reports
            .iter()
            .filter(|r| r.display)
            .map(|r| r.report_name.as_str())
    }

    /// `(name, path)` for every report with an export file.
    pub fn exported_reports(&self) -> impl Iterator<Item = (&str, &PathBuf)> {
        self.reports
            .iter()
            .filter_map(|r| r.export_filename.as_ref().map(|p| (r.report_name.as_str(), p)))
    }
}
