//! Running aggregation of comparisons into reports.
//!
//! The aggregator moves `Idle → Processing` on the first update and is
//! consumed by [`ReportAggregator::finalize`], so nothing can be recorded
//! after the final snapshot. Report statistics are computed only when a
//! snapshot is rendered, at most once per snapshot interval.

use super::{Report, ReportError, ReportOptions, ReportRegistry, ReportUse};
use crate::compare::Comparison;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tc_common::{RunId, SCHEMA_VERSION};
use tracing::{debug, info, warn};

/// Lifecycle of an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatorState {
    Idle,
    Processing,
    Finalized,
}

/// Running counters shared by every report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub identical: usize,
    pub status_matches: usize,
    pub unmatched: usize,
}

impl Tally {
    pub fn mismatches(&self) -> usize {
        self.total - self.identical
    }
}

struct Entry {
    report: Box<dyn Report>,
    usage: ReportUse,
}

/// Feeds comparisons to the requested reports and renders snapshots.
pub struct ReportAggregator {
    state: AggregatorState,
    tally: Tally,
    entries: Vec<Entry>,
    options: ReportOptions,
    snapshot_interval: Duration,
    last_snapshot: Instant,
    run_id: RunId,
}

impl fmt::Debug for ReportAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportAggregator")
            .field("state", &self.state)
            .field("tally", &self.tally)
            .field("reports", &self.report_names())
            .field("snapshot_interval", &self.snapshot_interval)
            .finish()
    }
}

impl ReportAggregator {
    /// The snapshot timer starts now.
    pub fn new(options: ReportOptions, snapshot_interval: Duration) -> Self {
        Self {
            state: AggregatorState::Idle,
            tally: Tally::default(),
            entries: Vec::new(),
            options,
            snapshot_interval,
            last_snapshot: Instant::now(),
            run_id: RunId::new(),
        }
    }

    /// Request a report. Asking for the same report twice merges the uses.
    ///
    /// Reports added after processing started only see later comparisons.
    pub fn add_report(
        &mut self,
        registry: &ReportRegistry,
        name: &str,
        usage: ReportUse,
    ) -> Result<(), ReportError> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.report.name() == name) {
            entry.usage.display |= usage.display;
            if usage.export.is_some() {
                entry.usage.export = usage.export;
            }
            return Ok(());
        }
        let report = registry.create(name, &self.options)?;
        debug!(report = name, display = usage.display, "report added");
        self.entries.push(Entry { report, usage });
        Ok(())
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn report_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.report.name()).collect()
    }

    /// Fold one comparison into the counters and every report.
    pub fn update(&mut self, comparison: &Comparison) {
        self.state = AggregatorState::Processing;
        self.tally.total += 1;
        if comparison.is_identical() {
            self.tally.identical += 1;
        }
        if comparison.statuses_match() {
            self.tally.status_matches += 1;
        }
        for entry in &mut self.entries {
            entry.report.record(comparison);
        }
    }

    /// Count primary requests that were never compared.
    pub fn record_unmatched(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.state = AggregatorState::Processing;
        self.tally.unmatched += count;
        for entry in &mut self.entries {
            entry.report.record_unmatched(count);
        }
    }

    pub fn snapshot_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_snapshot) >= self.snapshot_interval
    }

    /// Render a snapshot if the interval has elapsed since the last one.
    pub fn poll_snapshot(&mut self, now: Instant) -> Option<Snapshot> {
        if !self.snapshot_due(now) {
            return None;
        }
        self.last_snapshot = now;
        Some(self.snapshot())
    }

    /// Render a snapshot of the displayed reports right now.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::render(&self.entries, self.tally, self.state, false)
    }

    /// Stop accepting updates and hand over the reports for output.
    pub fn finalize(self) -> FinalizedReports {
        info!(
            total = self.tally.total,
            identical = self.tally.identical,
            unmatched = self.tally.unmatched,
            "aggregation finalized"
        );
        FinalizedReports {
            tally: self.tally,
            entries: self.entries,
            run_id: self.run_id,
        }
    }
}

/// Reports after the input ended; read-only.
pub struct FinalizedReports {
    tally: Tally,
    entries: Vec<Entry>,
    run_id: RunId,
}

impl fmt::Debug for FinalizedReports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizedReports")
            .field("tally", &self.tally)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ExportEnvelope<'a> {
    schema_version: &'static str,
    report: &'static str,
    run_id: &'a str,
    generated_at: String,
    data: serde_json::Value,
}

impl FinalizedReports {
    pub fn state(&self) -> AggregatorState {
        AggregatorState::Finalized
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// The forced last snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::render(&self.entries, self.tally, AggregatorState::Finalized, true)
    }

    /// `(name, rendered summary)` for every report flagged for display.
    pub fn displayed(&self) -> impl Iterator<Item = (&'static str, String)> + '_ {
        self.entries
            .iter()
            .filter(|e| e.usage.display)
            .map(|e| (e.report.name(), e.report.render()))
    }

    /// Render one report by name, displayed or not.
    pub fn render(&self, name: &str) -> Result<String, ReportError> {
        self.entries
            .iter()
            .find(|e| e.report.name() == name)
            .map(|e| e.report.render())
            .ok_or_else(|| ReportError::UnknownReportType(name.to_string()))
    }

    /// Export payload for one report, wrapped with run metadata.
    pub fn export_json(&self, name: &str) -> Result<serde_json::Value, ReportError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.report.name() == name)
            .ok_or_else(|| ReportError::UnknownReportType(name.to_string()))?;
        let serialize_err = |source: serde_json::Error| ReportError::Serialize {
            report: name.to_string(),
            source,
        };
        let data = entry.report.to_json().map_err(serialize_err)?;
        serde_json::to_value(ExportEnvelope {
            schema_version: SCHEMA_VERSION,
            report: entry.report.name(),
            run_id: &self.run_id.0,
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            data,
        })
        .map_err(serialize_err)
    }

    /// Write one report's export as pretty JSON; `-` writes to stdout.
    pub fn export_to(&self, name: &str, path: &Path) -> Result<(), ReportError> {
        let payload = self.export_json(name)?;
        let write_err = |source: io::Error| ReportError::Write {
            report: name.to_string(),
            path: path.to_path_buf(),
            source,
        };
        if path == Path::new("-") {
            let stdout = io::stdout();
            write_json(stdout.lock(), &payload).map_err(write_err)?;
        } else {
            let file = File::create(path).map_err(write_err)?;
            write_json(BufWriter::new(file), &payload).map_err(write_err)?;
        }
        info!(report = name, path = %path.display(), "report exported");
        Ok(())
    }

    /// Write every configured export. A failed export is logged and kept in
    /// the outcome; the remaining exports are still written.
    pub fn export_all(&self) -> ExportOutcome {
        let mut outcome = ExportOutcome::default();
        for entry in &self.entries {
            let Some(path) = &entry.usage.export else {
                continue;
            };
            match self.export_to(entry.report.name(), path) {
                Ok(()) => outcome.written.push((entry.report.name(), path.clone())),
                Err(err) => {
                    warn!(report = entry.report.name(), error = %err, "export failed");
                    outcome.failed.push(err);
                }
            }
        }
        outcome
    }
}

/// What [`FinalizedReports::export_all`] wrote and what it could not.
#[derive(Debug, Default)]
pub struct ExportOutcome {
    pub written: Vec<(&'static str, PathBuf)>,
    pub failed: Vec<ReportError>,
}

impl ExportOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn write_json<W: Write>(mut out: W, payload: &serde_json::Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, payload)?;
    out.write_all(b"\n")?;
    out.flush()
}

/// A rendered point-in-time view of the aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub state: AggregatorState,
    pub is_final: bool,
    pub tally: Tally,
    /// `(report name, rendered summary)` for displayed reports.
    pub sections: Vec<(String, String)>,
}

impl Snapshot {
    fn render(entries: &[Entry], tally: Tally, state: AggregatorState, is_final: bool) -> Self {
        Self {
            taken_at: Utc::now(),
            state,
            is_final,
            tally,
            sections: entries
                .iter()
                .filter(|e| e.usage.display)
                .map(|e| (e.report.name().to_string(), e.report.render()))
                .collect(),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.is_final { "Final snapshot" } else { "Snapshot" };
        writeln!(
            f,
            "== {label} at {} ==",
            self.taken_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        writeln!(
            f,
            "{} compared, {} identical, {} unmatched",
            self.tally.total, self.tally.identical, self.tally.unmatched
        )?;
        for (name, body) in &self.sections {
            writeln!(f)?;
            writeln!(f, "{name}:")?;
            write!(f, "{body}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::ComparisonRules;
    use serde_json::json;
    use tc_common::Response;
    use tempfile::tempdir;

    fn comparison(same: bool) -> Comparison {
        let shadow_status = if same { 200 } else { 404 };
        Comparison::new(
            Response::new(Some(200), json!({}), json!({})).with_latency(10),
            Response::new(Some(shadow_status), json!({}), json!({})).with_latency(12),
            None,
            &ComparisonRules::default(),
        )
    }

    fn aggregator(interval: Duration) -> ReportAggregator {
        let registry = ReportRegistry::builtin();
        let mut agg = ReportAggregator::new(ReportOptions::default(), interval);
        agg.add_report(&registry, "DiffReport", ReportUse::displayed())
            .unwrap();
        agg.add_report(&registry, "PerformanceReport", ReportUse::default())
            .unwrap();
        agg
    }

    #[test]
    fn state_moves_from_idle_to_processing() {
        let mut agg = aggregator(Duration::from_secs(60));
        assert_eq!(agg.state(), AggregatorState::Idle);
        agg.update(&comparison(true));
        assert_eq!(agg.state(), AggregatorState::Processing);
        assert_eq!(agg.finalize().state(), AggregatorState::Finalized);
    }

    #[test]
    fn tally_counts() {
        let mut agg = aggregator(Duration::from_secs(60));
        agg.update(&comparison(true));
        agg.update(&comparison(false));
        agg.record_unmatched(3);
        let tally = agg.tally();
        assert_eq!(tally.total, 2);
        assert_eq!(tally.identical, 1);
        assert_eq!(tally.status_matches, 1);
        assert_eq!(tally.unmatched, 3);
        assert_eq!(tally.mismatches(), 1);
    }

    #[test]
    fn snapshot_timer() {
        let mut agg = aggregator(Duration::from_secs(60));
        let start = Instant::now();
        assert!(agg.poll_snapshot(start).is_none());
        let later = start + Duration::from_secs(61);
        let snapshot = agg.poll_snapshot(later).unwrap();
        assert!(!snapshot.is_final);
        assert!(agg.poll_snapshot(later + Duration::from_secs(1)).is_none());
        assert!(agg.poll_snapshot(later + Duration::from_secs(60)).is_some());
    }

    #[test]
    fn snapshot_shows_displayed_reports_only() {
        let mut agg = aggregator(Duration::from_secs(60));
        agg.update(&comparison(false));
        let text = agg.snapshot().to_string();
        assert!(text.contains("DiffReport:"));
        assert!(text.contains("1 compared, 0 identical, 0 unmatched"));
        assert!(!text.contains("PerformanceReport:"));
    }

    #[test]
    fn duplicate_requests_merge_usage() {
        let registry = ReportRegistry::builtin();
        let mut agg = ReportAggregator::new(ReportOptions::default(), Duration::from_secs(1));
        agg.add_report(&registry, "DiffReport", ReportUse::exported("a.json"))
            .unwrap();
        agg.add_report(&registry, "DiffReport", ReportUse::displayed())
            .unwrap();
        assert_eq!(agg.report_names(), vec!["DiffReport"]);
        let finalized = agg.finalize();
        assert_eq!(finalized.displayed().count(), 1);
    }

    #[test]
    fn unknown_report_is_rejected_without_affecting_others() {
        let registry = ReportRegistry::builtin();
        let mut agg = aggregator(Duration::from_secs(60));
        let err = agg
            .add_report(&registry, "Nope", ReportUse::displayed())
            .unwrap_err();
        assert!(matches!(err, ReportError::UnknownReportType(ref n) if n == "Nope"));
        assert_eq!(agg.report_names().len(), 2);
    }

    #[test]
    fn exports_are_pretty_json_with_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("perf.json");
        let registry = ReportRegistry::builtin();
        let mut agg = ReportAggregator::new(ReportOptions::default(), Duration::from_secs(60));
        agg.add_report(&registry, "PerformanceReport", ReportUse::exported(&path))
            .unwrap();
        agg.update(&comparison(true));

        let finalized = agg.finalize();
        let outcome = finalized.export_all();
        assert!(outcome.is_complete());
        assert_eq!(outcome.written, vec![("PerformanceReport", path.clone())]);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["schema_version"], json!(SCHEMA_VERSION));
        assert_eq!(value["report"], json!("PerformanceReport"));
        assert!(value["run_id"].as_str().unwrap().starts_with("run-"));
        assert_eq!(value["data"]["primary"]["stats"]["mean"], json!(10.0));
    }

    #[test]
    fn failed_export_does_not_stop_the_others() {
        let dir = tempdir().unwrap();
        let unwritable = dir.path().join("missing").join("diff.json");
        let writable = dir.path().join("perf.json");
        let registry = ReportRegistry::builtin();
        let mut agg = ReportAggregator::new(ReportOptions::default(), Duration::from_secs(60));
        agg.add_report(&registry, "DiffReport", ReportUse::exported(&unwritable))
            .unwrap();
        agg.add_report(&registry, "PerformanceReport", ReportUse::exported(&writable))
            .unwrap();
        agg.update(&comparison(true));

        let outcome = agg.finalize().export_all();
        assert!(!outcome.is_complete());
        assert_eq!(outcome.written, vec![("PerformanceReport", writable.clone())]);
        assert_eq!(outcome.failed.len(), 1);
        assert!(matches!(
            &outcome.failed[0],
            ReportError::Write { report, path, .. } if report == "DiffReport" && *path == unwritable
        ));
        assert!(writable.exists());
    }

    #[test]
    fn rendering_a_report_that_was_not_requested_fails() {
        let finalized = aggregator(Duration::from_secs(60)).finalize();
        assert!(finalized.render("DiffReport").is_ok());
        assert!(matches!(
            finalized.render("Other"),
            Err(ReportError::UnknownReportType(_))
        ));
    }
}
