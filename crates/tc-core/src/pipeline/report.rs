//! `stream-report` mode: comparison lines in, periodic snapshots out.

use super::PipelineSummary;
use crate::compare::Comparison;
use crate::loader::InputLines;
use crate::report::{ExportOutcome, FinalizedReports, ReportAggregator, Snapshot};
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything a finished `stream-report` run produced.
#[derive(Debug)]
pub struct StreamReportOutcome {
    pub summary: PipelineSummary,
    pub reports: FinalizedReports,
    pub exports: ExportOutcome,
}

/// Aggregates comparison lines and writes snapshots on the aggregator's
/// cadence, then a final snapshot and any configured exports.
///
/// The timer is checked when a line arrives, so an idle input produces no
/// snapshots until the next line or end-of-input.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamReporter;

impl StreamReporter {
    pub fn new() -> Self {
        Self
    }

    /// Only I/O failures on `input` or `output` end the run early. Export
    /// failures are returned in the outcome.
    pub fn run<R: BufRead, W: Write>(
        &self,
        input: R,
        mut output: W,
        mut aggregator: ReportAggregator,
    ) -> tc_common::Result<StreamReportOutcome> {
        let mut summary = PipelineSummary::default();
        for item in InputLines::new(input) {
            let (line_no, line) = item?;
            let decoded = match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => Comparison::from_wire(&line).map_err(|err| err.to_string()),
                Err(err) => Err(err.to_string()),
            };
            match decoded {
                Ok(comparison) => {
                    aggregator.update(&comparison);
                    summary.count(comparison.is_identical());
                }
                Err(error) => {
                    summary.skipped += 1;
                    warn!(line = line_no, %error, "skipping undecodable comparison");
                }
            }
            if let Some(snapshot) = aggregator.poll_snapshot(Instant::now()) {
                debug!(processed = summary.processed, "writing snapshot");
                write_snapshot(&mut output, &snapshot)?;
            }
        }

        let reports = aggregator.finalize();
        write_snapshot(&mut output, &reports.snapshot())?;
        let exports = reports.export_all();
        info!(
            processed = summary.processed,
            identical = summary.identical,
            skipped = summary.skipped,
            exports_failed = exports.failed.len(),
            "stream report finished"
        );
        Ok(StreamReportOutcome {
            summary,
            reports,
            exports,
        })
    }
}

fn write_snapshot<W: Write>(output: &mut W, snapshot: &Snapshot) -> std::io::Result<()> {
    writeln!(output, "{snapshot}")?;
    output.flush()
}
