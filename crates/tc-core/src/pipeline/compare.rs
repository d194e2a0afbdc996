//! `stream` mode: matched pairs in, comparison lines out.

use super::PipelineSummary;
use crate::compare::{Comparison, ComparisonRules};
use crate::loader::{decode_matched_pair, InputLines};
use crate::report::{FinalizedReports, ReportAggregator, Snapshot};
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Compares each matched pair as it arrives and emits one JSON line per pair.
///
/// The output carries only comparison lines, so aggregator snapshots taken
/// along the way are logged rather than written.
#[derive(Debug, Clone, Default)]
pub struct StreamComparator {
    rules: ComparisonRules,
}

impl StreamComparator {
    pub fn new(rules: ComparisonRules) -> Self {
        Self { rules }
    }

    /// Process `input` until end-of-input. Output is flushed after every line
    /// so downstream consumers see comparisons as they are produced.
    pub fn run<R: BufRead, W: Write>(
        &self,
        input: R,
        mut output: W,
        mut aggregator: ReportAggregator,
    ) -> tc_common::Result<(PipelineSummary, FinalizedReports)> {
        let mut summary = PipelineSummary::default();
        for item in InputLines::new(input) {
            let (line_no, line) = item?;
            let decoded = match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => decode_matched_pair(&line, line_no),
                Err(err) => Err(err),
            };
            match decoded {
                Ok(pair) => {
                    let comparison = Comparison::from_matched(pair, &self.rules);
                    writeln!(output, "{}", comparison.to_json_line()?)?;
                    output.flush()?;

                    aggregator.update(&comparison);
                    summary.count(comparison.is_identical());
                    debug!(line = line_no, identical = comparison.is_identical(), "pair compared");
                }
                Err(err) => {
                    summary.skipped += 1;
                    warn!(line = err.line(), error = %err, "skipping malformed matched pair");
                }
            }
            if let Some(snapshot) = aggregator.poll_snapshot(Instant::now()) {
                log_snapshot(&snapshot);
            }
        }

        let finalized = aggregator.finalize();
        log_snapshot(&finalized.snapshot());
        info!(
            processed = summary.processed,
            identical = summary.identical,
            skipped = summary.skipped,
            "stream finished"
        );
        Ok((summary, finalized))
    }
}

fn log_snapshot(snapshot: &Snapshot) {
    info!(
        is_final = snapshot.is_final,
        compared = snapshot.tally.total,
        identical = snapshot.tally.identical,
        "comparison progress"
    );
    for (report, body) in &snapshot.sections {
        info!(report = %report, "{body}");
    }
}
