//! Online pipelines over unbounded line-oriented input.
//!
//! Each line is fully processed before the next is read; the only blocking
//! point is the read itself. Closing the input ends the run.

pub mod compare;
pub mod report;

pub use compare::StreamComparator;
pub use report::{StreamReportOutcome, StreamReporter};

use serde::Serialize;

/// Counts for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    /// Records turned into comparisons.
    pub processed: usize,
    /// Of those, how many were identical.
    pub identical: usize,
    /// Lines that could not be decoded.
    pub skipped: usize,
}

impl PipelineSummary {
    pub fn mismatches(&self) -> usize {
        self.processed - self.identical
    }

    pub(crate) fn count(&mut self, identical: bool) {
        self.processed += 1;
        if identical {
            self.identical += 1;
        }
    }
}
