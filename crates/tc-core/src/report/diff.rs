//! Correctness report: how many responses matched, and how they differed.

use super::{percent, ratio, Report, ReportOptions};
use crate::compare::Comparison;
use serde::Serialize;
use serde_json::Value;
use tc_diff::Delta;

/// Match counts plus the deltas of the first non-identical comparisons.
///
/// Only `max_recorded_mismatches` mismatches are kept; later ones are
/// counted, so memory stays bounded on unbounded input.
#[derive(Debug, Clone)]
pub struct DiffReport {
    total: usize,
    identical: usize,
    status_matches: usize,
    unmatched: usize,
    mismatches: Vec<MismatchRecord>,
    unrecorded_mismatches: usize,
    max_recorded: usize,
}

/// One retained non-identical comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub primary_status: Option<u16>,
    pub shadow_status: Option<u16>,
    pub status_code_diff: Delta,
    pub headers_diff: Delta,
    pub body_diff: Delta,
}

impl MismatchRecord {
    fn from_comparison(comparison: &Comparison) -> Self {
        let request = comparison.original_request();
        Self {
            method: request.and_then(|r| r.method()).map(str::to_string),
            uri: request.and_then(|r| r.uri()).map(str::to_string),
            primary_status: comparison.primary_response().status(),
            shadow_status: comparison.shadow_response().status(),
            status_code_diff: comparison.status_code_diff().clone(),
            headers_diff: comparison.headers_diff().clone(),
            body_diff: comparison.body_diff().clone(),
        }
    }
}

#[derive(Serialize)]
struct DiffExport<'a> {
    total_comparisons: usize,
    identical: usize,
    match_rate: f64,
    status_matches: usize,
    status_match_rate: f64,
    unmatched_requests: usize,
    mismatches: &'a [MismatchRecord],
    unrecorded_mismatches: usize,
}

impl DiffReport {
    pub const NAME: &'static str = "DiffReport";
    pub const DESCRIPTION: &'static str = "Provides basic information on how many and what ratio of \
        responses are successfully matched. The exported file provides the same summary followed by \
        the diffs of non-matching responses.";

    pub fn new(options: &ReportOptions) -> Self {
        Self {
            total: 0,
            identical: 0,
            status_matches: 0,
            unmatched: 0,
            mismatches: Vec::new(),
            unrecorded_mismatches: 0,
            max_recorded: options.max_recorded_mismatches,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn identical(&self) -> usize {
        self.identical
    }

    pub fn status_matches(&self) -> usize {
        self.status_matches
    }

    pub fn mismatches(&self) -> &[MismatchRecord] {
        &self.mismatches
    }

    pub fn unrecorded_mismatches(&self) -> usize {
        self.unrecorded_mismatches
    }
}

impl Report for DiffReport {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn record(&mut self, comparison: &Comparison) {
        self.total += 1;
        if comparison.statuses_match() {
            self.status_matches += 1;
        }
        if comparison.is_identical() {
            self.identical += 1;
        } else if self.mismatches.len() < self.max_recorded {
            self.mismatches.push(MismatchRecord::from_comparison(comparison));
        } else {
            self.unrecorded_mismatches += 1;
        }
    }

    fn record_unmatched(&mut self, count: usize) {
        self.unmatched += count;
    }

    fn render(&self) -> String {
        let mut out = format!(
            "{} responses were compared.\n\
             {} were identical, for a match rate of {}\n\
             The status codes matched in {} of responses.\n",
            self.total,
            self.identical,
            percent(self.identical, self.total),
            percent(self.status_matches, self.total),
        );
        if self.unmatched > 0 {
            out.push_str(&format!("{} requests were not matched.\n", self.unmatched));
        }
        out
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(DiffExport {
            total_comparisons: self.total,
            identical: self.identical,
            match_rate: ratio(self.identical, self.total),
            status_matches: self.status_matches,
            status_match_rate: ratio(self.status_matches, self.total),
            unmatched_requests: self.unmatched,
            mismatches: &self.mismatches,
            unrecorded_mismatches: self.unrecorded_mismatches,
        })
    }
}
