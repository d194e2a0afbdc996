//! Traffic Comparator core engine.
//!
//! This crate provides:
//! - Stream correlation of primary and shadow captures
//! - Response comparison and its JSON-lines wire form
//! - Batch analysis and online pipelines
//! - Report aggregation, the report registry and exports
//! - Logging setup and exit codes for the `traffic-comparator` binary

pub mod analyzer;
pub mod compare;
pub mod correlate;
pub mod exit_codes;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use analyzer::Analyzer;
pub use compare::{Comparison, ComparisonRecord, ComparisonRules, DecodeError};
pub use correlate::{correlate, CorrelationOutcome};
pub use exit_codes::ExitCode;
pub use loader::RecordError;
pub use pipeline::{PipelineSummary, StreamComparator, StreamReportOutcome, StreamReporter};
pub use report::{ReportAggregator, ReportError, ReportRegistry};
