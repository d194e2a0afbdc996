//! Exit codes for the traffic-comparator CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing.
//! They are stable across releases.

/// Exit codes for traffic-comparator operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Everything compared was identical (or there was nothing to compare)
    Clean = 0,

    /// At least one comparison was not identical
    MismatchesFound = 1,

    /// Configuration error
    ConfigError = 10,

    /// Input could not be read or decoded
    InputError = 11,

    /// A report could not be built or exported
    ReportError = 12,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Outcome of a completed run.
    pub fn for_mismatches(mismatches: usize) -> Self {
        if mismatches == 0 {
            ExitCode::Clean
        } else {
            ExitCode::MismatchesFound
        }
    }

    /// Map an error onto its exit code by error-code range.
    pub fn from_error(err: &tc_common::Error) -> Self {
        match err.code() {
            10..=19 => ExitCode::ConfigError,
            20..=29 => ExitCode::InputError,
            30..=39 => ExitCode::ReportError,
            60..=69 => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }

    /// The more severe of two codes.
    pub fn max(self, other: ExitCode) -> ExitCode {
        if other.as_i32() > self.as_i32() {
            other
        } else {
            self
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
