//! Error types for Traffic Comparator.

use thiserror::Error;

/// Result type alias for Traffic Comparator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Traffic Comparator.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Input errors (20-29)
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("comparison record could not be decoded: {0}")]
    Decode(String),

    // Report errors (30-39)
    #[error("the report type '{0}' is unknown or unavailable")]
    UnknownReportType(String),

    #[error("report export failed for {report}: {reason}")]
    ExportFailed { report: String, reason: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::MalformedRecord { .. } => 20,
            Error::Decode(_) => 21,
            Error::UnknownReportType(_) => 30,
            Error::ExportFailed { .. } => 31,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Whether the error affects a single record and processing may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedRecord { .. } | Error::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_errors_are_recoverable() {
        let err = Error::MalformedRecord {
            line: 3,
            reason: "missing shadowResponse".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.code(), 20);
        assert_eq!(
            err.to_string(),
            "malformed record on line 3: missing shadowResponse"
        );
    }

    #[test]
    fn report_errors_are_fatal_to_the_request() {
        let err = Error::UnknownReportType("NopeReport".to_string());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("NopeReport"));
    }
}
