//! Semantic validation of a parsed [`Config`].

use crate::settings::Config;
use crate::ConfigError;
use regex::Regex;

/// Check invariants serde cannot express.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.streaming.snapshot_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "streaming.snapshot_interval_secs must be greater than 0".to_string(),
        ));
    }

    for pattern in &config.comparison.body_exclusion_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::Invalid(format!("body exclusion pattern '{pattern}' is invalid: {e}"))
        })?;
    }

    if let Some(report) = config.reports.iter().find(|r| r.report_name.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!(
            "report entry with empty report_name (export_filename: {:?})",
            report.export_filename
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReportConfig;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn bad_regex_is_rejected() {
        let mut config = Config::default();
        config.comparison.body_exclusion_patterns = vec!["[".to_string()];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("body exclusion pattern"));
    }

    #[test]
    fn blank_report_name_is_rejected() {
        let mut config = Config::default();
        config.reports.push(ReportConfig {
            report_name: "  ".to_string(),
            display: true,
            export_filename: None,
        });
        assert!(validate(&config).is_err());
    }
}
