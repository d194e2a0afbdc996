//! Traffic Comparator configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the comparator config file (JSON or TOML)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation

pub mod resolve;
pub mod settings;
pub mod validate;

pub use resolve::{load_from_file, resolve_config, ConfigSource, ResolvedConfig, CONFIG_ENV_VAR};
pub use settings::{ComparisonSettings, Config, ReportConfig, StreamingSettings};
pub use validate::validate;

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the config at path {path} is not parsable as JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("the config at path {path} is not parsable as TOML: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
