//! Config resolution: CLI path → env var → XDG config dir → defaults.

use crate::settings::Config;
use crate::validate::validate;
use crate::ConfigError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TRAFFIC_COMPARATOR_CONFIG";

const CONFIG_DIR_NAME: &str = "traffic-comparator";
const CONFIG_FILE_NAME: &str = "config.json";

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli(PathBuf),
    Env(PathBuf),
    Xdg(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Cli(p) => write!(f, "--config {}", p.display()),
            ConfigSource::Env(p) => write!(f, "{CONFIG_ENV_VAR}={}", p.display()),
            ConfigSource::Xdg(p) => write!(f, "{}", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

/// A validated config and its origin.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub source: ConfigSource,
}

/// Resolve and validate the effective configuration.
///
/// Explicit paths (CLI or env) must exist; the XDG location is optional.
pub fn resolve_config(cli_path: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    let xdg_path = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    resolve_from(cli_path, env_path, xdg_path)
}

pub(crate) fn resolve_from(
    cli_path: Option<&Path>,
    env_path: Option<PathBuf>,
    xdg_path: Option<PathBuf>,
) -> Result<ResolvedConfig, ConfigError> {
    let (source, path) = if let Some(path) = cli_path {
        (ConfigSource::Cli(path.to_path_buf()), path.to_path_buf())
    } else if let Some(path) = env_path {
        (ConfigSource::Env(path.clone()), path)
    } else if let Some(path) = xdg_path.filter(|p| p.is_file()) {
        (ConfigSource::Xdg(path.clone()), path)
    } else {
        debug!("no config file found, using defaults");
        return Ok(ResolvedConfig {
            config: Config::default(),
            source: ConfigSource::Defaults,
        });
    };

    let config = load_from_file(&path)?;
    validate(&config)?;
    info!(source = %source, "configuration loaded");
    Ok(ResolvedConfig { config, source })
}

/// Load a config file, choosing TOML for `.toml` files and JSON otherwise.
pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config file");
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    if is_toml {
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
