//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PXM_CONFIG";

/// Environment variable overriding the configured log level
pub const LOG_LEVEL_ENV_VAR: &str = "PXM_LOG_LEVEL";

/// Configuration loaded from TOML file
///
/// Every section is optional; an empty file yields the compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Report output configuration (optional)
    #[serde(default)]
    pub report: ReportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Strip `*_recommendation_or_issue` columns before writing
    #[serde(default)]
    pub prune_recommendations: bool,

    /// Pretty-print the JSON table
    #[serde(default)]
    pub pretty: bool,

    /// Output file (stdout when unset)
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default config file location: `<config_dir>/pxm/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pxm").join("config.toml"))
}

/// Load and parse a TOML config file
///
/// Missing or malformed files are errors here; callers decide whether
/// that is fatal.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolves the effective configuration for one run
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
    default_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver with an optional `--config` argument
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self {
            cli_path,
            default_path: default_config_path(),
        }
    }

    /// Replace the platform default config location
    pub fn with_default_path(mut self, path: Option<PathBuf>) -> Self {
        self.default_path = path;
        self
    }

    /// Resolve configuration
    ///
    /// An explicitly named file (argument or environment) must load. The
    /// default location is best-effort: absent or broken files fall back
    /// to compiled defaults with a warning.
    pub fn resolve(&self) -> Result<TomlConfig> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            debug!("Loading config from command line: {}", path.display());
            return load_toml_config(path);
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                debug!("Loading config from {}: {}", CONFIG_ENV_VAR, path);
                return load_toml_config(Path::new(path.trim()));
            }
        }

        // Priority 3: TOML config file at the default location
        if let Some(path) = &self.default_path {
            if path.exists() {
                match load_toml_config(path) {
                    Ok(config) => return Ok(config),
                    Err(e) => warn!("Ignoring default config file: {}", e),
                }
            }
        }

        // Priority 4: Compiled defaults
        Ok(TomlConfig::default())
    }

    /// Resolve the log level: argument, then environment, then config
    pub fn log_level(&self, cli_level: Option<&str>, config: &TomlConfig) -> String {
        if let Some(level) = cli_level.filter(|l| !l.trim().is_empty()) {
            return level.trim().to_string();
        }
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV_VAR) {
            if !level.trim().is_empty() {
                return level.trim().to_string();
            }
        }
        config.logging.level.clone()
    }
}
