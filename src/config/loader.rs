//! Configuration file loading with precedence handling.

use crate::height_cache::{EstimateConfig, HeightCacheConfig};
use crate::view_state::{ScrollConfig, VirtualizerConfig};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "STREAMLIST_CONFIG";
/// Environment variable overriding the log file path.
pub const LOG_FILE_ENV: &str = "STREAMLIST_LOG_FILE";
/// Environment variable disabling height snapshot persistence.
pub const NO_PERSIST_ENV: &str = "STREAMLIST_NO_PERSIST";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file path contains invalid UTF-8 or cannot be resolved.
    #[error("Invalid config path: {0}")]
    InvalidPath(String),

    /// Failed to read config file (permission issues, not a file).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML or unknown fields.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional; missing fields and sections use defaults.
/// Corresponds to `~/.config/streamlist/config.toml`:
///
/// ```toml
/// persist = true
///
/// [estimate]
/// default_height = 80.0
/// chars_per_line = 80
///
/// [estimate.roles]
/// tool = 120.0
///
/// [virtualizer]
/// overscan_before = 5
/// overscan_after = 10
///
/// [scroll]
/// bottom_threshold = 50.0
///
/// [cache]
/// capacity = 5000
/// ttl_secs = 604800
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,

    /// Directory holding the height snapshot.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Persist measured heights between runs.
    #[serde(default)]
    pub persist: Option<bool>,

    /// Height estimation parameters.
    #[serde(default)]
    pub estimate: Option<EstimateConfig>,

    /// Overscan and initial window size.
    #[serde(default)]
    pub virtualizer: Option<VirtualizerConfig>,

    /// Boundary thresholds and auto-follow.
    #[serde(default)]
    pub scroll: Option<ScrollConfig>,

    /// Height cache capacity and persistence.
    #[serde(default)]
    pub cache: Option<HeightCacheConfig>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Height estimation parameters.
    pub estimate: EstimateConfig,
    /// Overscan and initial window size.
    pub virtualizer: VirtualizerConfig,
    /// Boundary thresholds and auto-follow.
    pub scroll: ScrollConfig,
    /// Height cache capacity and persistence.
    pub cache: HeightCacheConfig,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
    /// Directory holding the height snapshot.
    pub cache_dir: PathBuf,
    /// Persist measured heights between runs.
    pub persist: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            estimate: EstimateConfig::default(),
            virtualizer: VirtualizerConfig::default(),
            scroll: ScrollConfig::default(),
            cache: HeightCacheConfig::default(),
            log_file_path: default_log_path(),
            cache_dir: default_cache_dir(),
            persist: true,
        }
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/streamlist/streamlist.log` on Unix-like systems,
/// or the platform state directory elsewhere. Falls back to the current
/// directory if no state directory exists.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("streamlist").join("streamlist.log")
    } else {
        PathBuf::from("streamlist.log")
    }
}

/// Resolve default snapshot directory.
///
/// Returns `~/.cache/streamlist` on Linux, the platform cache directory
/// elsewhere, or `.streamlist-cache` in the current directory as a fallback.
pub fn default_cache_dir() -> PathBuf {
    match dirs::cache_dir() {
        Some(cache_dir) => cache_dir.join("streamlist"),
        None => PathBuf::from(".streamlist-cache"),
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/streamlist/config.toml` on Unix, appropriate path on
/// other platforms. Returns `None` if no config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("streamlist").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `STREAMLIST_CONFIG` environment variable
/// 3. Default path `~/.config/streamlist/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed,
/// or if `STREAMLIST_CONFIG` is set to an empty string.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if env_path.trim().is_empty() {
            return Err(ConfigError::InvalidPath(format!("{CONFIG_ENV} is empty")));
        }
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use
/// the default. Engine sections are sanitized.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        estimate: config.estimate.unwrap_or(defaults.estimate).sanitized(),
        virtualizer: config.virtualizer.unwrap_or(defaults.virtualizer),
        scroll: config.scroll.unwrap_or(defaults.scroll).sanitized(),
        cache: config.cache.unwrap_or(defaults.cache),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
        cache_dir: config.cache_dir.unwrap_or(defaults.cache_dir),
        persist: config.persist.unwrap_or(defaults.persist),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `STREAMLIST_LOG_FILE`: override log file path
/// - `STREAMLIST_NO_PERSIST`: any value except empty, `0` or `false`
///   disables persistence
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(path) = std::env::var(LOG_FILE_ENV) {
        if !path.is_empty() {
            config.log_file_path = PathBuf::from(path);
        }
    }

    if let Ok(value) = std::env::var(NO_PERSIST_ENV) {
        let value = value.trim();
        if !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false")) {
            config.persist = false;
        }
    }

    config
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence. Only flags that were explicitly set
/// are applied.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(
    mut config: ResolvedConfig,
    log_file_override: Option<PathBuf>,
    persist_override: Option<bool>,
) -> ResolvedConfig {
    if let Some(path) = log_file_override {
        config.log_file_path = path;
    }

    if let Some(persist) = persist_override {
        config.persist = persist;
    }

    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
