//! Configuration loading and resolution
//!
//! Bootstrap settings come from a single TOML file. The file is located in
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. `PCB_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/pcb/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing file never prevents startup: a warning is logged and the
//! compiled defaults are used. A file that exists but cannot be parsed or
//! fails validation is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PCB_CONFIG";

/// Top-level configuration file layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PcbConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Freshness cache windows
    #[serde(default)]
    pub cache: CacheConfig,

    /// Survey ingest settings
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Freshness cache windows (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Snapshots younger than this are served without any refresh
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Snapshots older than this are recomputed before serving
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Upper bound on one background refresh
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
            max_age_secs: default_max_age_secs(),
            refresh_timeout_secs: default_refresh_timeout_secs(),
        }
    }
}

impl CacheConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

/// How aggregated records are keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// specialty | provider type | region | survey source
    #[default]
    BySource,
    /// specialty | provider type | region | survey source | survey year
    BySourceAndYear,
}

/// Survey ingest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Surveys fetched and normalized concurrently
    #[serde(default = "default_max_concurrent_surveys")]
    pub max_concurrent_surveys: usize,

    /// Rows requested per data store page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Rows per aggregation chunk between scheduler yields
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Grouping used for the default aggregated view
    #[serde(default)]
    pub grouping: Grouping,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_surveys: default_max_concurrent_surveys(),
            page_size: default_page_size(),
            chunk_size: default_chunk_size(),
            grouping: Grouping::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stale_after_secs() -> u64 {
    5 * 60
}

fn default_max_age_secs() -> u64 {
    30 * 60
}

fn default_refresh_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_surveys() -> usize {
    3
}

fn default_page_size() -> usize {
    5_000
}

fn default_chunk_size() -> usize {
    1_000
}

impl PcbConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PcbConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.ingest.max_concurrent_surveys == 0 {
            return Err(Error::Config(
                "ingest.max_concurrent_surveys must be at least 1".to_string(),
            ));
        }
        if self.ingest.page_size == 0 {
            return Err(Error::Config("ingest.page_size must be at least 1".to_string()));
        }
        if self.ingest.chunk_size == 0 {
            return Err(Error::Config("ingest.chunk_size must be at least 1".to_string()));
        }
        if self.cache.stale_after_secs > self.cache.max_age_secs {
            return Err(Error::Config(format!(
                "cache.stale_after_secs ({}) must not exceed cache.max_age_secs ({})",
                self.cache.stale_after_secs, self.cache.max_age_secs
            )));
        }
        Ok(())
    }
}

/// Locates and loads the configuration file
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Path that would be read, following the priority order
    pub fn config_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_path()
    }

    /// Resolve and load the configuration
    ///
    /// Missing files fall back to defaults; malformed files are errors.
    pub fn resolve(&self) -> Result<PcbConfig> {
        let Some(path) = self.config_path() else {
            warn!("No config directory available on this platform, using defaults");
            return Ok(PcbConfig::default());
        };

        if !path.exists() {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(PcbConfig::default());
        }

        let config = PcbConfig::load(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Platform default config file location
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pcb").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_windows() {
        let config = PcbConfig::default();
        assert_eq!(config.cache.stale_after(), Duration::from_secs(300));
        assert_eq!(config.cache.max_age(), Duration::from_secs(1800));
        assert_eq!(config.ingest.max_concurrent_surveys, 3);
        assert_eq!(config.ingest.chunk_size, 1000);
        assert_eq!(config.ingest.grouping, Grouping::BySource);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PcbConfig::from_toml_str("[cache]\nmax_age_secs = 3600\n").unwrap();
        assert_eq!(config.cache.max_age_secs, 3600);
        assert_eq!(config.cache.stale_after_secs, 300);
        assert_eq!(config.ingest, IngestConfig::default());
    }

    #[test]
    fn test_stale_window_longer_than_max_age_rejected() {
        let err = PcbConfig::from_toml_str(
            "[cache]\nstale_after_secs = 100\nmax_age_secs = 50\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("stale_after_secs"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = PcbConfig::from_toml_str("[ingest]\nmax_concurrent_surveys = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_grouping_parses_snake_case() {
        let config =
            PcbConfig::from_toml_str("[ingest]\ngrouping = \"by_source_and_year\"\n").unwrap();
        assert_eq!(config.ingest.grouping, Grouping::BySourceAndYear);
    }
}
