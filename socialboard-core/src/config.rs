//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/socialboard/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/socialboard/` (~/.config/socialboard/)
//! - State/Logs: `$XDG_STATE_HOME/socialboard/` (~/.local/state/socialboard/)

use chrono::NaiveDate;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Defaults applied when building analyses
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Aggregation client boundary settings
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults for analysis construction
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Result-size cap for frequency distributions when a dimension sets none
    #[serde(default = "default_frequency_threshold")]
    pub frequency_threshold: u32,

    /// How far back the upstream API keeps data, in days
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Time-series interval used when the request does not name one
    #[serde(default = "default_interval")]
    pub default_interval: String,

    /// Time-series span used when the request does not give one
    #[serde(default = "default_span")]
    pub default_span: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frequency_threshold: default_frequency_threshold(),
            retention_days: default_retention_days(),
            default_interval: default_interval(),
            default_span: default_span(),
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.frequency_threshold == 0 {
            return Err(Error::Config(
                "analysis.frequency_threshold must be at least 1".to_string(),
            ));
        }
        if self.retention_days == 0 {
            return Err(Error::Config(
                "analysis.retention_days must be at least 1".to_string(),
            ));
        }
        if self.default_span == 0 {
            return Err(Error::Config(
                "analysis.default_span must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Retention window in seconds
    pub fn retention_secs(&self) -> i64 {
        i64::from(self.retention_days) * 86_400
    }
}

fn default_frequency_threshold() -> u32 {
    100
}

fn default_retention_days() -> u32 {
    32
}

fn default_interval() -> String {
    "day".to_string()
}

fn default_span() -> u32 {
    1
}

/// Aggregation client boundary configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AggregationConfig {
    /// Deadline for one batched aggregation call, 0 disables it
    #[serde(default = "default_aggregation_timeout")]
    pub timeout_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_aggregation_timeout(),
        }
    }
}

impl AggregationConfig {
    /// Deadline to pass to `Analyzer::analyze_collection`
    pub fn deadline(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn default_aggregation_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analysis.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/socialboard/config.toml` (~/.config/socialboard/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("socialboard").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/socialboard/` (~/.local/state/socialboard/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("socialboard")
    }

    /// Returns the log file written on `date` (UTC)
    ///
    /// Logs rotate daily, so the name carries the date:
    /// `$XDG_STATE_HOME/socialboard/socialboard.YYYY-MM-DD.log`
    pub fn log_path(date: NaiveDate) -> PathBuf {
        Self::state_dir().join(format!("socialboard.{}.log", date.format("%Y-%m-%d")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.frequency_threshold, 100);
        assert_eq!(config.analysis.retention_days, 32);
        assert_eq!(config.analysis.default_interval, "day");
        assert_eq!(config.analysis.default_span, 1);
        assert_eq!(config.aggregation.timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[analysis]
frequency_threshold = 250
default_interval = "hour"

[aggregation]
timeout_secs = 0

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.analysis.frequency_threshold, 250);
        assert_eq!(config.analysis.default_interval, "hour");
        // Unset fields keep their defaults
        assert_eq!(config.analysis.retention_days, 32);
        assert_eq!(config.analysis.default_span, 1);
        assert!(config.aggregation.deadline().is_none());
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_analysis_config_validation() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let config = AnalysisConfig {
            frequency_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            default_span: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_aggregation_deadline() {
        let config = AggregationConfig::default();
        assert_eq!(config.deadline(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analysis]\nretention_days = 7\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.analysis.retention_days, 7);
        assert_eq!(config.analysis.retention_secs(), 7 * 86_400);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analysis]\nfrequency_threshold = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_log_path_carries_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert!(Config::log_path(date).ends_with("socialboard/socialboard.2024-03-09.log"));
    }
}
