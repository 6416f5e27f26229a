//! Application configuration loading.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; every section is optional and
//! falls back to defaults, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use warden::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("warden.toml")?;
//!     config.logging.init();
//!     Ok(())
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::logging::LoggingConfig;
use super::risk::RiskConfig;
use super::runner::RunnerAppConfig;
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Run loop knobs: iteration cap, context budget, approval TTL.
    #[serde(default)]
    pub runner: RunnerAppConfig,

    /// Risk limits and circuit breaker settings.
    #[serde(default)]
    pub risk: RiskConfig,

    /// Data directory for session, policy, and execution log documents.
    ///
    /// Defaults to the platform data dir when unset.
    #[serde(default)]
    pub data_dir: Option<String>,
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Reject values that would deserialize fine but misbehave at runtime.
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.runner.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runner.max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        let ratio = self.runner.compaction_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "runner.compaction_ratio",
                reason: format!("{ratio} is outside (0, 1]"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_config_is_valid() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.runner.max_iterations, 50);
        assert_eq!(config.risk.breaker_threshold, 3);
        assert!(config.risk.breaker_enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn sections_override_defaults() {
        let toml = r#"
            data_dir = "/tmp/warden-test"

            [logging]
            level = "debug"
            format = "json"

            [runner]
            max_iterations = 5
            approval_ttl_secs = 60

            [risk]
            max_position_size = 250
            blacklist = ["MEME"]
            breaker_enabled = false
        "#;
        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.data_dir.as_deref(), Some("/tmp/warden-test"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.runner.max_iterations, 5);
        assert_eq!(config.runner.approval_ttl_secs, 60);
        assert_eq!(config.risk.max_position_size, dec!(250));
        assert!(config.risk.blacklist.contains("MEME"));
        assert!(!config.risk.breaker_enabled);
        // Untouched sections keep their defaults.
        assert_eq!(config.runner.max_context_tokens, 100_000);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(Config::parse_toml("[runner\nmax_iterations = 5").is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = Config::parse_toml("[runner]\ncompaction_ratio = 1.5").unwrap_err();
        assert!(err.to_string().contains("runner.compaction_ratio"));

        let err = Config::parse_toml("[runner]\nmax_iterations = 0").unwrap_err();
        assert!(err.to_string().contains("runner.max_iterations"));
    }

    #[test]
    fn risk_config_converts_to_limits() {
        let config = Config::parse_toml("[risk]\nmax_open_positions = 2").unwrap();
        let limits: crate::application::risk::RiskLimits = config.risk.into();
        assert_eq!(limits.max_open_positions, 2);
        assert_eq!(limits.breaker_cooldown_minutes, 30);
    }
}
