//! Host configuration, loaded from TOML.
//!
//! ```toml
//! module_name = "main.wat"
//! frame_interval_ms = 16
//! report_policy = "latest_started"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::assembler::ParseOptions;

pub const DEFAULT_ERROR_PREFIX: &str = "⚠️ Error running program: ";
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;
pub const DEFAULT_FUEL_YIELD_INTERVAL: u64 = 10_000;

/// Which completed cycles may write to the output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPolicy {
    /// Every completed cycle reports; the last one to finish wins
    #[default]
    LastCompleted,
    /// A cycle older than an already reported one drops its report
    LatestStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Name passed to the assembler
    pub module_name: String,
    /// Tick period for native frame sources
    pub frame_interval_ms: u64,
    pub report_policy: ReportPolicy,
    /// Prefix marking failure output
    pub error_prefix: String,
    /// Validate binaries after assembly
    pub validate: bool,
    /// Fuel units between cooperative yields of a running guest, `0` disables metering
    pub fuel_yield_interval: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_name: String::new(),
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            report_policy: ReportPolicy::default(),
            error_prefix: DEFAULT_ERROR_PREFIX.to_owned(),
            validate: true,
            fuel_yield_interval: DEFAULT_FUEL_YIELD_INTERVAL,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl HostConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            validate: self.validate,
        }
    }

    pub fn fuel_yield_interval(&self) -> Option<u64> {
        (self.fuel_yield_interval > 0).then_some(self.fuel_yield_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = HostConfig::from_toml_str("").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.module_name, "");
        assert_eq!(config.frame_interval(), Duration::from_millis(16));
        assert_eq!(config.report_policy, ReportPolicy::LastCompleted);
        assert_eq!(config.fuel_yield_interval(), Some(10_000));
    }

    #[test]
    fn overrides_are_applied() {
        let config = HostConfig::from_toml_str(
            r#"
            module_name = "main.wat"
            frame_interval_ms = 100
            report_policy = "latest_started"
            validate = false
            fuel_yield_interval = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.module_name, "main.wat");
        assert_eq!(config.frame_interval(), Duration::from_millis(100));
        assert_eq!(config.report_policy, ReportPolicy::LatestStarted);
        assert!(!config.parse_options().validate);
        assert_eq!(config.fuel_yield_interval(), None);
        assert_eq!(config.error_prefix, DEFAULT_ERROR_PREFIX);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            HostConfig::from_toml_str("frame_rate = 60"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let error = HostConfig::load(Path::new("/nonexistent/livewat.toml")).unwrap_err();
        assert!(error.to_string().contains("/nonexistent/livewat.toml"));
    }
}
