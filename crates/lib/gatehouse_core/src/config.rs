//! Session layer configuration.
//!
//! Values are read once, at composition time. A bad value never fails
//! startup: it is logged and replaced by its default.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Default idle timeout: one hour.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 3_600_000;

/// Idle timeout in milliseconds.
pub const IDLE_TIMEOUT_ENV: &str = "API_SESSION_TIMEOUT_MS";

/// Optional background sweep interval in seconds.
pub const SWEEP_INTERVAL_ENV: &str = "API_SESSION_SWEEP_INTERVAL_SECS";

/// Path of the YAML user file.
pub const USERS_FILE_ENV: &str = "GATEHOUSE_USERS_FILE";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed user file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Timeouts governing session lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum time a session may go unaccessed.
    pub idle_timeout: Duration,
    /// When set, idle sessions are also swept in the background at this
    /// interval. Otherwise eviction happens only on lookup.
    pub sweep_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
            sweep_interval: None,
        }
    }
}

impl SessionConfig {
    /// Builds configuration from raw values, substituting defaults for
    /// anything missing or invalid.
    pub fn from_values(idle_timeout: Option<&str>, sweep_interval: Option<&str>) -> Self {
        let idle_timeout = match idle_timeout.filter(|v| !v.trim().is_empty()) {
            None => {
                warn!(
                    default_ms = DEFAULT_IDLE_TIMEOUT_MS,
                    "{IDLE_TIMEOUT_ENV} not set, using default session timeout"
                );
                Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS)
            }
            Some(raw) => parse_idle_timeout(raw).unwrap_or_else(|e| {
                warn!(
                    error = %e,
                    default_ms = DEFAULT_IDLE_TIMEOUT_MS,
                    "falling back to default session timeout"
                );
                Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS)
            }),
        };

        let sweep_interval = sweep_interval
            .filter(|v| !v.trim().is_empty())
            .and_then(|raw| match parse_sweep_interval(raw) {
                Ok(interval) => Some(interval),
                Err(e) => {
                    warn!(error = %e, "background session sweep disabled");
                    None
                }
            });

        Self {
            idle_timeout,
            sweep_interval,
        }
    }

    /// Same configuration with a different idle timeout.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

/// Parses a positive millisecond count.
pub fn parse_idle_timeout(raw: &str) -> Result<Duration, ConfigError> {
    parse_positive(IDLE_TIMEOUT_ENV, raw).map(Duration::from_millis)
}

/// Parses a positive second count.
pub fn parse_sweep_interval(raw: &str) -> Result<Duration, ConfigError> {
    parse_positive(SWEEP_INTERVAL_ENV, raw).map(Duration::from_secs)
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason,
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(invalid("must be greater than zero".into())),
        Ok(n) => Ok(n),
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// Default location of the user file.
pub fn default_users_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatehouse")
        .join("users.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_one_hour_and_lazy_eviction() {
        let config = SessionConfig::default();
        assert_eq!(config.idle_timeout, Duration::from_secs(3600));
        assert!(config.sweep_interval.is_none());
    }

    #[test]
    fn missing_values_use_defaults() {
        assert_eq!(SessionConfig::from_values(None, None), SessionConfig::default());
        assert_eq!(
            SessionConfig::from_values(Some("  "), Some("")),
            SessionConfig::default()
        );
    }

    #[test]
    fn valid_values_are_used() {
        let config = SessionConfig::from_values(Some("250"), Some("30"));
        assert_eq!(config.idle_timeout, Duration::from_millis(250));
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(30)));
    }

    #[test]
    fn invalid_values_fall_back_without_failing() {
        for bad in ["soon", "-5", "0", "1.5"] {
            let config = SessionConfig::from_values(Some(bad), Some(bad));
            assert_eq!(config, SessionConfig::default(), "value {bad:?}");
        }
    }

    #[test]
    fn parse_errors_name_the_key() {
        let err = parse_idle_timeout("abc").unwrap_err();
        assert!(err.to_string().contains(IDLE_TIMEOUT_ENV));
        let err = parse_sweep_interval("0").unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn default_users_file_lives_under_gatehouse() {
        let path = default_users_file();
        assert!(path.ends_with("gatehouse/users.yaml"));
    }
}
