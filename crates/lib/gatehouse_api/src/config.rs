//! API server configuration.

use std::path::PathBuf;

use gatehouse_core::config::{
    IDLE_TIMEOUT_ENV, SWEEP_INTERVAL_ENV, SessionConfig, USERS_FILE_ENV, default_users_file,
};

/// Default listener address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Listener address variable.
pub const BIND_ADDR_ENV: &str = "BIND_ADDR";

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// YAML file the static user provider is loaded from.
    pub users_file: PathBuf,
    /// Idle timeout and optional sweep interval.
    pub session: SessionConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                          | Default                              |
    /// |-----------------------------------|--------------------------------------|
    /// | `BIND_ADDR`                       | `127.0.0.1:8080`                     |
    /// | `GATEHOUSE_USERS_FILE`            | `<config dir>/gatehouse/users.yaml`  |
    /// | `API_SESSION_TIMEOUT_MS`          | `3600000`                            |
    /// | `API_SESSION_SWEEP_INTERVAL_SECS` | unset (lazy eviction only)           |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through
    /// `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            bind_addr: var(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            users_file: var(USERS_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(default_users_file),
            session: SessionConfig::from_values(
                var(IDLE_TIMEOUT_ENV).as_deref(),
                var(SWEEP_INTERVAL_ENV).as_deref(),
            ),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
