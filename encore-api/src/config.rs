//! API Configuration Module
//!
//! Server and cache store settings loaded from environment variables with
//! defaults from [`crate::constants`]. Background job settings live with
//! their jobs ([`crate::jobs::FetchQueueConfig`], [`crate::jobs::CacheUpdaterConfig`]).

use encore_core::{ConfigError, EncoreResult};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_CACHE_READ_TIMEOUT_MS, DEFAULT_PORT, DEFAULT_STORE_MAX_SIZE_MB,
    DEFAULT_STORE_PATH,
};

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,

    /// LMDB directory.
    pub store_path: PathBuf,

    /// LMDB map size in megabytes.
    pub store_max_size_mb: usize,

    /// Bound on a single cache read or health probe.
    pub cache_read_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            store_max_size_mb: DEFAULT_STORE_MAX_SIZE_MB,
            cache_read_timeout: Duration::from_millis(DEFAULT_CACHE_READ_TIMEOUT_MS),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `ENCORE_API_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT`: Bind port (default: 3000)
    /// - `ENCORE_STORE_PATH`: LMDB directory (default: ./data/acts)
    /// - `ENCORE_STORE_MAX_SIZE_MB`: LMDB map size (default: 1024)
    /// - `ENCORE_CACHE_READ_TIMEOUT_MS`: Cache read bound (default: 5000)
    ///
    /// A bind address that does not parse is an error; every other malformed
    /// value falls back to its default.
    pub fn from_env() -> EncoreResult<Self> {
        let host = std::env::var("ENCORE_API_BIND").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
        let port = std::env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let bind = parse_bind(&host, &port)?;

        Ok(Self {
            bind,
            store_path: PathBuf::from(env_or("ENCORE_STORE_PATH", DEFAULT_STORE_PATH.to_string())),
            store_max_size_mb: env_or("ENCORE_STORE_MAX_SIZE_MB", DEFAULT_STORE_MAX_SIZE_MB),
            cache_read_timeout: Duration::from_millis(env_or(
                "ENCORE_CACHE_READ_TIMEOUT_MS",
                DEFAULT_CACHE_READ_TIMEOUT_MS,
            )),
        })
    }
}

fn parse_bind(host: &str, port: &str) -> EncoreResult<SocketAddr> {
    let raw = format!("{}:{}", host, port);
    raw.parse().map_err(|e: std::net::AddrParseError| {
        ConfigError::InvalidValue {
            field: "ENCORE_API_BIND/PORT".to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Read and parse an environment variable, falling back to `default` (with
/// a warning) when the value is malformed.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = raw, "Ignoring malformed environment value");
            default
        }
    }
}

/// [`env_or`] for a whole number of seconds.
pub fn env_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_or(key, default_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::EncoreError;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.bind.port(), 3000);
        assert_eq!(config.store_path, PathBuf::from("./data/acts"));
        assert_eq!(config.cache_read_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_bind() {
        assert_eq!(parse_bind("127.0.0.1", "8080").unwrap().port(), 8080);

        let err = parse_bind("not a host", "80").unwrap_err();
        assert!(matches!(err, EncoreError::Config(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_malformed_values_fall_back() {
        assert_eq!(parse_or("X", "42", 7u64), 42);
        assert_eq!(parse_or("X", " 42 ", 7u64), 42);
        assert_eq!(parse_or("X", "forty", 7u64), 7);
        assert_eq!(parse_or("X", "-1", 7u64), 7);
    }
}
