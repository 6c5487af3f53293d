use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::HASHNODE_API_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    // Hashnode API
    pub access_token: String,
    pub api_url: String,
    pub request_timeout: Duration,

    // Publish workers
    pub worker_concurrency: usize,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,

    // Reporting
    pub results_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_token: required_env("HASHNODE_ACCESS_TOKEN")?,
            api_url: env_or_default("HASHNODE_API_URL", HASHNODE_API_URL),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),

            worker_concurrency: parse_env_usize("WORKER_CONCURRENCY", 4)?,
            max_attempts: parse_env_u32("MAX_ATTEMPTS", 3)?,
            retry_base_delay: Duration::from_millis(parse_env_u64("RETRY_BASE_DELAY_MS", 500)?),

            results_path: optional_env("RESULTS_PATH").map(PathBuf::from),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "HASHNODE_ACCESS_TOKEN".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.worker_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                name: "WORKER_CONCURRENCY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Baseline configuration for tests; override fields with struct update syntax.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            access_token: "test-token".to_string(),
            api_url: HASHNODE_API_URL.to_string(),
            request_timeout: Duration::from_secs(5),
            worker_concurrency: 1,
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(10),
            results_path: None,
        }
    }
}

// The access token must never reach logs, so Debug redacts it.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token", &"[redacted]")
            .field("api_url", &self.api_url)
            .field("request_timeout", &self.request_timeout)
            .field("worker_concurrency", &self.worker_concurrency)
            .field("max_attempts", &self.max_attempts)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("results_path", &self.results_path)
            .finish()
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
