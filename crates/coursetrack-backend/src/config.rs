//! Backend connection configuration.

use std::time::Duration;

use crate::error::{BackendError, Result};

/// Environment variable for the backend base URL.
pub const API_URL_ENV: &str = "COURSETRACK_API_URL";

/// Environment variable for the bearer token.
pub const API_TOKEN_ENV: &str = "COURSETRACK_API_TOKEN";

/// Environment variable for the request timeout in seconds.
pub const TIMEOUT_ENV: &str = "COURSETRACK_TIMEOUT_SECS";

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`HttpBackend`](crate::HttpBackend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL every endpoint path is resolved against.
    pub base_url: String,
    /// Bearer token sent with every request, if any.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    /// Creates a config for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Reads the config from the environment.
    ///
    /// Uses:
    /// - `COURSETRACK_API_URL` (default: `http://localhost:8080/api/`)
    /// - `COURSETRACK_API_TOKEN` (optional)
    /// - `COURSETRACK_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.base_url = url;
        }
        config.token = std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            config.timeout = parse_timeout(&secs)?;
        }
        Ok(config)
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_timeout(value: &str) -> Result<Duration> {
    let secs: u64 = value.trim().parse().map_err(|_| {
        BackendError::Configuration(format!("{} must be a whole number of seconds, got {:?}", TIMEOUT_ENV, value))
    })?;
    if secs == 0 {
        return Err(BackendError::Configuration(format!("{} must be positive", TIMEOUT_ENV)));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let config = BackendConfig::new("https://lms.example.com/api/")
            .with_token("secret")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.base_url, "https://lms.example.com/api/");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(" 12 ").unwrap(), Duration::from_secs(12));
        assert!(matches!(parse_timeout("0"), Err(BackendError::Configuration(_))));
        assert!(matches!(parse_timeout("soon"), Err(BackendError::Configuration(_))));
    }
}
