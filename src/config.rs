//! Configuration management for Portcullis.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::{PortcullisError, Result};

/// Main configuration for the Portcullis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortcullisConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

impl Default for PortcullisConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            rate_limiting: RateLimitingConfig::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8000".parse().unwrap()
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Admitted-request ceiling per caller identity per window
    #[serde(default = "default_max_requests")]
    pub max_requests_per_window: u32,

    /// Trailing window duration in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    /// Counter store connection URL; `null` runs the limiter disabled
    #[serde(default = "default_redis_url")]
    pub redis_url: Option<String>,

    /// Per-operation store timeout in milliseconds
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: default_max_requests(),
            window_seconds: default_window_seconds(),
            redis_url: default_redis_url(),
            store_timeout_ms: default_store_timeout(),
        }
    }
}

fn default_max_requests() -> u32 {
    60
}

fn default_window_seconds() -> u64 {
    60
}

fn default_redis_url() -> Option<String> {
    Some("redis://127.0.0.1:6379".to_string())
}

fn default_store_timeout() -> u64 {
    50
}

impl PortcullisConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: PortcullisConfig = serde_yaml::from_str(&contents)
            .map_err(|e| PortcullisError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Recognized variables: `RATE_LIMIT_PER_MINUTE`, `REDIS_URL`, and
    /// `BIND_ADDR`. An empty `REDIS_URL` disables the counter store.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("RATE_LIMIT_PER_MINUTE") {
            self.rate_limiting.max_requests_per_window = value.parse().map_err(|_| {
                PortcullisError::Config(format!("Invalid RATE_LIMIT_PER_MINUTE: {}", value))
            })?;
        }

        if let Ok(value) = std::env::var("REDIS_URL") {
            self.rate_limiting.redis_url = if value.is_empty() { None } else { Some(value) };
        }

        if let Ok(value) = std::env::var("BIND_ADDR") {
            self.server.bind_addr = value
                .parse()
                .map_err(|_| PortcullisError::Config(format!("Invalid BIND_ADDR: {}", value)))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PortcullisConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.rate_limiting.max_requests_per_window, 60);
        assert_eq!(config.rate_limiting.window_seconds, 60);
        assert_eq!(
            config.rate_limiting.redis_url.as_deref(),
            Some("redis://127.0.0.1:6379")
        );
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
rate_limiting:
  max_requests_per_window: 10
"#;
        let config: PortcullisConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.rate_limiting.max_requests_per_window, 10);
        assert_eq!(config.rate_limiting.window_seconds, 60);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000".parse().unwrap());
    }

    #[test]
    fn test_null_redis_url_disables_store() {
        let yaml = r#"
rate_limiting:
  redis_url: null
"#;
        let config: PortcullisConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.rate_limiting.redis_url.is_none());
    }
}
