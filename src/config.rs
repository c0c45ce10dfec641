//! Configuration management
//!
//! TOML configuration with environment variable overrides and sensible
//! defaults. The calling service loads one [`Config`] at startup and
//! derives the Redis pool settings from it.

use crate::aggregate::Reducer;
use crate::redis::RedisConfig;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Redis backend settings
    #[serde(default)]
    pub redis: RedisSection,

    /// Query defaults
    #[serde(default)]
    pub query: QuerySection,

    /// Monitoring and observability
    #[serde(default)]
    pub monitoring: MonitoringSection,
}

/// Redis backend settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisSection {
    /// Redis server URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Maximum number of concurrent commands
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Timeout for individual commands, in milliseconds
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

/// Query defaults applied when a request leaves them unspecified
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuerySection {
    /// Default value substituted for days absent from the store
    #[serde(default)]
    pub fill: f64,

    /// Default reducer
    #[serde(default)]
    pub reducer: Reducer,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringSection {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable structured logging
    #[serde(default = "default_true")]
    pub structured_logging: bool,
}

// Default value functions
fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_pool_size() -> u32 {
    16
}
fn default_command_timeout_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            fill: 0.0,
            reducer: Reducer::default(),
        }
    }
}

impl Default for MonitoringSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            structured_logging: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {}", path, e))
    }

    /// Load configuration from a TOML file with environment overrides
    pub fn from_file_with_env(path: &str) -> Result<Self, String> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FORGE_METRICS_REDIS_URL") {
            self.redis.url = url;
        }
        if let Ok(size) = std::env::var("FORGE_METRICS_POOL_SIZE") {
            if let Ok(s) = size.parse() {
                self.redis.pool_size = s;
            }
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.monitoring.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.redis.url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }
        if self.redis.pool_size == 0 {
            return Err("Pool size must be > 0".to_string());
        }
        if self.redis.command_timeout_ms == 0 {
            return Err("Command timeout must be > 0".to_string());
        }
        if !self.query.fill.is_finite() {
            return Err("Fill default must be finite".to_string());
        }
        Ok(())
    }

    /// Derive the Redis pool configuration
    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig::with_url(self.redis.url.clone())
            .pool_size(self.redis.pool_size)
            .command_timeout(Duration::from_millis(self.redis.command_timeout_ms))
    }
}
