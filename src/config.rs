use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
    pub frontend_origins: Vec<String>,

    // Admission control
    pub rate_limit: RateLimitConfig,

    // Response cache
    pub cache_enabled: bool,
    pub feed_cache_ttl: Duration,
    pub trending_cache_ttl: Duration,

    // Live notifications
    pub heartbeat_interval: Duration,
    pub mailbox_capacity: usize,
}

/// Token bucket and sweep settings for the per-client rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Tokens added per second.
    pub per_second: u32,
    /// Bucket capacity.
    pub burst: u32,
    /// Clients unseen for longer than this are evicted by the sweep.
    pub idle_timeout: Duration,
    /// How often the sweep runs.
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 5,
            burst: 10,
            idle_timeout: Duration::from_secs(180),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every variable has a default, so an empty environment yields a usable
    /// development configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/chirp.sqlite")),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
            frontend_origins: parse_origins(&env_or_default(
                "FRONTEND_URL",
                "http://localhost:3000",
            )),

            // Admission control
            rate_limit: RateLimitConfig {
                per_second: parse_env_u32("RATE_LIMIT_PER_SECOND", 5)?,
                burst: parse_env_u32("RATE_LIMIT_BURST", 10)?,
                idle_timeout: Duration::from_secs(parse_env_u64("RATE_LIMIT_IDLE_SECS", 180)?),
                sweep_interval: Duration::from_secs(parse_env_u64("RATE_LIMIT_SWEEP_SECS", 60)?),
            },

            // Response cache
            cache_enabled: parse_env_bool("CACHE_ENABLED", true)?,
            feed_cache_ttl: Duration::from_secs(parse_env_u64("FEED_CACHE_TTL_SECS", 30)?),
            trending_cache_ttl: Duration::from_secs(parse_env_u64("TRENDING_CACHE_TTL_SECS", 300)?),

            // Live notifications
            heartbeat_interval: Duration::from_secs(parse_env_u64(
                "NOTIFICATION_HEARTBEAT_SECS",
                30,
            )?),
            mailbox_capacity: parse_env_usize("NOTIFICATION_MAILBOX_CAPACITY", 10)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.per_second == 0 {
            return Err(invalid("RATE_LIMIT_PER_SECOND", "must be at least 1"));
        }
        if self.rate_limit.burst == 0 {
            return Err(invalid("RATE_LIMIT_BURST", "must be at least 1"));
        }
        if self.rate_limit.sweep_interval.is_zero() {
            return Err(invalid("RATE_LIMIT_SWEEP_SECS", "must be at least 1"));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(invalid("NOTIFICATION_HEARTBEAT_SECS", "must be at least 1"));
        }
        if self.mailbox_capacity == 0 {
            return Err(invalid("NOTIFICATION_MAILBOX_CAPACITY", "must be at least 1"));
        }
        if self.frontend_origins.is_empty() {
            return Err(invalid("FRONTEND_URL", "cannot be empty"));
        }
        Ok(())
    }
}

fn invalid(name: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        message: message.to_string(),
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
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

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
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

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://a.test, http://b.test,,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_origins(" , ").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_env_bool("NONEXISTENT_VAR", true).unwrap());
        assert!(!parse_env_bool("NONEXISTENT_VAR", false).unwrap());
    }

    #[test]
    #[serial]
    fn test_defaults_are_valid() {
        for var in [
            "RATE_LIMIT_PER_SECOND",
            "RATE_LIMIT_BURST",
            "NOTIFICATION_MAILBOX_CAPACITY",
            "NOTIFICATION_HEARTBEAT_SECS",
        ] {
            std::env::remove_var(var);
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.mailbox_capacity, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_zero_burst_rejected() {
        std::env::set_var("RATE_LIMIT_BURST", "0");
        let config = Config::from_env().unwrap();
        std::env::remove_var("RATE_LIMIT_BURST");

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref name, .. }) if name == "RATE_LIMIT_BURST"
        ));
    }

    #[test]
    #[serial]
    fn test_unparseable_value() {
        std::env::set_var("NOTIFICATION_MAILBOX_CAPACITY", "lots");
        let result = Config::from_env();
        std::env::remove_var("NOTIFICATION_MAILBOX_CAPACITY");

        assert!(matches!(result, Err(ConfigError::ParseInt { .. })));
    }
}
