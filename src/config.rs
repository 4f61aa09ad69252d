//! Service configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

use crate::db::pool::PoolConfig;
use crate::db::startup::RetryPolicy;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Database ===
    /// Database host name.
    pub db_host: String,

    /// Database port.
    #[serde(default = "default_db_port")]
    pub db_port: u16,

    /// Database name.
    pub db_name: String,

    /// Database user.
    pub db_user: String,

    /// Database password.
    pub db_password: String,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    // === Connection Pool ===
    /// Maximum concurrently open connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,

    /// Connections opened eagerly at startup.
    #[serde(default)]
    pub pool_min_idle: usize,

    /// How long `acquire` waits for a free connection, in milliseconds.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    // === Startup Readiness Gate ===
    /// Schema initialization attempts before the process gives up.
    #[serde(default = "default_startup_max_attempts")]
    pub startup_max_attempts: u32,

    /// Base backoff delay between attempts, in milliseconds.
    #[serde(default = "default_startup_base_delay_ms")]
    pub startup_base_delay_ms: u64,

    // === Server ===
    /// HTTP listener port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_db_port() -> u16 {
    5432
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_pool_max_size() -> usize {
    8
}

fn default_acquire_timeout_ms() -> u64 {
    5000
}

fn default_startup_max_attempts() -> u32 {
    10
}

fn default_startup_base_delay_ms() -> u64 {
    2000
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.db_host.is_empty() {
            return Err("DB_HOST is required".to_string());
        }

        if self.db_name.is_empty() {
            return Err("DB_NAME is required".to_string());
        }

        if self.db_user.is_empty() {
            return Err("DB_USER is required".to_string());
        }

        if self.pool_max_size == 0 {
            return Err("POOL_MAX_SIZE must be at least 1".to_string());
        }

        if self.pool_min_idle > self.pool_max_size {
            return Err("POOL_MIN_IDLE must not exceed POOL_MAX_SIZE".to_string());
        }

        if self.startup_max_attempts == 0 {
            return Err("STARTUP_MAX_ATTEMPTS must be at least 1".to_string());
        }

        Ok(())
    }

    /// Driver-level connection parameters.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.db_host)
            .port(self.db_port)
            .dbname(&self.db_name)
            .user(&self.db_user)
            .password(&self.db_password)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs));
        pg
    }

    /// Pool sizing and timeout parameters.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_size: self.pool_max_size,
            min_idle: self.pool_min_idle,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
        }
    }

    /// Backoff schedule for the startup readiness gate.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.startup_max_attempts,
            base_delay_ms: self.startup_base_delay_ms,
            ..RetryPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            db_host: "localhost".to_string(),
            db_port: default_db_port(),
            db_name: "testdb".to_string(),
            db_user: "student".to_string(),
            db_password: "password123".to_string(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_max_size: default_pool_max_size(),
            pool_min_idle: 0,
            acquire_timeout_ms: default_acquire_timeout_ms(),
            startup_max_attempts: default_startup_max_attempts(),
            startup_base_delay_ms: default_startup_base_delay_ms(),
            port: default_port(),
            rust_log: default_log_level(),
        }
    }

    #[test]
    fn default_values_are_sensible() {
        assert_eq!(default_db_port(), 5432);
        assert_eq!(default_connect_timeout_secs(), 5);
        assert_eq!(default_pool_max_size(), 8);
        assert_eq!(default_startup_max_attempts(), 10);
        assert_eq!(default_port(), 8080);
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_db_host() {
        let mut config = test_config();
        config.db_host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_pool_size() {
        let mut config = test_config();
        config.pool_max_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_min_idle_above_max_size() {
        let mut config = test_config();
        config.pool_min_idle = config.pool_max_size + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_startup_attempts() {
        let mut config = test_config();
        config.startup_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_policy_uses_configured_attempts_and_delay() {
        let mut config = test_config();
        config.startup_max_attempts = 3;
        config.startup_base_delay_ms = 500;
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay_ms, 500);
    }
}
