//! Environment-driven database configuration

use std::env;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

use crate::constants::{
    DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS,
};
use crate::services::error::{Error, Result};

/// Pool settings that survive a dialector reset
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub pool: PoolSettings,
    /// Upper bound on a single statement run by a transaction actor
    pub statement_timeout: Option<Duration>,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` is this over the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|s| s.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let acquire_timeout_secs = lookup("DB_ACQUIRE_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS);

        let statement_timeout = lookup("DB_STATEMENT_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .map(Duration::from_millis);

        Self {
            database_url,
            pool: PoolSettings {
                max_connections,
                acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            },
            statement_timeout,
        }
    }

    /// Parse the URL into the Postgres dialector
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        self.database_url
            .parse::<PgConnectOptions>()
            .map_err(|e| Error::Config(format!("DATABASE_URL: {}", e)))
    }
}
