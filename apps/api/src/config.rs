//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Database variables are resolved by [`hq_db::DbConfig`].

use std::env;
use std::net::SocketAddr;

use chrono::Duration;
use hq_db::DbConfig;

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP server listens on (`HQ_BIND_ADDR`).
    pub bind_addr: SocketAddr,

    /// Session lifetime (`SESSION_TTL_SECS`, default one day).
    pub session_ttl: Duration,

    /// Password for the default admin account (`ADMIN_PASSWORD`).
    /// Generated at startup when unset.
    pub admin_password: Option<String>,

    /// Database engine and connection settings.
    pub db: DbConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("HQ_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("HQ_BIND_ADDR".to_string()))?;

        let ttl_secs: i64 = lookup("SESSION_TTL_SECS")
            .unwrap_or_else(|| "86400".to_string()) // 1 day
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SESSION_TTL_SECS".to_string()))?;
        if ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue("SESSION_TTL_SECS".to_string()));
        }

        let admin_password = lookup("ADMIN_PASSWORD").filter(|p| !p.is_empty());

        Ok(ApiConfig {
            bind_addr,
            session_ttl: Duration::seconds(ttl_secs),
            admin_password,
            db: DbConfig::from_lookup(&lookup)?,
        })
    }

    /// Configuration for tests: in-memory SQLite, ephemeral port.
    pub fn for_tests() -> Self {
        ApiConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            session_ttl: Duration::hours(1),
            admin_password: None,
            db: DbConfig::in_memory(),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Database(#[from] hq_db::ConfigError),
}
