//! # Database Configuration
//!
//! Resolves which engine to use and how to reach it, once, at startup.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DB_ENGINE ──► postgresql (default) | mysql | sqlite                    │
//! │                                                                         │
//! │  field      primary var     postgres fallback    default                │
//! │  ─────────  ──────────────  ───────────────────  ─────────────────────  │
//! │  host       DB_HOST         PGHOST               localhost              │
//! │  port       DB_PORT         PGPORT               5432 | 3306            │
//! │  database   DB_NAME         PGDATABASE           hq  (sqlite: memory)   │
//! │  username   DB_USER         PGUSER               postgres | root        │
//! │  password   DB_PASSWORD     PGPASSWORD           ""                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never changes while the process runs; switching requires a
//! restart.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Engine Kind
// =============================================================================

/// The relational engine backing a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Postgres,
    MySql,
    /// Development and test engine.
    Sqlite,
}

impl EngineKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Postgres => "postgresql",
            EngineKind::MySql => "mysql",
            EngineKind::Sqlite => "sqlite",
        }
    }

    const fn default_port(&self) -> u16 {
        match self {
            EngineKind::Postgres => 5432,
            EngineKind::MySql => 3306,
            EngineKind::Sqlite => 0,
        }
    }

    const fn default_username(&self) -> &'static str {
        match self {
            EngineKind::Postgres => "postgres",
            EngineKind::MySql => "root",
            EngineKind::Sqlite => "",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(EngineKind::Postgres),
            "mysql" => Ok(EngineKind::MySql),
            "sqlite" => Ok(EngineKind::Sqlite),
            other => Err(ConfigError::UnknownEngine(other.to_string())),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::from_env()?.max_connections(20);
/// let db = Database::connect(config).await?;
/// ```
#[derive(Clone)]
pub struct DbConfig {
    pub engine: EngineKind,
    pub host: String,
    pub port: u16,
    /// Database name (SQLite: file path or `:memory:`).
    pub database: String,
    pub username: String,
    pub password: String,

    /// Maximum number of connections in the pool.
    /// Default: 10
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 0
    pub min_connections: u32,

    /// Connection / pool acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` never reaps.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// Age at which a connection is retired. `None` keeps it forever.
    /// Default: 30 minutes
    pub max_lifetime: Option<Duration>,

    /// Upper bound on any single storage operation.
    /// Default: 15 seconds
    pub query_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a configuration for an engine with its default host, port
    /// and credentials.
    pub fn new(engine: EngineKind) -> Self {
        DbConfig {
            engine,
            host: "localhost".to_string(),
            port: engine.default_port(),
            database: match engine {
                EngineKind::Sqlite => ":memory:".to_string(),
                _ => "hq".to_string(),
            },
            username: engine.default_username().to_string(),
            password: String::new(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            query_timeout: Duration::from_secs(15),
            run_migrations: true,
        }
    }

    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any variable lookup.
    ///
    /// ```rust
    /// use hq_db::{DbConfig, EngineKind};
    ///
    /// let config = DbConfig::from_lookup(|key| match key {
    ///     "DB_ENGINE" => Some("mysql".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.engine, EngineKind::MySql);
    /// assert_eq!(config.port, 3306);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine = match non_empty(lookup("DB_ENGINE")) {
            Some(name) => name.parse()?,
            None => EngineKind::Postgres,
        };

        // PostgreSQL deployments may rely on the libpq variables instead.
        let var = |primary: &str, pg_fallback: &str| {
            non_empty(lookup(primary)).or_else(|| match engine {
                EngineKind::Postgres => non_empty(lookup(pg_fallback)),
                _ => None,
            })
        };

        let mut config = DbConfig::new(engine);

        if let Some(host) = var("DB_HOST", "PGHOST") {
            config.host = host;
        }
        if let Some(port) = var("DB_PORT", "PGPORT") {
            config.port = parse("DB_PORT", &port)?;
        }
        if let Some(database) = var("DB_NAME", "PGDATABASE") {
            config.database = database;
        }
        if let Some(username) = var("DB_USER", "PGUSER") {
            config.username = username;
        }
        if let Some(password) = var("DB_PASSWORD", "PGPASSWORD") {
            config.password = password;
        }
        if let Some(max) = non_empty(lookup("DB_MAX_CONNECTIONS")) {
            config.max_connections = parse("DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(secs) = non_empty(lookup("DB_CONNECT_TIMEOUT_SECS")) {
            config.connect_timeout = Duration::from_secs(parse("DB_CONNECT_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = non_empty(lookup("DB_QUERY_TIMEOUT_SECS")) {
            config.query_timeout = Duration::from_secs(parse("DB_QUERY_TIMEOUT_SECS", &secs)?);
        }

        Ok(config)
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-operation timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory SQLite configuration (for testing).
    ///
    /// Every pooled connection to `:memory:` would see its own empty
    /// database, so the pool is pinned to a single connection that is
    /// never reaped or recycled.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            max_lifetime: None,
            ..DbConfig::new(EngineKind::Sqlite)
        }
    }
}

/// Manual impl so the password never reaches logs.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("max_connections", &self.max_connections)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown database engine: {0}")]
    UnknownEngine(String),

    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
