//! # Database Error Types
//!
//! Error types for storage operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError (hq-core) ─────────┐  before any round-trip           │
//! │                                      ▼                                  │
//! │  sqlx::Error (pg / mysql / sqlite) ► DbError ◄── this module            │
//! │                                      │  logged with the operation name  │
//! │                                      ▼                                  │
//! │  ApiError (hq-api) ← status code + JSON body                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unique-constraint detection uses sqlx's engine-neutral error kind, so a
//! duplicate tax id is a `Conflict` on every engine.

use hq_core::ValidationError;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Input rejected before touching the database.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Target row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Creating or renaming a subsidiary onto an existing tax id
    /// - Creating a user with a taken username
    #[error("Duplicate {field}: '{value}' already exists")]
    Conflict { field: String, value: String },

    /// A sale asked for more units than are in stock.
    #[error("Insufficient stock for item {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: i64,
        available: i64,
        requested: i64,
    },

    /// Storage used before the connection was established.
    #[error("Database connection not established")]
    NotConnected,

    /// The connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// An operation exceeded the configured query timeout.
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// Any other driver failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::Conflict {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Re-labels a unique violation with the field and value the caller
    /// knows about. Other errors pass through untouched.
    pub(crate) fn on_conflict(self, field: &str, value: &str) -> Self {
        match self {
            DbError::Conflict { .. } => DbError::conflict(field, value),
            other => other,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// Database error, unique violation → DbError::Conflict
/// sqlx::Error::PoolTimedOut        → DbError::Timeout
/// sqlx::Error::PoolClosed          → DbError::ConnectionFailed
/// sqlx::Error::Io / Tls            → DbError::ConnectionFailed
/// Other                            → DbError::Storage
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict {
                field: db_err.constraint().unwrap_or("unknown").to_string(),
                value: "unknown".to_string(),
            },

            sqlx::Error::PoolTimedOut => DbError::Timeout {
                operation: "connection acquire".to_string(),
            },

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),

            sqlx::Error::Tls(e) => DbError::ConnectionFailed(e.to_string()),

            other => DbError::Storage(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
