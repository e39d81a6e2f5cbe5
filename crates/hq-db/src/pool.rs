//! # Database Pool Management
//!
//! Connection pool creation and the single choke point every repository
//! call goes through.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Server Startup                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::from_env()  ← engine + credentials, fixed for the process   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::connect(config).await ← pool + engine + migrations          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            AnyPool                       │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.run("op", future) ← query timeout, error mapping, failure log      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{AnyPool, Executor};
use tracing::{debug, error, info, warn};

use crate::config::{DbConfig, EngineKind};
use crate::engine::{self, Engine};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::activity::ActivityRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::report::ReportRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::subsidiary::SubsidiaryRepository;
use crate::repository::user::UserRepository;

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone: the pool and the engine are shared.
///
/// ## Usage in Handlers
/// ```rust,ignore
/// async fn list_inventory(
///     State(state): State<AppState>,
///     Path(id): Path<i64>,
/// ) -> Result<Json<Vec<InventoryItem>>, ApiError> {
///     let db = state.db()?;
///     Ok(Json(db.inventory().list_by_subsidiary(id).await?))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    engine: Arc<dyn Engine>,
    query_timeout: Duration,
}

impl Database {
    /// Creates the connection pool for the configured engine.
    ///
    /// ## What This Does
    /// 1. Picks the engine implementation for `config.engine`
    /// 2. Creates the pool, running the engine's per-connection setup
    /// 3. Runs migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or migration failed
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        install_default_drivers();

        let engine = engine::for_kind(config.engine);

        info!(
            engine = %config.engine,
            host = %config.host,
            database = %config.database,
            "Initializing database connection"
        );

        let init = engine.session_init();
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if let Some(statement) = init {
                        conn.execute(statement).await?;
                    }
                    Ok(())
                })
            })
            .connect(&engine.connect_url(&config))
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            engine,
            query_timeout: config.query_timeout,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs pending migrations. Called by `connect()` unless disabled.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool, self.engine.as_ref()).await
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer repository methods; raw queries must go through
    /// [`Database::sql`] for placeholder rendering.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn kind(&self) -> EngineKind {
        self.engine.kind()
    }

    /// Renders `?` placeholders for this engine.
    pub fn sql(&self, sql: &str) -> String {
        self.engine.render(sql)
    }

    /// Renders an INSERT whose generated id is read with
    /// [`Engine::insert_id`].
    pub fn insert_sql(&self, sql: &str) -> String {
        self.engine.render_insert(sql)
    }

    /// Runs one storage operation under the query timeout.
    ///
    /// Failures are logged here with the operation name and returned
    /// unchanged, so callers only propagate.
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        debug!(operation, "Running storage operation");

        let result = match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DbError::Timeout {
                operation: operation.to_string(),
            }),
        };

        if let Err(err) = &result {
            match err {
                DbError::Validation(_)
                | DbError::NotFound { .. }
                | DbError::Conflict { .. }
                | DbError::InsufficientStock { .. } => {
                    warn!(operation, error = %err, "Storage operation rejected")
                }
                _ => error!(operation, error = %err, "Storage operation failed"),
            }
        }

        result
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    /// Returns the user repository.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.clone())
    }

    /// Returns the subsidiary repository.
    pub fn subsidiaries(&self) -> SubsidiaryRepository {
        SubsidiaryRepository::new(self.clone())
    }

    /// Returns the inventory repository.
    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.clone())
    }

    /// Returns the sale repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let sale = db.sales().create(new_sale).await?;
    /// ```
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.clone())
    }

    /// Returns the activity log repository.
    pub fn activity(&self) -> ActivityRepository {
        ActivityRepository::new(self.clone())
    }

    /// Returns the time-windowed report queries.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        let ping = sqlx::query("SELECT 1").execute(&self.pool);
        matches!(tokio::time::timeout(self.query_timeout, ping).await, Ok(Ok(_)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
