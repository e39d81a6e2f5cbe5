//! # Database Migrations
//!
//! Embedded SQL migrations, one directory per engine dialect.
//!
//! ## Layout
//! ```text
//! migrations/
//! ├── postgres/0001_initial_schema.sql
//! ├── mysql/0001_initial_schema.sql
//! └── sqlite/0001_initial_schema.sql
//! ```
//!
//! The three directories describe the same tables and must move together:
//! a new migration is added to every dialect with the same version number.
//! Never modify an applied migration; add a new one.

use sqlx::AnyPool;
use tracing::info;

use crate::engine::Engine;
use crate::error::DbResult;

/// Runs all pending migrations for the engine.
///
/// Idempotent: applied versions are tracked in `_sqlx_migrations`.
pub async fn run_migrations(pool: &AnyPool, engine: &dyn Engine) -> DbResult<()> {
    info!(engine = %engine.kind(), "Checking for pending migrations");

    engine.migrator().run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &AnyPool, engine: &dyn Engine) -> DbResult<(usize, usize)> {
    let total = engine.migrator().migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
