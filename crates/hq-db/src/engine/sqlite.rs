//! SQLite dialect, used for development and tests.

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::{AnyConnection, Row};

use super::{AnyQuery, Engine};
use crate::config::{DbConfig, EngineKind};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteEngine;

#[async_trait]
impl Engine for SqliteEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    fn migrator(&self) -> &'static Migrator {
        &MIGRATOR
    }

    fn connect_url(&self, config: &DbConfig) -> String {
        if config.database == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            // rwc creates the file if it doesn't exist
            format!("sqlite://{}?mode=rwc", config.database)
        }
    }

    fn session_init(&self) -> Option<&'static str> {
        Some("PRAGMA foreign_keys = ON")
    }

    /// The `any` driver does not report `last_insert_rowid`, so the id comes
    /// back through `RETURNING` (SQLite 3.35+).
    fn render_insert(&self, sql: &str) -> String {
        format!("{} RETURNING id", sql.trim_end())
    }

    async fn insert_id<'q>(
        &self,
        conn: &mut AnyConnection,
        query: AnyQuery<'q>,
    ) -> Result<i64, sqlx::Error> {
        let row = query.fetch_one(conn).await?;
        row.try_get::<i64, _>(0)
    }

    fn durable_sessions(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_insert_returns_id() {
        let sql = SqliteEngine.render_insert("INSERT INTO sales (quantity) VALUES (?)\n");
        assert_eq!(sql, "INSERT INTO sales (quantity) VALUES (?) RETURNING id");
    }

    #[test]
    fn test_connect_url() {
        let config = DbConfig::in_memory();
        assert_eq!(SqliteEngine.connect_url(&config), "sqlite::memory:");

        let mut config = DbConfig::new(EngineKind::Sqlite);
        config.database = "./data/hq.db".to_string();
        assert_eq!(SqliteEngine.connect_url(&config), "sqlite://./data/hq.db?mode=rwc");
    }
}
