//! MySQL dialect.

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::AnyConnection;

use super::{server_url, AnyQuery, Engine};
use crate::config::{DbConfig, EngineKind};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/mysql");

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlEngine;

#[async_trait]
impl Engine for MySqlEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::MySql
    }

    fn migrator(&self) -> &'static Migrator {
        &MIGRATOR
    }

    fn connect_url(&self, config: &DbConfig) -> String {
        server_url("mysql", config)
    }

    /// Out-of-range and truncated values must fail instead of being clamped.
    fn session_init(&self) -> Option<&'static str> {
        Some("SET SESSION sql_mode = 'STRICT_ALL_TABLES,NO_ENGINE_SUBSTITUTION'")
    }

    async fn insert_id<'q>(
        &self,
        conn: &mut AnyConnection,
        query: AnyQuery<'q>,
    ) -> Result<i64, sqlx::Error> {
        let result = query.execute(conn).await?;
        result
            .last_insert_id()
            .ok_or_else(|| sqlx::Error::Protocol("no LAST_INSERT_ID reported".to_string()))
    }

    fn durable_sessions(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_unchanged() {
        let sql = "SELECT id FROM users WHERE username = ?";
        assert_eq!(MySqlEngine.render(sql), sql);
        assert_eq!(MySqlEngine.render_insert(sql), sql);
    }

    #[test]
    fn test_connect_url() {
        let config = DbConfig::new(EngineKind::MySql);
        assert_eq!(MySqlEngine.connect_url(&config), "mysql://root@localhost:3306/hq");
    }
}
