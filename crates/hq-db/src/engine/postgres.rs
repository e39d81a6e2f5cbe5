//! PostgreSQL dialect.

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::{AnyConnection, Row};

use super::{server_url, AnyQuery, Engine};
use crate::config::{DbConfig, EngineKind};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/postgres");

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresEngine;

#[async_trait]
impl Engine for PostgresEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Postgres
    }

    fn migrator(&self) -> &'static Migrator {
        &MIGRATOR
    }

    fn connect_url(&self, config: &DbConfig) -> String {
        server_url("postgres", config)
    }

    /// Numbers each `?` outside string literals as `$1`, `$2`, ...
    fn render(&self, sql: &str) -> String {
        let mut out = String::with_capacity(sql.len() + 8);
        let mut in_literal = false;
        let mut n = 0;

        for ch in sql.chars() {
            match ch {
                '\'' => {
                    // A doubled quote closes and reopens, which toggles back.
                    in_literal = !in_literal;
                    out.push(ch);
                }
                '?' if !in_literal => {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                }
                _ => out.push(ch),
            }
        }
        out
    }

    fn render_insert(&self, sql: &str) -> String {
        format!("{} RETURNING id", self.render(sql.trim_end()))
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
        true
    }
}
