//! # Session Stores
//!
//! Login sessions keyed by an opaque random token.
//!
//! ## Store Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine       store                 survives restart                    │
//! │  ──────────   ───────────────────   ────────────────                    │
//! │  postgresql   DbSessionStore        yes (sessions table)                │
//! │  mysql        MemorySessionStore    no                                  │
//! │  sqlite       MemorySessionStore    no                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expired sessions are never returned; `get` removes them on sight and
//! `purge_expired` sweeps the rest.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EngineKind;
use crate::engine;
use crate::error::{DbError, DbResult};
use crate::repository::{from_millis, now, to_millis};
use crate::slot::ConnectionSlot;
use hq_core::Session;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "hq_session";

#[async_trait]
pub trait SessionStore: Debug + Send + Sync {
    /// Whether sessions survive a process restart.
    fn is_durable(&self) -> bool;

    /// Opens a session for a user.
    async fn create(&self, user_id: i64, ttl: Duration) -> DbResult<Session>;

    /// Looks up a live session. Expired sessions are removed and yield `None`.
    async fn get(&self, token: &str) -> DbResult<Option<Session>>;

    /// Ends a session. Unknown tokens are ignored.
    async fn delete(&self, token: &str) -> DbResult<()>;

    /// Removes every expired session and returns how many were removed.
    async fn purge_expired(&self) -> DbResult<u64>;
}

fn new_session(user_id: i64, ttl: Duration) -> Session {
    let created_at = now();
    Session {
        id: Uuid::new_v4().to_string(),
        user_id,
        created_at,
        expires_at: created_at + ttl,
    }
}

/// Picks the session store for an engine.
pub fn session_store_for(kind: EngineKind, slot: ConnectionSlot) -> Arc<dyn SessionStore> {
    if engine::for_kind(kind).durable_sessions() {
        Arc::new(DbSessionStore::new(slot))
    } else {
        warn!(
            engine = %kind,
            "Using in-memory session store; sessions are lost on restart"
        );
        Arc::new(MemorySessionStore::new())
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Process-local session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn is_durable(&self) -> bool {
        false
    }

    async fn create(&self, user_id: i64, ttl: Duration) -> DbResult<Session> {
        let session = new_session(user_id, ttl);
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        debug!(user_id, "Session created");
        Ok(session)
    }

    async fn get(&self, token: &str) -> DbResult<Option<Session>> {
        let session = self.sessions.read().await.get(token).cloned();

        match session {
            Some(session) if session.is_expired(now()) => {
                self.sessions.write().await.remove(token);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete(&self, token: &str) -> DbResult<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    async fn purge_expired(&self) -> DbResult<u64> {
        let at = now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(at));
        Ok((before - sessions.len()) as u64)
    }
}

// =============================================================================
// Database Store
// =============================================================================

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: i64,
    created_at: i64,
    expires_at: i64,
}

impl TryFrom<SessionRow> for Session {
    type Error = DbError;

    fn try_from(row: SessionRow) -> DbResult<Self> {
        Ok(Session {
            id: row.id,
            user_id: row.user_id,
            created_at: from_millis(row.created_at)?,
            expires_at: from_millis(row.expires_at)?,
        })
    }
}

/// Session store backed by the `sessions` table.
///
/// Holds the connection slot rather than a handle, so it can be built
/// before the database is connected.
#[derive(Debug, Clone)]
pub struct DbSessionStore {
    slot: ConnectionSlot,
}

impl DbSessionStore {
    pub fn new(slot: ConnectionSlot) -> Self {
        DbSessionStore { slot }
    }
}

#[async_trait]
impl SessionStore for DbSessionStore {
    fn is_durable(&self) -> bool {
        true
    }

    async fn create(&self, user_id: i64, ttl: Duration) -> DbResult<Session> {
        let db = self.slot.get()?;
        let session = new_session(user_id, ttl);

        let sql = db.sql("INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)");
        db.run("sessions.create", async {
            sqlx::query(&sql)
                .bind(session.id.as_str())
                .bind(session.user_id)
                .bind(to_millis(session.created_at))
                .bind(to_millis(session.expires_at))
                .execute(db.pool())
                .await?;
            Ok(())
        })
        .await?;

        debug!(user_id, "Session created");
        Ok(session)
    }

    async fn get(&self, token: &str) -> DbResult<Option<Session>> {
        let db = self.slot.get()?;

        let sql = db.sql("SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?");
        let session = db
            .run("sessions.get", async {
                let row: Option<SessionRow> = sqlx::query_as(&sql)
                    .bind(token)
                    .fetch_optional(db.pool())
                    .await?;
                row.map(Session::try_from).transpose()
            })
            .await?;

        match session {
            Some(session) if session.is_expired(now()) => {
                self.delete(token).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete(&self, token: &str) -> DbResult<()> {
        let db = self.slot.get()?;

        let sql = db.sql("DELETE FROM sessions WHERE id = ?");
        db.run("sessions.delete", async {
            sqlx::query(&sql).bind(token).execute(db.pool()).await?;
            Ok(())
        })
        .await
    }

    async fn purge_expired(&self) -> DbResult<u64> {
        let db = self.slot.get()?;

        let sql = db.sql("DELETE FROM sessions WHERE expires_at <= ?");
        db.run("sessions.purge_expired", async {
            let result = sqlx::query(&sql)
                .bind(to_millis(now()))
                .execute(db.pool())
                .await?;
            Ok(result.rows_affected())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;

    async fn db_store() -> DbSessionStore {
        DbSessionStore::new(ConnectionSlot::ready_with(testing::database().await))
    }

    async fn exercise(store: &dyn SessionStore) {
        let live = store.create(7, Duration::hours(1)).await.unwrap();
        let stale = store.create(8, Duration::milliseconds(-1)).await.unwrap();
        assert_ne!(live.id, stale.id);

        let found = store.get(&live.id).await.unwrap().unwrap();
        assert_eq!(found, live);

        // Expired sessions vanish on lookup.
        assert!(store.get(&stale.id).await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 0);

        store.delete(&live.id).await.unwrap();
        assert!(store.get(&live.id).await.unwrap().is_none());
        store.delete("never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store() {
        exercise(&MemorySessionStore::new()).await;
    }

    #[tokio::test]
    async fn test_database_store() {
        exercise(&db_store().await).await;
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = db_store().await;
        store.create(1, Duration::milliseconds(-1)).await.unwrap();
        store.create(2, Duration::milliseconds(-1)).await.unwrap();
        store.create(3, Duration::hours(1)).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_database_store_before_connect() {
        let store = DbSessionStore::new(ConnectionSlot::new());
        assert!(matches!(
            store.create(1, Duration::hours(1)).await,
            Err(DbError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_store_policy_follows_engine() {
        let slot = ConnectionSlot::new();
        assert!(session_store_for(EngineKind::Postgres, slot.clone()).is_durable());
        assert!(!session_store_for(EngineKind::MySql, slot.clone()).is_durable());
        assert!(!session_store_for(EngineKind::Sqlite, slot).is_durable());
    }
}
