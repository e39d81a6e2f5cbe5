//! # Activity Repository
//!
//! Append-only audit trail: there is no update or delete.

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{from_millis, now, to_millis};
use hq_core::validation::validate_new_activity;
use hq_core::{ActivityLog, NewActivity};

pub(crate) const COLUMNS: &str = "id, subsidiary_id, user_id, action, details, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct ActivityRow {
    id: i64,
    subsidiary_id: Option<i64>,
    user_id: Option<i64>,
    action: String,
    details: String,
    created_at: i64,
}

impl TryFrom<ActivityRow> for ActivityLog {
    type Error = DbError;

    fn try_from(row: ActivityRow) -> DbResult<Self> {
        Ok(ActivityLog {
            id: row.id,
            subsidiary_id: row.subsidiary_id,
            user_id: row.user_id,
            action: row.action,
            details: row.details,
            created_at: from_millis(row.created_at)?,
        })
    }
}

/// Repository for activity log operations.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    db: Database,
}

impl ActivityRepository {
    /// Creates a new ActivityRepository.
    pub fn new(db: Database) -> Self {
        ActivityRepository { db }
    }

    /// Appends an entry.
    pub async fn record(&self, input: NewActivity) -> DbResult<ActivityLog> {
        validate_new_activity(&input)?;

        let created_at = now();
        debug!(action = %input.action, subsidiary_id = ?input.subsidiary_id, "Recording activity");

        let sql = self.db.insert_sql(
            "INSERT INTO activity_logs (subsidiary_id, user_id, action, details, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        );

        let db = &self.db;
        let id = db
            .run("activity.record", async {
                let mut conn = db.pool().acquire().await?;
                let query = sqlx::query(&sql)
                    .bind(input.subsidiary_id)
                    .bind(input.user_id)
                    .bind(input.action.as_str())
                    .bind(input.details.as_str())
                    .bind(to_millis(created_at));

                Ok(db.engine().insert_id(&mut *conn, query).await?)
            })
            .await?;

        Ok(ActivityLog {
            id,
            subsidiary_id: input.subsidiary_id,
            user_id: input.user_id,
            action: input.action,
            details: input.details,
            created_at,
        })
    }

    /// Lists entries in insertion order, optionally for one subsidiary.
    pub async fn list(&self, subsidiary_id: Option<i64>) -> DbResult<Vec<ActivityLog>> {
        let sql = match subsidiary_id {
            Some(_) => self.db.sql(&format!(
                "SELECT {COLUMNS} FROM activity_logs WHERE subsidiary_id = ? ORDER BY id"
            )),
            None => format!("SELECT {COLUMNS} FROM activity_logs ORDER BY id"),
        };

        self.db
            .run("activity.list", async {
                let mut query = sqlx::query_as::<_, ActivityRow>(&sql);
                if let Some(id) = subsidiary_id {
                    query = query.bind(id);
                }
                let rows = query.fetch_all(self.db.pool()).await?;
                rows.into_iter().map(ActivityLog::try_from).collect()
            })
            .await
    }
}
