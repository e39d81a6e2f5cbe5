//! # User Repository
//!
//! Accounts, roles and password hashes. Users are hard-deleted.

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::password::hash_password;
use crate::pool::Database;
use crate::repository::{from_millis, now, to_millis};
use hq_core::validation::{validate_new_user, validate_user_update};
use hq_core::{NewUser, Role, User, UserUpdate};

const COLUMNS: &str = "id, username, password_hash, role, subsidiary_id, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    subsidiary_id: Option<i64>,
    created_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> DbResult<Self> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e: hq_core::CoreError| DbError::Storage(e.to_string()))?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role,
            subsidiary_id: row.subsidiary_id,
            created_at: from_millis(row.created_at)?,
        })
    }
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(db: Database) -> Self {
        UserRepository { db }
    }

    /// Creates a user, hashing the plain-text password.
    ///
    /// ## Errors
    /// * `Validation` - bad username/password or role without/with a subsidiary
    /// * `Conflict` - username already taken
    pub async fn create(&self, input: NewUser) -> DbResult<User> {
        validate_new_user(&input)?;

        let username = input.username.trim().to_string();
        let password_hash = hash_password(&input.password)?;
        let created_at = now();

        debug!(username = %username, role = %input.role, "Creating user");

        let sql = self.db.insert_sql(
            "INSERT INTO users (username, password_hash, role, subsidiary_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        );

        let db = &self.db;
        db.run("users.create", async {
            let mut conn = db.pool().acquire().await?;
            let query = sqlx::query(&sql)
                .bind(username.as_str())
                .bind(password_hash.as_str())
                .bind(input.role.as_str())
                .bind(input.subsidiary_id)
                .bind(to_millis(created_at));

            let id = db
                .engine()
                .insert_id(&mut *conn, query)
                .await
                .map_err(|e| DbError::from(e).on_conflict("username", &username))?;

            Ok(User {
                id,
                username: username.clone(),
                password_hash: password_hash.clone(),
                role: input.role,
                subsidiary_id: input.subsidiary_id,
                created_at,
            })
        })
        .await
    }

    /// Gets a user by ID.
    pub async fn get(&self, id: i64) -> DbResult<User> {
        let sql = self.db.sql(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"));

        self.db
            .run("users.get", async {
                let row: Option<UserRow> = sqlx::query_as(&sql)
                    .bind(id)
                    .fetch_optional(self.db.pool())
                    .await?;
                row.ok_or_else(|| DbError::not_found("User", id))?.try_into()
            })
            .await
    }

    /// Finds a user by username (login).
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = self
            .db
            .sql(&format!("SELECT {COLUMNS} FROM users WHERE username = ?"));

        self.db
            .run("users.find_by_username", async {
                let row: Option<UserRow> = sqlx::query_as(&sql)
                    .bind(username.trim())
                    .fetch_optional(self.db.pool())
                    .await?;
                row.map(User::try_from).transpose()
            })
            .await
    }

    /// Counts users with a username (0 or 1).
    pub async fn count_by_username(&self, username: &str) -> DbResult<i64> {
        let sql = self.db.sql("SELECT COUNT(*) FROM users WHERE username = ?");

        self.db
            .run("users.count_by_username", async {
                let count: i64 = sqlx::query_scalar(&sql)
                    .bind(username.trim())
                    .fetch_one(self.db.pool())
                    .await?;
                Ok(count)
            })
            .await
    }

    /// Lists every user in insertion order.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("SELECT {COLUMNS} FROM users ORDER BY id");
        self.fetch_all("users.list", &sql, None).await
    }

    /// Lists the users of one subsidiary.
    pub async fn list_by_subsidiary(&self, subsidiary_id: i64) -> DbResult<Vec<User>> {
        let sql = self.db.sql(&format!(
            "SELECT {COLUMNS} FROM users WHERE subsidiary_id = ? ORDER BY id"
        ));
        self.fetch_all("users.list_by_subsidiary", &sql, Some(subsidiary_id))
            .await
    }

    async fn fetch_all(
        &self,
        operation: &'static str,
        sql: &str,
        subsidiary_id: Option<i64>,
    ) -> DbResult<Vec<User>> {
        self.db
            .run(operation, async {
                let mut query = sqlx::query_as::<_, UserRow>(sql);
                if let Some(id) = subsidiary_id {
                    query = query.bind(id);
                }
                let rows = query.fetch_all(self.db.pool()).await?;
                rows.into_iter().map(User::try_from).collect()
            })
            .await
    }

    /// Changes a user's username and/or password.
    pub async fn update(&self, id: i64, update: UserUpdate) -> DbResult<User> {
        validate_user_update(&update)?;

        let username = update.username.as_deref().map(str::trim).map(str::to_string);
        let password_hash = update.password.as_deref().map(hash_password).transpose()?;

        debug!(id = %id, "Updating user");

        let sql = self.db.sql(
            "UPDATE users SET \
                username = COALESCE(?, username), \
                password_hash = COALESCE(?, password_hash) \
             WHERE id = ?",
        );

        self.db
            .run("users.update", async {
                let result = sqlx::query(&sql)
                    .bind(username.clone())
                    .bind(password_hash.clone())
                    .bind(id)
                    .execute(self.db.pool())
                    .await
                    .map_err(|e| {
                        DbError::from(e).on_conflict("username", username.as_deref().unwrap_or(""))
                    })?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("User", id));
                }
                Ok(())
            })
            .await?;

        self.get(id).await
    }

    /// Deletes a user.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let sql = self.db.sql("DELETE FROM users WHERE id = ?");

        self.db
            .run("users.delete", async {
                let result = sqlx::query(&sql).bind(id).execute(self.db.pool()).await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("User", id));
                }
                Ok(())
            })
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
