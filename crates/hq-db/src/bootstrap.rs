//! # Default Admin Bootstrap
//!
//! Guarantees that an `admin` account with the `mhc_admin` role exists so a
//! fresh deployment can be logged into.

use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use hq_core::{NewUser, Role, DEFAULT_ADMIN_USERNAME};

/// What [`ensure_default_admin`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    AlreadyPresent,
}

/// Creates the default admin unless a user named `admin` already exists.
///
/// Safe to call on every startup. If two instances race, the loser's insert
/// hits the unique username and is reported as `AlreadyPresent`.
pub async fn ensure_default_admin(db: &Database, password: &str) -> DbResult<BootstrapOutcome> {
    if db.users().count_by_username(DEFAULT_ADMIN_USERNAME).await? > 0 {
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    let admin = NewUser {
        username: DEFAULT_ADMIN_USERNAME.to_string(),
        password: password.to_string(),
        role: Role::MhcAdmin,
        subsidiary_id: None,
    };

    match db.users().create(admin).await {
        Ok(user) => {
            info!(user_id = %user.id, "Default admin user created");
            Ok(BootstrapOutcome::Created)
        }
        Err(DbError::Conflict { .. }) => Ok(BootstrapOutcome::AlreadyPresent),
        Err(e) => Err(e),
    }
}

/// A random password for when none is configured.
pub fn generate_password() -> String {
    Uuid::new_v4().simple().to_string()
}
