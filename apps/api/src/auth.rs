//! # Authentication & Role Guards
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cookie: hq_session=<token>                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SessionStore::get(token) ── none / expired ──► 401                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  users.get(session.user_id) ── deleted ──► 401                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  own subsidiary inactive? ── yes ──► 403                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CurrentUser ──► handler ──► guard (require_*) ── denied ──► 403        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Role Matrix
//! | Guard                     | mhc_admin | subsidiary_admin | staff       |
//! |---------------------------|-----------|------------------|-------------|
//! | `require_mhc_admin`       | ✓         |                  |             |
//! | `require_admin_of(s)`     | ✓         | own s            |             |
//! | `require_member_or_admin` | ✓         | own s            | own s       |
//! | `require_member(s)`       |           | own s            | own s       |

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Duration;
use tracing::debug;

use hq_core::{Role, User};
use hq_db::{DbError, SESSION_COOKIE};

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Session token the request was authenticated with.
    pub token: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;

        let session = state
            .sessions
            .get(&token)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        let db = state.db()?;
        let user = match db.users().get(session.user_id).await {
            Ok(user) => user,
            Err(DbError::NotFound { .. }) => {
                debug!(user_id = %session.user_id, "Session belongs to a deleted user");
                state.sessions.delete(&token).await?;
                return Err(ApiError::Unauthenticated);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(subsidiary_id) = user.subsidiary_id {
            if !db.subsidiaries().get(subsidiary_id).await?.status {
                return Err(ApiError::forbidden("subsidiary is inactive"));
            }
        }

        Ok(CurrentUser { user, token })
    }
}

impl CurrentUser {
    pub fn is_mhc_admin(&self) -> bool {
        self.user.role == Role::MhcAdmin
    }

    pub fn require_mhc_admin(&self) -> Result<(), ApiError> {
        if self.is_mhc_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("requires mhc_admin"))
        }
    }

    /// Administrators of the subsidiary, or the MHC admin.
    pub fn require_admin_of(&self, subsidiary_id: Option<i64>) -> Result<(), ApiError> {
        let allowed = self.is_mhc_admin()
            || (self.user.role == Role::SubsidiaryAdmin
                && subsidiary_id.is_some_and(|id| self.user.belongs_to(id)));

        if allowed {
            Ok(())
        } else {
            Err(ApiError::forbidden("requires an administrator of this subsidiary"))
        }
    }

    /// Members of the subsidiary only.
    pub fn require_member(&self, subsidiary_id: i64) -> Result<(), ApiError> {
        if self.user.belongs_to(subsidiary_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden("not a member of this subsidiary"))
        }
    }

    /// Members of the subsidiary, or the MHC admin.
    pub fn require_member_or_admin(&self, subsidiary_id: i64) -> Result<(), ApiError> {
        if self.is_mhc_admin() {
            return Ok(());
        }
        self.require_member(subsidiary_id)
    }

    /// Resolves which subsidiary a cross-cutting read (activity, reports)
    /// may cover. The MHC admin may ask for any or all; everyone else is
    /// pinned to their own.
    pub fn scope(&self, requested: Option<i64>) -> Result<Option<i64>, ApiError> {
        if self.is_mhc_admin() {
            return Ok(requested);
        }
        match (self.user.subsidiary_id, requested) {
            (Some(own), None) => Ok(Some(own)),
            (Some(own), Some(id)) if own == id => Ok(Some(own)),
            _ => Err(ApiError::forbidden("not a member of this subsidiary")),
        }
    }
}

// =============================================================================
// Cookies
// =============================================================================

/// Extracts the session token from the `Cookie` header(s).
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value opening a session.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        ttl.num_seconds()
    )
}

/// `Set-Cookie` value removing the session cookie.
pub fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn user(role: Role, subsidiary_id: Option<i64>) -> CurrentUser {
        CurrentUser {
            user: User {
                id: 1,
                username: "u".to_string(),
                password_hash: String::new(),
                role,
                subsidiary_id,
                created_at: Utc::now(),
            },
            token: "t".to_string(),
        }
    }

    #[test]
    fn test_session_token_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; hq_session=abc-123"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc-123"));

        headers.insert(COOKIE, HeaderValue::from_static("hq_session="));
        assert_eq!(session_token(&headers), None);

        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_is_http_only() {
        let cookie = session_cookie("abc", Duration::hours(1));
        assert!(cookie.starts_with("hq_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_guards_deny_cross_subsidiary_access() {
        let admin = user(Role::MhcAdmin, None);
        let sub_admin = user(Role::SubsidiaryAdmin, Some(1));
        let staff = user(Role::Staff, Some(1));

        assert!(admin.require_mhc_admin().is_ok());
        assert!(sub_admin.require_mhc_admin().is_err());

        assert!(admin.require_admin_of(Some(2)).is_ok());
        assert!(sub_admin.require_admin_of(Some(1)).is_ok());
        assert!(sub_admin.require_admin_of(Some(2)).is_err());
        assert!(sub_admin.require_admin_of(None).is_err());
        assert!(staff.require_admin_of(Some(1)).is_err());

        assert!(staff.require_member_or_admin(1).is_ok());
        assert!(staff.require_member_or_admin(2).is_err());
        assert!(admin.require_member(1).is_err());
    }

    #[test]
    fn test_scope() {
        let admin = user(Role::MhcAdmin, None);
        let staff = user(Role::Staff, Some(3));

        assert_eq!(admin.scope(None).unwrap(), None);
        assert_eq!(admin.scope(Some(5)).unwrap(), Some(5));
        assert_eq!(staff.scope(None).unwrap(), Some(3));
        assert_eq!(staff.scope(Some(3)).unwrap(), Some(3));
        assert!(staff.scope(Some(5)).is_err());
    }
}
