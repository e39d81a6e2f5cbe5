//! Login, logout and the current user.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use hq_core::{NewActivity, User};
use hq_db::password::verify_password;

use crate::auth::{clear_cookie, session_cookie, CurrentUser};
use crate::error::ApiError;
use crate::routes::audit;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db()?;

    let user = match db.users().find_by_username(req.username.trim()).await? {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            warn!(username = %req.username, "Failed login attempt");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if let Some(subsidiary_id) = user.subsidiary_id {
        if !db.subsidiaries().get(subsidiary_id).await?.status {
            return Err(ApiError::forbidden("subsidiary is inactive"));
        }
    }

    let ttl = state.config.session_ttl;
    let session = state.sessions.create(user.id, ttl).await?;
    info!(user_id = %user.id, role = %user.role, "User logged in");

    let mut entry = NewActivity::new("login", format!("{} logged in", user.username)).by(user.id);
    entry.subsidiary_id = user.subsidiary_id;
    audit(&db, entry).await;

    Ok(([(SET_COOKIE, session_cookie(&session.id, ttl))], Json(user)))
}

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.delete(&current.token).await?;
    info!(user_id = %current.user.id, "User logged out");

    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, clear_cookie())]))
}

pub async fn me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}
