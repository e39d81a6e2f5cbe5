//! User accounts inside a subsidiary.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use hq_core::{NewActivity, NewUser, Role, User, UserUpdate};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::audit;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(subsidiary_id): Path<i64>,
) -> Result<Json<Vec<User>>, ApiError> {
    current.require_admin_of(Some(subsidiary_id))?;
    Ok(Json(state.db()?.users().list_by_subsidiary(subsidiary_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(subsidiary_id): Path<i64>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    current.require_admin_of(Some(subsidiary_id))?;

    let db = state.db()?;
    // 404 before the insert trips over the foreign key
    db.subsidiaries().get(subsidiary_id).await?;

    let user = db
        .users()
        .create(NewUser {
            username: req.username,
            password: req.password,
            role: req.role,
            subsidiary_id: Some(subsidiary_id),
        })
        .await?;

    audit(
        &db,
        NewActivity::new("user_created", format!("Created {} {}", user.role, user.username))
            .subsidiary(subsidiary_id)
            .by(current.user.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    let db = state.db()?;
    let target = db.users().get(id).await?;
    current.require_admin_of(target.subsidiary_id)?;

    let user = db.users().update(id, update).await?;

    let mut entry = NewActivity::new("user_updated", format!("Updated {}", user.username))
        .by(current.user.id);
    entry.subsidiary_id = user.subsidiary_id;
    audit(&db, entry).await;

    Ok(Json(user))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let db = state.db()?;
    let target = db.users().get(id).await?;
    current.require_admin_of(target.subsidiary_id)?;

    if target.id == current.user.id {
        return Err(ApiError::BadRequest("cannot delete your own account".to_string()));
    }

    db.users().delete(id).await?;

    let mut entry = NewActivity::new("user_deleted", format!("Deleted {}", target.username))
        .by(current.user.id);
    entry.subsidiary_id = target.subsidiary_id;
    audit(&db, entry).await;

    Ok(StatusCode::NO_CONTENT)
}
