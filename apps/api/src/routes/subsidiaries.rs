//! Subsidiary management. Only the MHC admin creates or changes
//! subsidiaries; members may read their own.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use hq_core::{NewActivity, NewSubsidiary, Subsidiary, SubsidiaryUpdate};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::audit;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// `true` activates, `false` deactivates.
    pub status: bool,
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Subsidiary>>, ApiError> {
    current.require_mhc_admin()?;
    Ok(Json(state.db()?.subsidiaries().list().await?))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(input): Json<NewSubsidiary>,
) -> Result<impl IntoResponse, ApiError> {
    current.require_mhc_admin()?;

    let db = state.db()?;
    let subsidiary = db.subsidiaries().create(input).await?;

    audit(
        &db,
        NewActivity::new("subsidiary_created", format!("Created subsidiary {}", subsidiary.name))
            .subsidiary(subsidiary.id)
            .by(current.user.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(subsidiary)))
}

pub async fn get(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Subsidiary>, ApiError> {
    current.require_member_or_admin(id)?;
    Ok(Json(state.db()?.subsidiaries().get(id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<SubsidiaryUpdate>,
) -> Result<Json<Subsidiary>, ApiError> {
    current.require_mhc_admin()?;

    let db = state.db()?;
    let subsidiary = db.subsidiaries().update(id, update).await?;

    audit(
        &db,
        NewActivity::new("subsidiary_updated", format!("Updated subsidiary {}", subsidiary.name))
            .subsidiary(id)
            .by(current.user.id),
    )
    .await;

    Ok(Json(subsidiary))
}

pub async fn set_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Subsidiary>, ApiError> {
    current.require_mhc_admin()?;

    let db = state.db()?;
    let subsidiary = db.subsidiaries().set_status(id, req.status).await?;

    let action = if req.status {
        "subsidiary_activated"
    } else {
        "subsidiary_deactivated"
    };
    audit(
        &db,
        NewActivity::new(action, subsidiary.name.clone())
            .subsidiary(id)
            .by(current.user.id),
    )
    .await;

    Ok(Json(subsidiary))
}
