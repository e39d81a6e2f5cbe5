//! Inventory of a subsidiary. Reads are open to the MHC admin, writes only
//! to members.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use hq_core::{InventoryItem, InventoryUpdate, NewActivity, NewInventoryItem};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::audit;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub name: String,
    pub quantity: i64,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(subsidiary_id): Path<i64>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    current.require_member_or_admin(subsidiary_id)?;
    Ok(Json(state.db()?.inventory().list_by_subsidiary(subsidiary_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(subsidiary_id): Path<i64>,
    Json(req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    current.require_member(subsidiary_id)?;

    let db = state.db()?;
    let item = db
        .inventory()
        .create(NewInventoryItem {
            subsidiary_id,
            name: req.name,
            quantity: req.quantity,
            cost_price_cents: req.cost_price_cents,
            sale_price_cents: req.sale_price_cents,
        })
        .await?;

    audit(
        &db,
        NewActivity::new(
            "inventory_created",
            format!("Added {} ({} in stock)", item.name, item.quantity),
        )
        .subsidiary(subsidiary_id)
        .by(current.user.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<InventoryUpdate>,
) -> Result<Json<InventoryItem>, ApiError> {
    let db = state.db()?;
    let existing = db.inventory().get(id).await?;
    current.require_member(existing.subsidiary_id)?;

    let item = db.inventory().update(id, update).await?;

    audit(
        &db,
        NewActivity::new("inventory_updated", format!("Updated {}", item.name))
            .subsidiary(item.subsidiary_id)
            .by(current.user.id),
    )
    .await;

    Ok(Json(item))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let db = state.db()?;
    let existing = db.inventory().get(id).await?;
    current.require_member(existing.subsidiary_id)?;

    db.inventory().delete(id).await?;

    audit(
        &db,
        NewActivity::new("inventory_deleted", format!("Removed {}", existing.name))
            .subsidiary(existing.subsidiary_id)
            .by(current.user.id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
