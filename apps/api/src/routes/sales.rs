//! Sales. Recording a sale decrements stock in the same transaction.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use hq_core::{NewActivity, NewSale, Sale};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::routes::audit;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub item_id: i64,
    pub quantity: i64,
    /// Overrides the item's current sale price.
    #[serde(default)]
    pub sale_price_cents: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(subsidiary_id): Path<i64>,
) -> Result<Json<Vec<Sale>>, ApiError> {
    current.require_member_or_admin(subsidiary_id)?;
    Ok(Json(state.db()?.sales().list_by_subsidiary(subsidiary_id).await?))
}

/// Every sale across subsidiaries.
pub async fn list_all(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Sale>>, ApiError> {
    current.require_mhc_admin()?;
    Ok(Json(state.db()?.sales().list().await?))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(subsidiary_id): Path<i64>,
    Json(req): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    current.require_member(subsidiary_id)?;

    let db = state.db()?;
    let sale = db
        .sales()
        .create(NewSale {
            subsidiary_id,
            item_id: req.item_id,
            user_id: current.user.id,
            quantity: req.quantity,
            sale_price_cents: req.sale_price_cents,
            created_at: None,
        })
        .await?;

    audit(
        &db,
        NewActivity::new(
            "sale_created",
            format!(
                "Sold {} of item {} for {}",
                sale.quantity,
                sale.item_id,
                sale.total()
            ),
        )
        .subsidiary(subsidiary_id)
        .by(current.user.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(sale)))
}
