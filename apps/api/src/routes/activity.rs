//! Activity log listing.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use hq_core::ActivityLog;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub subsidiary_id: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, ApiError> {
    let scope = current.scope(query.subsidiary_id)?;
    Ok(Json(state.db()?.activity().list(scope).await?))
}
