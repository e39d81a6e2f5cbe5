//! Sales, inventory and activity reports over a time window.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use hq_core::{ReportKind, ReportWindow};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::report::{
    render, ActivityReportRow, InventoryReportRow, ReportFormat, SaleReportRow,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    /// `week` (default), `month`, `year` or `custom`.
    pub window: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// `json` (default) or `csv`.
    pub format: Option<String>,
    pub subsidiary_id: Option<i64>,
}

pub async fn report(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let kind: ReportKind = kind.parse()?;
    let scope = current.scope(query.subsidiary_id)?;
    let format = ReportFormat::parse(query.format.as_deref())?;
    let range = ReportWindow::parse(
        query.window.as_deref().unwrap_or("week"),
        query.start,
        query.end,
    )?
    .resolve(Utc::now())?;

    debug!(%kind, ?scope, start = %range.start, end = %range.end, "Building report");

    let reports = state.db()?.reports();
    match kind {
        ReportKind::Sales => {
            let rows = reports.sales(range, scope).await?;
            render(kind, rows.into_iter().map(SaleReportRow::from).collect(), format)
        }
        ReportKind::Inventory => {
            let rows = reports.inventory(range, scope).await?;
            render(kind, rows.into_iter().map(InventoryReportRow::from).collect(), format)
        }
        ReportKind::Activity => {
            let rows = reports.activity(range, scope).await?;
            render(kind, rows.into_iter().map(ActivityReportRow::from).collect(), format)
        }
    }
}
