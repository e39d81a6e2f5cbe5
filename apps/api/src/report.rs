//! Report rendering.
//!
//! Reports are flat rows: money as decimal strings, timestamps as RFC 3339.
//! The same rows serialize to a JSON array or to CSV with a header line.

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use hq_core::{ActivityLog, InventoryItem, ReportKind, Sale};

use crate::error::ApiError;

/// Output format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    /// Parses the `format` query parameter. Absent means JSON.
    pub fn parse(value: Option<&str>) -> Result<Self, ApiError> {
        match value {
            None | Some("json") => Ok(ReportFormat::Json),
            Some("csv") => Ok(ReportFormat::Csv),
            Some(other) => Err(ApiError::BadRequest(format!(
                "format '{other}' is not one of json, csv"
            ))),
        }
    }
}

/// A row of a rendered report.
pub trait ReportRow: Serialize {
    /// CSV column names, in field order.
    const HEADER: &'static [&'static str];
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReportRow {
    pub id: i64,
    pub subsidiary_id: i64,
    pub item_id: i64,
    pub user_id: i64,
    pub quantity: i64,
    pub sale_price: String,
    pub total: String,
    pub created_at: String,
}

impl ReportRow for SaleReportRow {
    const HEADER: &'static [&'static str] = &[
        "id",
        "subsidiaryId",
        "itemId",
        "userId",
        "quantity",
        "salePrice",
        "total",
        "createdAt",
    ];
}

impl From<Sale> for SaleReportRow {
    fn from(sale: Sale) -> Self {
        SaleReportRow {
            id: sale.id,
            subsidiary_id: sale.subsidiary_id,
            item_id: sale.item_id,
            user_id: sale.user_id,
            quantity: sale.quantity,
            sale_price: sale.sale_price().to_string(),
            total: sale.total().to_string(),
            created_at: timestamp(sale.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReportRow {
    pub id: i64,
    pub subsidiary_id: i64,
    pub name: String,
    pub quantity: i64,
    pub cost_price: String,
    pub sale_price: String,
    pub stock_value: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ReportRow for InventoryReportRow {
    const HEADER: &'static [&'static str] = &[
        "id",
        "subsidiaryId",
        "name",
        "quantity",
        "costPrice",
        "salePrice",
        "stockValue",
        "createdAt",
        "updatedAt",
    ];
}

impl From<InventoryItem> for InventoryReportRow {
    fn from(item: InventoryItem) -> Self {
        InventoryReportRow {
            id: item.id,
            subsidiary_id: item.subsidiary_id,
            cost_price: item.cost_price().to_string(),
            sale_price: item.sale_price().to_string(),
            stock_value: item.stock_value().to_string(),
            quantity: item.quantity,
            created_at: timestamp(item.created_at),
            updated_at: timestamp(item.updated_at),
            name: item.name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReportRow {
    pub id: i64,
    pub subsidiary_id: Option<i64>,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: String,
    pub created_at: String,
}

impl ReportRow for ActivityReportRow {
    const HEADER: &'static [&'static str] =
        &["id", "subsidiaryId", "userId", "action", "details", "createdAt"];
}

impl From<ActivityLog> for ActivityReportRow {
    fn from(entry: ActivityLog) -> Self {
        ActivityReportRow {
            id: entry.id,
            subsidiary_id: entry.subsidiary_id,
            user_id: entry.user_id,
            created_at: timestamp(entry.created_at),
            action: entry.action,
            details: entry.details,
        }
    }
}

/// Writes rows as CSV, header first. An empty report is just the header.
pub fn to_csv<R: ReportRow>(rows: &[R]) -> Result<Vec<u8>, ApiError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(R::HEADER)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Renders a report in the requested format.
pub fn render<R: ReportRow>(
    kind: ReportKind,
    rows: Vec<R>,
    format: ReportFormat,
) -> Result<Response, ApiError> {
    match format {
        ReportFormat::Json => Ok(Json(rows).into_response()),
        ReportFormat::Csv => {
            let body = to_csv(&rows)?;
            let disposition = format!("attachment; filename=\"{kind}-report.csv\"");
            Ok((
                [
                    (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sale() -> Sale {
        Sale {
            id: 1,
            subsidiary_id: 2,
            item_id: 3,
            user_id: 4,
            quantity: 3,
            sale_price_cents: 500,
            created_at: Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(ReportFormat::parse(None).unwrap(), ReportFormat::Json);
        assert_eq!(ReportFormat::parse(Some("csv")).unwrap(), ReportFormat::Csv);
        assert!(ReportFormat::parse(Some("xlsx")).is_err());
    }

    #[test]
    fn test_sale_row_includes_total() {
        let row = SaleReportRow::from(sale());
        assert_eq!(row.sale_price, "5.00");
        assert_eq!(row.total, "15.00");
        assert_eq!(row.created_at, "2026-03-15T12:00:00.000Z");
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let csv = to_csv(&[SaleReportRow::from(sale())]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("id,subsidiaryId,itemId,userId,quantity,salePrice,total,createdAt")
        );
        assert_eq!(lines.next(), Some("1,2,3,4,3,5.00,15.00,2026-03-15T12:00:00.000Z"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_csv_is_header_only() {
        let csv = to_csv::<ActivityReportRow>(&[]).unwrap();
        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "id,subsidiaryId,userId,action,details,createdAt\n"
        );
    }
}
