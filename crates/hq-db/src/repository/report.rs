//! # Report Queries
//!
//! Rows created inside a half-open time range, optionally for one
//! subsidiary. Rendering (CSV / JSON) belongs to the API layer.

use sqlx::any::AnyRow;
use sqlx::FromRow;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::activity::{ActivityRow, COLUMNS as ACTIVITY_COLUMNS};
use crate::repository::inventory::{InventoryRow, COLUMNS as INVENTORY_COLUMNS};
use crate::repository::sale::{SaleRow, COLUMNS as SALE_COLUMNS};
use crate::repository::to_millis;
use hq_core::{ActivityLog, InventoryItem, Sale, TimeRange};

/// Read-only report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: Database,
}

impl ReportRepository {
    pub fn new(db: Database) -> Self {
        ReportRepository { db }
    }

    /// Sales made inside the range.
    pub async fn sales(&self, range: TimeRange, subsidiary_id: Option<i64>) -> DbResult<Vec<Sale>> {
        self.window::<SaleRow, Sale>("reports.sales", "sales", SALE_COLUMNS, range, subsidiary_id)
            .await
    }

    /// Inventory items created inside the range.
    pub async fn inventory(
        &self,
        range: TimeRange,
        subsidiary_id: Option<i64>,
    ) -> DbResult<Vec<InventoryItem>> {
        self.window::<InventoryRow, InventoryItem>(
            "reports.inventory",
            "inventory",
            INVENTORY_COLUMNS,
            range,
            subsidiary_id,
        )
        .await
    }

    /// Activity recorded inside the range.
    pub async fn activity(
        &self,
        range: TimeRange,
        subsidiary_id: Option<i64>,
    ) -> DbResult<Vec<ActivityLog>> {
        self.window::<ActivityRow, ActivityLog>(
            "reports.activity",
            "activity_logs",
            ACTIVITY_COLUMNS,
            range,
            subsidiary_id,
        )
        .await
    }

    async fn window<R, T>(
        &self,
        operation: &'static str,
        table: &str,
        columns: &str,
        range: TimeRange,
        subsidiary_id: Option<i64>,
    ) -> DbResult<Vec<T>>
    where
        R: for<'r> FromRow<'r, AnyRow> + Send + Unpin,
        T: TryFrom<R, Error = DbError>,
    {
        let filter = if subsidiary_id.is_some() {
            " AND subsidiary_id = ?"
        } else {
            ""
        };
        let sql = self.db.sql(&format!(
            "SELECT {columns} FROM {table} \
             WHERE created_at >= ? AND created_at < ?{filter} ORDER BY id"
        ));

        self.db
            .run(operation, async {
                let mut query = sqlx::query_as::<_, R>(&sql)
                    .bind(to_millis(range.start))
                    .bind(to_millis(range.end));
                if let Some(id) = subsidiary_id {
                    query = query.bind(id);
                }
                let rows = query.fetch_all(self.db.pool()).await?;
                rows.into_iter().map(T::try_from).collect()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use chrono::{Duration, TimeZone, Utc};
    use hq_core::{NewSale, ReportWindow};

    #[tokio::test]
    async fn test_sales_window_is_half_open() {
        let db = testing::database().await;
        let a = db.subsidiaries().create(testing::subsidiary("A", "TX-A")).await.unwrap();
        let b = db.subsidiaries().create(testing::subsidiary("B", "TX-B")).await.unwrap();
        let clerk = db.users().create(testing::staff("clerk", a.id)).await.unwrap();
        let widget = db.inventory().create(testing::item(a.id, "Widget", 100, 500)).await.unwrap();
        let gadget = db.inventory().create(testing::item(b.id, "Gadget", 100, 900)).await.unwrap();

        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(7);

        for (subsidiary_id, item_id, at) in [
            (a.id, widget.id, start - Duration::seconds(1)),
            (a.id, widget.id, start),
            (b.id, gadget.id, start + Duration::days(3)),
            (a.id, widget.id, end),
        ] {
            db.sales()
                .create(NewSale {
                    subsidiary_id,
                    item_id,
                    user_id: clerk.id,
                    quantity: 1,
                    sale_price_cents: None,
                    created_at: Some(at),
                })
                .await
                .unwrap();
        }

        let range = TimeRange::new(start, end).unwrap();
        let all = db.reports().sales(range, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|s| range.contains(s.created_at)));

        let only_a = db.reports().sales(range, Some(a.id)).await.unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].created_at, start);
    }

    #[tokio::test]
    async fn test_recent_rows_fall_in_trailing_week() {
        let db = testing::database().await;
        let a = db.subsidiaries().create(testing::subsidiary("A", "TX-A")).await.unwrap();
        db.inventory().create(testing::item(a.id, "Widget", 3, 500)).await.unwrap();

        let range = ReportWindow::Week
            .resolve(Utc::now() + Duration::seconds(1))
            .unwrap();
        assert_eq!(db.reports().inventory(range, Some(a.id)).await.unwrap().len(), 1);
        assert!(db.reports().activity(range, None).await.unwrap().is_empty());
    }
}
