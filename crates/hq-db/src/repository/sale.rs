//! # Sale Repository
//!
//! Sales are append-only. Creating one decrements the sold item's stock in
//! the same transaction.
//!
//! ## Sale Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       create(NewSale)                                   │
//! │                                                                         │
//! │  0. validate quantity, price bounds           (no round-trip on failure) │
//! │  1. BEGIN                                                               │
//! │  2. UPDATE inventory SET quantity = quantity - q                        │
//! │       WHERE id = ? AND subsidiary_id = ? AND quantity >= q              │
//! │       └── 0 rows ──► read available, ROLLBACK                           │
//! │             ├── no such item here ──► NotFound                          │
//! │             └── otherwise ──────────► InsufficientStock                 │
//! │  3. SELECT item (sale price)                                            │
//! │  4. INSERT INTO sales (...)                                             │
//! │  5. COMMIT                                                              │
//! │                                                                         │
//! │  Any error between 1 and 5 drops the transaction: neither the sale      │
//! │  row nor the decrement survives.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check is part of the UPDATE itself, so two concurrent sales of
//! the same item serialize on the row and the second one sees the first
//! one's decrement. Issuing the UPDATE before any read also lets SQLite
//! wait on its busy timeout instead of failing a lock upgrade.

use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::inventory::{InventoryRow, COLUMNS as INVENTORY_COLUMNS};
use crate::repository::{from_millis, now, to_millis};
use hq_core::validation::validate_new_sale;
use hq_core::{InventoryItem, NewSale, Sale};

pub(crate) const COLUMNS: &str =
    "id, subsidiary_id, item_id, user_id, quantity, sale_price_cents, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct SaleRow {
    id: i64,
    subsidiary_id: i64,
    item_id: i64,
    user_id: i64,
    quantity: i64,
    sale_price_cents: i64,
    created_at: i64,
}

impl TryFrom<SaleRow> for Sale {
    type Error = DbError;

    fn try_from(row: SaleRow) -> DbResult<Self> {
        Ok(Sale {
            id: row.id,
            subsidiary_id: row.subsidiary_id,
            item_id: row.item_id,
            user_id: row.user_id,
            quantity: row.quantity,
            sale_price_cents: row.sale_price_cents,
            created_at: from_millis(row.created_at)?,
        })
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    db: Database,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(db: Database) -> Self {
        SaleRepository { db }
    }

    /// Records a sale and decrements stock atomically.
    ///
    /// ## Errors
    /// * `Validation` - quantity or price out of range
    /// * `NotFound` - item absent or owned by another subsidiary
    /// * `InsufficientStock` - fewer units in stock than requested
    pub async fn create(&self, input: NewSale) -> DbResult<Sale> {
        validate_new_sale(&input)?;

        let created_at = match input.created_at {
            Some(at) => from_millis(to_millis(at))?,
            None => now(),
        };

        debug!(
            subsidiary_id = %input.subsidiary_id,
            item_id = %input.item_id,
            quantity = input.quantity,
            "Creating sale"
        );

        let decrement = self.db.sql(
            "UPDATE inventory SET quantity = quantity - ?, updated_at = ? \
             WHERE id = ? AND subsidiary_id = ? AND quantity >= ?",
        );
        let available = self
            .db
            .sql("SELECT quantity FROM inventory WHERE id = ? AND subsidiary_id = ?");
        let select_item = self.db.sql(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory WHERE id = ? AND subsidiary_id = ?"
        ));
        let insert_sale = self.db.insert_sql(
            "INSERT INTO sales (\
                subsidiary_id, item_id, user_id, quantity, sale_price_cents, created_at\
             ) VALUES (?, ?, ?, ?, ?, ?)",
        );

        let db = &self.db;
        let sale = db
            .run("sales.create", async {
                let mut tx = db.pool().begin().await?;

                // Write first: the transaction holds the item's write lock
                // before it reads anything.
                let result = sqlx::query(&decrement)
                    .bind(input.quantity)
                    .bind(to_millis(now()))
                    .bind(input.item_id)
                    .bind(input.subsidiary_id)
                    .bind(input.quantity)
                    .execute(&mut *tx)
                    .await?;

                if result.rows_affected() == 0 {
                    let in_stock: Option<i64> = sqlx::query_scalar(&available)
                        .bind(input.item_id)
                        .bind(input.subsidiary_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                    tx.rollback().await?;

                    return Err(match in_stock {
                        Some(in_stock) => DbError::InsufficientStock {
                            item_id: input.item_id,
                            available: in_stock,
                            requested: input.quantity,
                        },
                        None => DbError::not_found("Inventory item", input.item_id),
                    });
                }

                let item: InventoryItem = sqlx::query_as::<_, InventoryRow>(&select_item)
                    .bind(input.item_id)
                    .bind(input.subsidiary_id)
                    .fetch_one(&mut *tx)
                    .await?
                    .try_into()?;

                let sale_price_cents = input.sale_price_cents.unwrap_or(item.sale_price_cents);

                let insert = sqlx::query(&insert_sale)
                    .bind(input.subsidiary_id)
                    .bind(item.id)
                    .bind(input.user_id)
                    .bind(input.quantity)
                    .bind(sale_price_cents)
                    .bind(to_millis(created_at));
                let id = db.engine().insert_id(&mut *tx, insert).await?;

                tx.commit().await?;

                Ok(Sale {
                    id,
                    subsidiary_id: input.subsidiary_id,
                    item_id: item.id,
                    user_id: input.user_id,
                    quantity: input.quantity,
                    sale_price_cents,
                    created_at,
                })
            })
            .await?;

        info!(
            sale_id = %sale.id,
            item_id = %sale.item_id,
            quantity = sale.quantity,
            total = %sale.total(),
            "Sale recorded"
        );

        Ok(sale)
    }

    /// Gets a sale by ID.
    pub async fn get(&self, id: i64) -> DbResult<Sale> {
        let sql = self.db.sql(&format!("SELECT {COLUMNS} FROM sales WHERE id = ?"));

        self.db
            .run("sales.get", async {
                let row: Option<SaleRow> = sqlx::query_as(&sql)
                    .bind(id)
                    .fetch_optional(self.db.pool())
                    .await?;
                row.ok_or_else(|| DbError::not_found("Sale", id))?.try_into()
            })
            .await
    }

    /// Lists every sale in insertion order.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sql = format!("SELECT {COLUMNS} FROM sales ORDER BY id");

        self.db
            .run("sales.list", async {
                let rows: Vec<SaleRow> = sqlx::query_as(&sql).fetch_all(self.db.pool()).await?;
                rows.into_iter().map(Sale::try_from).collect()
            })
            .await
    }

    /// Lists the sales of one subsidiary.
    pub async fn list_by_subsidiary(&self, subsidiary_id: i64) -> DbResult<Vec<Sale>> {
        let sql = self.db.sql(&format!(
            "SELECT {COLUMNS} FROM sales WHERE subsidiary_id = ? ORDER BY id"
        ));

        self.db
            .run("sales.list_by_subsidiary", async {
                let rows: Vec<SaleRow> = sqlx::query_as(&sql)
                    .bind(subsidiary_id)
                    .fetch_all(self.db.pool())
                    .await?;
                rows.into_iter().map(Sale::try_from).collect()
            })
            .await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;
    use crate::{DbConfig, EngineKind};
    use chrono::{TimeZone, Utc};

    struct Shop {
        db: Database,
        subsidiary_id: i64,
        user_id: i64,
        widget: InventoryItem,
    }

    async fn shop() -> Shop {
        let db = testing::database().await;
        let acme = db
            .subsidiaries()
            .create(testing::subsidiary("Acme", "TX-1"))
            .await
            .unwrap();
        let clerk = db.users().create(testing::staff("clerk", acme.id)).await.unwrap();
        let widget = db
            .inventory()
            .create(testing::item(acme.id, "Widget", 10, 500))
            .await
            .unwrap();

        Shop {
            db,
            subsidiary_id: acme.id,
            user_id: clerk.id,
            widget,
        }
    }

    fn sell(shop: &Shop, item_id: i64, quantity: i64) -> NewSale {
        NewSale {
            subsidiary_id: shop.subsidiary_id,
            item_id,
            user_id: shop.user_id,
            quantity,
            sale_price_cents: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_widget_scenario() {
        let shop = shop().await;
        let db = &shop.db;

        let sale = db.sales().create(sell(&shop, shop.widget.id, 3)).await.unwrap();
        assert_eq!(sale.quantity, 3);
        assert_eq!(sale.sale_price().to_string(), "5.00");
        assert_eq!(sale.total().to_string(), "15.00");
        assert_eq!(db.inventory().get(shop.widget.id).await.unwrap().quantity, 7);

        let err = db.sales().create(sell(&shop, shop.widget.id, 8)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::InsufficientStock { available: 7, requested: 8, .. }
        ));
        assert_eq!(db.inventory().get(shop.widget.id).await.unwrap().quantity, 7);
        assert_eq!(db.sales().list().await.unwrap(), vec![sale]);
    }

    #[tokio::test]
    async fn test_other_items_untouched() {
        let shop = shop().await;
        let db = &shop.db;
        let bolt = db
            .inventory()
            .create(testing::item(shop.subsidiary_id, "Bolt", 50, 10))
            .await
            .unwrap();

        db.sales().create(sell(&shop, shop.widget.id, 4)).await.unwrap();

        assert_eq!(db.inventory().get(shop.widget.id).await.unwrap().quantity, 6);
        assert_eq!(db.inventory().get(bolt.id).await.unwrap().quantity, 50);
    }

    #[tokio::test]
    async fn test_selling_exact_stock_reaches_zero() {
        let shop = shop().await;
        let db = &shop.db;

        db.sales().create(sell(&shop, shop.widget.id, 10)).await.unwrap();
        assert_eq!(db.inventory().get(shop.widget.id).await.unwrap().quantity, 0);

        let err = db.sales().create(sell(&shop, shop.widget.id, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::InsufficientStock { available: 0, .. }));
    }

    #[tokio::test]
    async fn test_fault_after_decrement_leaves_no_rows() {
        let shop = shop().await;
        let db = &shop.db;

        sqlx::query(
            "CREATE TRIGGER fail_sale_insert BEFORE INSERT ON sales \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = db.sales().create(sell(&shop, shop.widget.id, 3)).await.unwrap_err();
        assert!(matches!(err, DbError::Storage(ref msg) if msg.contains("injected failure")));

        assert!(db.sales().list().await.unwrap().is_empty());
        assert_eq!(db.inventory().get(shop.widget.id).await.unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_item_of_another_subsidiary_is_not_found() {
        let shop = shop().await;
        let db = &shop.db;
        let other = db
            .subsidiaries()
            .create(testing::subsidiary("Beta", "TX-2"))
            .await
            .unwrap();
        let gadget = db
            .inventory()
            .create(testing::item(other.id, "Gadget", 5, 900))
            .await
            .unwrap();

        let err = db.sales().create(sell(&shop, gadget.id, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(db.inventory().get(gadget.id).await.unwrap().quantity, 5);
        assert!(db.sales().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_quantity_never_reaches_storage() {
        let shop = shop().await;
        let err = shop
            .db
            .sales()
            .create(sell(&shop, shop.widget.id, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_explicit_price_and_timestamp_are_kept() {
        let shop = shop().await;
        let db = &shop.db;
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 9, 30, 0).unwrap();

        let sale = db
            .sales()
            .create(NewSale {
                sale_price_cents: Some(450),
                created_at: Some(at),
                ..sell(&shop, shop.widget.id, 2)
            })
            .await
            .unwrap();

        let stored = db.sales().get(sale.id).await.unwrap();
        assert_eq!(stored.sale_price_cents, 450);
        assert_eq!(stored.created_at, at);
        assert_eq!(
            db.sales().list_by_subsidiary(shop.subsidiary_id).await.unwrap(),
            vec![stored]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig {
            database: dir.path().join("hq.db").display().to_string(),
            max_connections: 4,
            ..DbConfig::new(EngineKind::Sqlite)
        };
        let db = Database::connect(config).await.unwrap();

        let acme = db
            .subsidiaries()
            .create(testing::subsidiary("Acme", "TX-1"))
            .await
            .unwrap();
        let clerk = db.users().create(testing::staff("clerk", acme.id)).await.unwrap();
        let widget = db
            .inventory()
            .create(testing::item(acme.id, "Widget", 10, 500))
            .await
            .unwrap();

        // 8 sales of 3 against a stock of 10: at most 3 can succeed.
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    db.sales()
                        .create(NewSale {
                            subsidiary_id: acme.id,
                            item_id: widget.id,
                            user_id: clerk.id,
                            quantity: 3,
                            sale_price_cents: None,
                            created_at: None,
                        })
                        .await
                })
            })
            .collect();

        let mut sold = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(sale) => sold += sale.quantity,
                Err(e) => assert!(
                    matches!(e, DbError::InsufficientStock { requested: 3, .. }),
                    "unexpected error: {e:?}"
                ),
            }
        }

        let remaining = db.inventory().get(widget.id).await.unwrap().quantity;
        assert_eq!(sold, 9);
        assert_eq!(remaining, 1);
        assert_eq!(db.sales().list().await.unwrap().len(), 3);

        db.close().await;
    }
}
