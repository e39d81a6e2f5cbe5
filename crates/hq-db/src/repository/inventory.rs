//! # Inventory Repository
//!
//! Stocked items, each owned by one subsidiary. `quantity` is only ever
//! decremented by the sale transaction; everything else here is plain CRUD.

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{from_millis, now, to_millis};
use hq_core::validation::{validate_inventory_update, validate_new_inventory_item};
use hq_core::{InventoryItem, InventoryUpdate, NewInventoryItem};

pub(crate) const COLUMNS: &str = "id, subsidiary_id, name, quantity, cost_price_cents, \
                                  sale_price_cents, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct InventoryRow {
    id: i64,
    subsidiary_id: i64,
    name: String,
    quantity: i64,
    cost_price_cents: i64,
    sale_price_cents: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<InventoryRow> for InventoryItem {
    type Error = DbError;

    fn try_from(row: InventoryRow) -> DbResult<Self> {
        Ok(InventoryItem {
            id: row.id,
            subsidiary_id: row.subsidiary_id,
            name: row.name,
            quantity: row.quantity,
            cost_price_cents: row.cost_price_cents,
            sale_price_cents: row.sale_price_cents,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

/// Repository for inventory database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    db: Database,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(db: Database) -> Self {
        InventoryRepository { db }
    }

    /// Creates an item in a subsidiary's inventory.
    pub async fn create(&self, input: NewInventoryItem) -> DbResult<InventoryItem> {
        validate_new_inventory_item(&input)?;

        let at = now();
        let name = input.name.trim().to_string();

        debug!(
            subsidiary_id = %input.subsidiary_id,
            name = %name,
            quantity = input.quantity,
            "Creating inventory item"
        );

        let sql = self.db.insert_sql(
            "INSERT INTO inventory (\
                subsidiary_id, name, quantity, cost_price_cents, sale_price_cents, \
                created_at, updated_at\
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        );

        let db = &self.db;
        let id = db
            .run("inventory.create", async {
                let mut conn = db.pool().acquire().await?;
                let query = sqlx::query(&sql)
                    .bind(input.subsidiary_id)
                    .bind(name.as_str())
                    .bind(input.quantity)
                    .bind(input.cost_price_cents)
                    .bind(input.sale_price_cents)
                    .bind(to_millis(at))
                    .bind(to_millis(at));

                Ok(db.engine().insert_id(&mut *conn, query).await?)
            })
            .await?;

        Ok(InventoryItem {
            id,
            subsidiary_id: input.subsidiary_id,
            name,
            quantity: input.quantity,
            cost_price_cents: input.cost_price_cents,
            sale_price_cents: input.sale_price_cents,
            created_at: at,
            updated_at: at,
        })
    }

    /// Gets an item by ID.
    pub async fn get(&self, id: i64) -> DbResult<InventoryItem> {
        let sql = self
            .db
            .sql(&format!("SELECT {COLUMNS} FROM inventory WHERE id = ?"));

        self.db
            .run("inventory.get", async {
                let row: Option<InventoryRow> = sqlx::query_as(&sql)
                    .bind(id)
                    .fetch_optional(self.db.pool())
                    .await?;
                row.ok_or_else(|| DbError::not_found("Inventory item", id))?
                    .try_into()
            })
            .await
    }

    /// Lists every item across subsidiaries.
    pub async fn list(&self) -> DbResult<Vec<InventoryItem>> {
        let sql = format!("SELECT {COLUMNS} FROM inventory ORDER BY id");

        self.db
            .run("inventory.list", async {
                let rows: Vec<InventoryRow> =
                    sqlx::query_as(&sql).fetch_all(self.db.pool()).await?;
                rows.into_iter().map(InventoryItem::try_from).collect()
            })
            .await
    }

    /// Lists the items owned by one subsidiary.
    pub async fn list_by_subsidiary(&self, subsidiary_id: i64) -> DbResult<Vec<InventoryItem>> {
        let sql = self.db.sql(&format!(
            "SELECT {COLUMNS} FROM inventory WHERE subsidiary_id = ? ORDER BY id"
        ));

        self.db
            .run("inventory.list_by_subsidiary", async {
                let rows: Vec<InventoryRow> = sqlx::query_as(&sql)
                    .bind(subsidiary_id)
                    .fetch_all(self.db.pool())
                    .await?;
                rows.into_iter().map(InventoryItem::try_from).collect()
            })
            .await
    }

    /// Applies the given field changes, including a manual stock correction.
    pub async fn update(&self, id: i64, update: InventoryUpdate) -> DbResult<InventoryItem> {
        validate_inventory_update(&update)?;

        debug!(id = %id, "Updating inventory item");

        let sql = self.db.sql(
            "UPDATE inventory SET \
                name = COALESCE(?, name), \
                quantity = COALESCE(?, quantity), \
                cost_price_cents = COALESCE(?, cost_price_cents), \
                sale_price_cents = COALESCE(?, sale_price_cents), \
                updated_at = ? \
             WHERE id = ?",
        );

        self.db
            .run("inventory.update", async {
                let result = sqlx::query(&sql)
                    .bind(update.name.as_deref().map(str::trim))
                    .bind(update.quantity)
                    .bind(update.cost_price_cents)
                    .bind(update.sale_price_cents)
                    .bind(to_millis(now()))
                    .bind(id)
                    .execute(self.db.pool())
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("Inventory item", id));
                }
                Ok(())
            })
            .await?;

        self.get(id).await
    }

    /// Deletes an item. Past sales keep referring to its id.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting inventory item");

        let sql = self.db.sql("DELETE FROM inventory WHERE id = ?");

        self.db
            .run("inventory.delete", async {
                let result = sqlx::query(&sql).bind(id).execute(self.db.pool()).await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("Inventory item", id));
                }
                Ok(())
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

    #[tokio::test]
    async fn test_list_by_subsidiary_returns_only_its_items() {
        let db = testing::database().await;
        let a = db.subsidiaries().create(testing::subsidiary("A", "TX-A")).await.unwrap();
        let b = db.subsidiaries().create(testing::subsidiary("B", "TX-B")).await.unwrap();

        let widget = db.inventory().create(testing::item(a.id, "Widget", 10, 500)).await.unwrap();
        db.inventory().create(testing::item(b.id, "Gadget", 4, 900)).await.unwrap();
        let bolt = db.inventory().create(testing::item(a.id, "Bolt", 100, 10)).await.unwrap();

        let items = db.inventory().list_by_subsidiary(a.id).await.unwrap();
        assert_eq!(items, vec![widget, bolt]);
        assert!(items.iter().all(|i| i.subsidiary_id == a.id));
        assert_eq!(db.inventory().list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = testing::database().await;
        let a = db.subsidiaries().create(testing::subsidiary("A", "TX-A")).await.unwrap();
        let item = db.inventory().create(testing::item(a.id, "Widget", 10, 500)).await.unwrap();

        let updated = db
            .inventory()
            .update(
                item.id,
                InventoryUpdate {
                    quantity: Some(25),
                    sale_price_cents: Some(650),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Widget");
        assert_eq!(updated.quantity, 25);
        assert_eq!(updated.sale_price().to_string(), "6.50");

        db.inventory().delete(item.id).await.unwrap();
        assert!(matches!(db.inventory().get(item.id).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_missing_item_is_not_found() {
        let db = testing::database().await;
        assert!(matches!(
            db.inventory().update(7, InventoryUpdate::default()).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(db.inventory().delete(7).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_negative_quantity_rejected_before_write() {
        let db = testing::database().await;
        let a = db.subsidiaries().create(testing::subsidiary("A", "TX-A")).await.unwrap();

        let err = db
            .inventory()
            .create(testing::item(a.id, "Widget", -1, 500))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(db.inventory().list().await.unwrap().is_empty());
    }
}
