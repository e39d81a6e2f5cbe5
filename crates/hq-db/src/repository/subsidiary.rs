//! # Subsidiary Repository
//!
//! Subsidiaries are soft-disabled through `status`, never deleted.
//!
//! ## Tax Id Uniqueness
//! ```text
//! create("Acme", taxId = "TX-1")  ──► id 1
//! create("Beta", taxId = "TX-1")  ──► UNIQUE violation
//!                                     └── DbError::Conflict { field: "taxId", value: "TX-1" }
//! ```

use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{from_millis, now, to_millis};
use hq_core::validation::{validate_new_subsidiary, validate_subsidiary_update};
use hq_core::{NewSubsidiary, Subsidiary, SubsidiaryUpdate};

const COLUMNS: &str = "id, name, tax_id, email, phone_number, logo, address, city, country, \
                       status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct SubsidiaryRow {
    id: i64,
    name: String,
    tax_id: String,
    email: String,
    phone_number: String,
    logo: Option<String>,
    address: Option<String>,
    city: Option<String>,
    country: Option<String>,
    status: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SubsidiaryRow> for Subsidiary {
    type Error = DbError;

    fn try_from(row: SubsidiaryRow) -> DbResult<Self> {
        Ok(Subsidiary {
            id: row.id,
            name: row.name,
            tax_id: row.tax_id,
            email: row.email,
            phone_number: row.phone_number,
            logo: row.logo,
            address: row.address,
            city: row.city,
            country: row.country,
            status: row.status != 0,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).map(str::to_string)
}

/// Repository for subsidiary database operations.
#[derive(Debug, Clone)]
pub struct SubsidiaryRepository {
    db: Database,
}

impl SubsidiaryRepository {
    /// Creates a new SubsidiaryRepository.
    pub fn new(db: Database) -> Self {
        SubsidiaryRepository { db }
    }

    /// Creates an active subsidiary.
    ///
    /// ## Errors
    /// * `Validation` - name, taxId, email or phoneNumber missing (no row written)
    /// * `Conflict` - taxId already registered
    pub async fn create(&self, input: NewSubsidiary) -> DbResult<Subsidiary> {
        validate_new_subsidiary(&input)?;

        let at = now();
        let subsidiary = Subsidiary {
            id: 0,
            name: input.name.trim().to_string(),
            tax_id: input.tax_id.trim().to_string(),
            email: input.email.trim().to_string(),
            phone_number: input.phone_number.trim().to_string(),
            logo: trimmed(&input.logo),
            address: trimmed(&input.address),
            city: trimmed(&input.city),
            country: trimmed(&input.country),
            status: true,
            created_at: at,
            updated_at: at,
        };

        debug!(name = %subsidiary.name, tax_id = %subsidiary.tax_id, "Creating subsidiary");

        let sql = self.db.insert_sql(
            "INSERT INTO subsidiaries (\
                name, tax_id, email, phone_number, logo, address, city, country, \
                status, created_at, updated_at\
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        );

        let db = &self.db;
        let id = db
            .run("subsidiaries.create", async {
                let mut conn = db.pool().acquire().await?;
                let query = sqlx::query(&sql)
                    .bind(subsidiary.name.as_str())
                    .bind(subsidiary.tax_id.as_str())
                    .bind(subsidiary.email.as_str())
                    .bind(subsidiary.phone_number.as_str())
                    .bind(subsidiary.logo.as_deref())
                    .bind(subsidiary.address.as_deref())
                    .bind(subsidiary.city.as_deref())
                    .bind(subsidiary.country.as_deref())
                    .bind(to_millis(at))
                    .bind(to_millis(at));

                db.engine()
                    .insert_id(&mut *conn, query)
                    .await
                    .map_err(|e| DbError::from(e).on_conflict("taxId", &subsidiary.tax_id))
            })
            .await?;

        Ok(Subsidiary { id, ..subsidiary })
    }

    /// Gets a subsidiary by ID.
    pub async fn get(&self, id: i64) -> DbResult<Subsidiary> {
        let sql = self
            .db
            .sql(&format!("SELECT {COLUMNS} FROM subsidiaries WHERE id = ?"));

        self.db
            .run("subsidiaries.get", async {
                let row: Option<SubsidiaryRow> = sqlx::query_as(&sql)
                    .bind(id)
                    .fetch_optional(self.db.pool())
                    .await?;
                row.ok_or_else(|| DbError::not_found("Subsidiary", id))?
                    .try_into()
            })
            .await
    }

    /// Lists every subsidiary, active or not, in insertion order.
    pub async fn list(&self) -> DbResult<Vec<Subsidiary>> {
        let sql = format!("SELECT {COLUMNS} FROM subsidiaries ORDER BY id");

        self.db
            .run("subsidiaries.list", async {
                let rows: Vec<SubsidiaryRow> =
                    sqlx::query_as(&sql).fetch_all(self.db.pool()).await?;
                rows.into_iter().map(Subsidiary::try_from).collect()
            })
            .await
    }

    /// Applies the given field changes.
    pub async fn update(&self, id: i64, update: SubsidiaryUpdate) -> DbResult<Subsidiary> {
        validate_subsidiary_update(&update)?;

        debug!(id = %id, "Updating subsidiary");

        let tax_id = trimmed(&update.tax_id);
        let sql = self.db.sql(
            "UPDATE subsidiaries SET \
                name = COALESCE(?, name), \
                tax_id = COALESCE(?, tax_id), \
                email = COALESCE(?, email), \
                phone_number = COALESCE(?, phone_number), \
                logo = COALESCE(?, logo), \
                address = COALESCE(?, address), \
                city = COALESCE(?, city), \
                country = COALESCE(?, country), \
                updated_at = ? \
             WHERE id = ?",
        );

        self.db
            .run("subsidiaries.update", async {
                let result = sqlx::query(&sql)
                    .bind(trimmed(&update.name))
                    .bind(tax_id.clone())
                    .bind(trimmed(&update.email))
                    .bind(trimmed(&update.phone_number))
                    .bind(trimmed(&update.logo))
                    .bind(trimmed(&update.address))
                    .bind(trimmed(&update.city))
                    .bind(trimmed(&update.country))
                    .bind(to_millis(now()))
                    .bind(id)
                    .execute(self.db.pool())
                    .await
                    .map_err(|e| {
                        DbError::from(e).on_conflict("taxId", tax_id.as_deref().unwrap_or(""))
                    })?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("Subsidiary", id));
                }
                Ok(())
            })
            .await?;

        self.get(id).await
    }

    /// Activates or deactivates a subsidiary.
    pub async fn set_status(&self, id: i64, active: bool) -> DbResult<Subsidiary> {
        debug!(id = %id, active, "Setting subsidiary status");

        let sql = self
            .db
            .sql("UPDATE subsidiaries SET status = ?, updated_at = ? WHERE id = ?");

        self.db
            .run("subsidiaries.set_status", async {
                let result = sqlx::query(&sql)
                    .bind(i64::from(active))
                    .bind(to_millis(now()))
                    .bind(id)
                    .execute(self.db.pool())
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("Subsidiary", id));
                }
                Ok(())
            })
            .await?;

        self.get(id).await
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
    async fn test_create_and_get() {
        let db = testing::database().await;
        let created = db
            .subsidiaries()
            .create(NewSubsidiary {
                city: Some("  Lisbon ".to_string()),
                ..testing::subsidiary("Acme Retail", "TX-1")
            })
            .await
            .unwrap();

        assert!(created.id > 0);
        assert!(created.status);

        let fetched = db.subsidiaries().get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.city.as_deref(), Some("Lisbon"));
        assert_eq!(fetched.logo, None);
    }

    #[tokio::test]
    async fn test_duplicate_tax_id_conflicts() {
        let db = testing::database().await;
        let first = db
            .subsidiaries()
            .create(testing::subsidiary("Acme", "TX-1"))
            .await
            .unwrap();

        let err = db
            .subsidiaries()
            .create(testing::subsidiary("Beta", "TX-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Conflict { ref field, ref value } if field == "taxId" && value == "TX-1"
        ));

        let all = db.subsidiaries().list().await.unwrap();
        assert_eq!(all, vec![first]);
    }

    #[tokio::test]
    async fn test_empty_name_writes_nothing() {
        let db = testing::database().await;
        let err = db
            .subsidiaries()
            .create(testing::subsidiary("", "TX-1"))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Validation(_)));
        assert!(db.subsidiaries().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_onto_taken_tax_id() {
        let db = testing::database().await;
        db.subsidiaries().create(testing::subsidiary("Acme", "TX-1")).await.unwrap();
        let beta = db.subsidiaries().create(testing::subsidiary("Beta", "TX-2")).await.unwrap();

        let err = db
            .subsidiaries()
            .update(
                beta.id,
                SubsidiaryUpdate {
                    tax_id: Some("TX-1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let renamed = db
            .subsidiaries()
            .update(
                beta.id,
                SubsidiaryUpdate {
                    name: Some("Beta Foods".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Beta Foods");
        assert_eq!(renamed.tax_id, "TX-2");
    }

    #[tokio::test]
    async fn test_set_status_toggles() {
        let db = testing::database().await;
        let acme = db.subsidiaries().create(testing::subsidiary("Acme", "TX-1")).await.unwrap();

        let disabled = db.subsidiaries().set_status(acme.id, false).await.unwrap();
        assert!(!disabled.status);

        let enabled = db.subsidiaries().set_status(acme.id, true).await.unwrap();
        assert!(enabled.status);

        assert!(matches!(
            db.subsidiaries().set_status(404, true).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
