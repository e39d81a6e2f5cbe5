//! # Repository Module
//!
//! One repository per entity, all obtained from [`Database`](crate::Database).
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Route handler                                                          │
//! │       │  db.inventory().list_by_subsidiary(3)                           │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                    │
//! │  ├── validate input (hq-core)       ← before any round-trip             │
//! │  ├── db.sql("... WHERE subsidiary_id = ?")                              │
//! │  └── db.run("inventory.list_by_subsidiary", query)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Row struct (i64 millis, i64 flags) ──► domain type (DateTime, bool)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Accounts and password hashes
//! - [`SubsidiaryRepository`](subsidiary::SubsidiaryRepository) - Subsidiaries, soft disable
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stocked items
//! - [`SaleRepository`](sale::SaleRepository) - The atomic sale transaction
//! - [`ActivityRepository`](activity::ActivityRepository) - Audit trail
//! - [`ReportRepository`](report::ReportRepository) - Time-windowed reads

pub mod activity;
pub mod inventory;
pub mod report;
pub mod sale;
pub mod subsidiary;
pub mod user;

use chrono::{DateTime, Utc};

use crate::error::{DbError, DbResult};

/// Converts a timestamp to its stored form.
#[inline]
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Converts a stored timestamp back.
pub(crate) fn from_millis(millis: i64) -> DbResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DbError::Storage(format!("timestamp out of range: {millis}")))
}

/// Current time at the precision timestamps are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
