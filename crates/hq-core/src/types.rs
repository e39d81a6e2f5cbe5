//! # Domain Types
//!
//! Entities shared by the storage layer and the REST API.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐        ┌─────────────────┐                         │
//! │  │   Subsidiary    │ 1    * │      User       │  role: Role             │
//! │  │  tax_id (uniq)  │◄───────│  subsidiary_id? │  mhc_admin → no sub     │
//! │  │  status         │        └─────────────────┘                         │
//! │  └────────┬────────┘                                                    │
//! │         1 │ *                                                           │
//! │  ┌────────▼────────┐ 1    * ┌─────────────────┐                         │
//! │  │ InventoryItem   │◄───────│      Sale       │  append-only            │
//! │  │  quantity ≥ 0   │        │ quantity × price│                         │
//! │  └─────────────────┘        └─────────────────┘                         │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │  ActivityLog    │  append-only audit trail, subsidiary optional      │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ids are database-assigned integers. Every `New*` type is the input of a
//! create operation, every `*Update` type carries optional field changes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// Authorization role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Main head company administrator, sees every subsidiary.
    MhcAdmin,
    /// Administrator of one subsidiary.
    SubsidiaryAdmin,
    /// Staff member of one subsidiary.
    Staff,
}

impl Role {
    /// The persisted / wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::MhcAdmin => "mhc_admin",
            Role::SubsidiaryAdmin => "subsidiary_admin",
            Role::Staff => "staff",
        }
    }

    /// Whether users with this role must belong to a subsidiary.
    pub const fn requires_subsidiary(&self) -> bool {
        !matches!(self, Role::MhcAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mhc_admin" => Ok(Role::MhcAdmin),
            "subsidiary_admin" => Ok(Role::SubsidiaryAdmin),
            "staff" => Ok(Role::Staff),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    /// argon2 PHC string. Never leaves the backend.
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    /// `None` only for `mhc_admin`.
    pub subsidiary_id: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether this user may act inside the given subsidiary.
    pub fn belongs_to(&self, subsidiary_id: i64) -> bool {
        self.subsidiary_id == Some(subsidiary_id)
    }
}

/// Input for creating a user. The password is plain text and hashed by the
/// storage layer before it is written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub subsidiary_id: Option<i64>,
}

/// Changes to an existing user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: Option<String>,
    /// New plain-text password.
    pub password: Option<String>,
}

// =============================================================================
// Subsidiary
// =============================================================================

/// A subsidiary company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Subsidiary {
    pub id: i64,
    pub name: String,
    /// Globally unique tax identifier.
    pub tax_id: String,
    pub email: String,
    pub phone_number: String,
    /// Path or URL of the uploaded logo.
    pub logo: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// `true` when active. Subsidiaries are disabled, never deleted.
    pub status: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a subsidiary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSubsidiary {
    pub name: String,
    pub tax_id: String,
    pub email: String,
    pub phone_number: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Changes to an existing subsidiary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SubsidiaryUpdate {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub logo: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

// =============================================================================
// Inventory
// =============================================================================

/// A stocked item owned by one subsidiary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: i64,
    pub subsidiary_id: i64,
    pub name: String,
    /// Units in stock. Never negative.
    pub quantity: i64,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Stock value at sale price.
    pub fn stock_value(&self) -> Money {
        self.sale_price().multiply_quantity(self.quantity)
    }
}

/// Input for creating an inventory item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    pub subsidiary_id: i64,
    pub name: String,
    pub quantity: i64,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
}

/// Changes to an existing inventory item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdate {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub cost_price_cents: Option<i64>,
    pub sale_price_cents: Option<i64>,
}

// =============================================================================
// Sale
// =============================================================================

/// A point-in-time sale of one inventory item. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: i64,
    pub subsidiary_id: i64,
    pub item_id: i64,
    pub user_id: i64,
    pub quantity: i64,
    /// Unit price charged, frozen at the time of sale.
    pub sale_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Transaction value: quantity × unit price. Not stored.
    #[inline]
    pub fn total(&self) -> Money {
        self.sale_price().multiply_quantity(self.quantity)
    }
}

/// Input for recording a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub subsidiary_id: i64,
    pub item_id: i64,
    pub user_id: i64,
    pub quantity: i64,
    /// Defaults to the item's current sale price.
    #[serde(default)]
    pub sale_price_cents: Option<i64>,
    /// Defaults to now.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Activity Log
// =============================================================================

/// An append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: i64,
    pub subsidiary_id: Option<i64>,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for recording an activity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub subsidiary_id: Option<i64>,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: String,
}

impl NewActivity {
    pub fn new(action: impl Into<String>, details: impl Into<String>) -> Self {
        NewActivity {
            subsidiary_id: None,
            user_id: None,
            action: action.into(),
            details: details.into(),
        }
    }

    pub fn subsidiary(mut self, subsidiary_id: i64) -> Self {
        self.subsidiary_id = Some(subsidiary_id);
        self
    }

    pub fn by(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

// =============================================================================
// Session
// =============================================================================

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque random token carried in the session cookie.
    pub id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
