//! # hq-core: Pure Domain Logic for HQ
//!
//! Entities, roles, validation and money math for the subsidiary management
//! backend. Nothing in this crate touches a database or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          HQ Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React SPA)                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST (JSON / CSV)                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    hq-api (axum routes + guards)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ hq-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  report   │  │ validation│  │   │
//! │  │   │ Subsidiary│  │   Money   │  │  Window   │  │   rules   │  │   │
//! │  │   │ Sale ...  │  │           │  │ TimeRange │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               hq-db (PostgreSQL | MySQL | SQLite)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities and their create/update inputs
//! - [`money`] - Integer-cent money type
//! - [`report`] - Report windows resolved to time ranges
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation run before any database round-trip

pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use report::{ReportKind, ReportWindow, TimeRange};
pub use types::*;

/// Username of the account created by the default admin bootstrap.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Minimum accepted password length for user accounts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Largest stock level or sale quantity accepted.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Largest unit price accepted, in cents. With [`MAX_QUANTITY`] the product
/// stays below `i64::MAX`.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;
