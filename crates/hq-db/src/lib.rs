//! # hq-db: Database Layer for HQ
//!
//! Storage for the subsidiary management backend over PostgreSQL or MySQL,
//! chosen at startup. SQLite serves development and tests.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          HQ Data Flow                                   │
//! │                                                                         │
//! │  HTTP handler (hq-api)                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      hq-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐   ┌────────────────┐   ┌──────────────────┐  │   │
//! │  │  │ ConnectionSlot│   │  Repositories  │   │  Engine          │  │   │
//! │  │  │  (slot.rs)    │   │  users         │   │  postgres        │  │   │
//! │  │  │      │        │   │  subsidiaries  │   │  mysql           │  │   │
//! │  │  │  Database     │◄──│  inventory     │──►│  sqlite          │  │   │
//! │  │  │  (pool.rs)    │   │  sales (tx)    │   │  + migrations    │  │   │
//! │  │  └──────────────┘   │  activity      │   └──────────────────┘  │   │
//! │  │                     │  reports       │                          │   │
//! │  │  SessionStore       └────────────────┘   ensure_default_admin   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PostgreSQL │ MySQL │ SQLite                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Engine selection and connection settings from the environment
//! - [`engine`] - Per-engine SQL dialect, insert ids and migrations
//! - [`pool`] - Connection pool and the timeout/logging choke point
//! - [`slot`] - Late-initialized handle for consumers that start first
//! - [`repository`] - Repository implementations, including the sale transaction
//! - [`session`] - Session stores
//! - [`bootstrap`] - Default admin account
//! - [`password`] - argon2 hashing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hq_db::{Database, DbConfig};
//!
//! let db = Database::connect(DbConfig::from_env()?).await?;
//! let items = db.inventory().list_by_subsidiary(3).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod password;
pub mod pool;
pub mod repository;
pub mod session;
pub mod slot;

// =============================================================================
// Re-exports
// =============================================================================

pub use bootstrap::{ensure_default_admin, BootstrapOutcome};
pub use config::{ConfigError, DbConfig, EngineKind};
pub use error::{DbError, DbResult};
pub use pool::Database;
pub use session::{session_store_for, DbSessionStore, MemorySessionStore, SessionStore, SESSION_COOKIE};
pub use slot::ConnectionSlot;

// Repository re-exports for convenience
pub use repository::activity::ActivityRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::subsidiary::SubsidiaryRepository;
pub use repository::user::UserRepository;
