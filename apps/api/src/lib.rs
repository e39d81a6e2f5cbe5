//! # hq-api: REST Server for HQ
//!
//! axum layer over [`hq_db`]: cookie sessions, role guards and JSON / CSV
//! responses for the subsidiary management frontend.
//!
//! ## Modules
//!
//! - [`config`] - Server settings from the environment
//! - [`state`] - Shared handler state
//! - [`auth`] - `CurrentUser` extractor and role guards
//! - [`error`] - `ApiError` and its HTTP mapping
//! - [`report`] - Report rows and CSV rendering
//! - [`routes`] - The router

pub mod auth;
pub mod config;
pub mod error;
pub mod report;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
