//! Shared application state.

use std::sync::Arc;

use hq_db::{ConnectionSlot, Database, SessionStore};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// State handed to every handler. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    slot: ConnectionSlot,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(slot: ConnectionSlot, sessions: Arc<dyn SessionStore>, config: ApiConfig) -> Self {
        AppState {
            slot,
            sessions,
            config: Arc::new(config),
        }
    }

    /// The database handle; `503` until the connection is established.
    pub fn db(&self) -> Result<Database, ApiError> {
        Ok(self.slot.get()?)
    }

    pub fn slot(&self) -> &ConnectionSlot {
        &self.slot
    }
}
