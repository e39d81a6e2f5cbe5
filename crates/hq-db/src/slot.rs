//! # Connection Slot
//!
//! Holds the database handle for consumers that start before the
//! connection exists, such as the HTTP server.
//!
//! ```text
//!            install(db)
//!   Pending ─────────────► Ready(db)      get() → Ok(db)
//!      │
//!      │     fail(reason)
//!      └─────────────────► Failed(reason) get() → ConnectionFailed
//!
//!   get() while Pending → NotConnected
//!   ready().await       → resolves on the first transition
//! ```

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{DbError, DbResult};
use crate::pool::Database;

#[derive(Debug, Clone)]
enum SlotState {
    Pending,
    Ready(Database),
    Failed(String),
}

/// Shared, late-initialized database handle.
#[derive(Debug, Clone)]
pub struct ConnectionSlot {
    tx: Arc<watch::Sender<SlotState>>,
    rx: watch::Receiver<SlotState>,
}

impl ConnectionSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(SlotState::Pending);
        ConnectionSlot {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Creates a slot that is already ready.
    pub fn ready_with(db: Database) -> Self {
        let slot = Self::new();
        slot.install(db);
        slot
    }

    /// Publishes a connected database to every holder of the slot.
    pub fn install(&self, db: Database) {
        self.tx.send_replace(SlotState::Ready(db));
    }

    /// Records a failed initialization.
    pub fn fail(&self, reason: impl Into<String>) {
        self.tx.send_replace(SlotState::Failed(reason.into()));
    }

    /// Returns the handle, or why there is none yet.
    pub fn get(&self) -> DbResult<Database> {
        match &*self.rx.borrow() {
            SlotState::Ready(db) => Ok(db.clone()),
            SlotState::Pending => Err(DbError::NotConnected),
            SlotState::Failed(reason) => Err(DbError::ConnectionFailed(reason.clone())),
        }
    }

    /// Whether initialization has finished, successfully or not.
    pub fn is_resolved(&self) -> bool {
        !matches!(&*self.rx.borrow(), SlotState::Pending)
    }

    /// Waits until initialization resolves and returns its outcome.
    pub async fn ready(&self) -> DbResult<Database> {
        let mut rx = self.rx.clone();
        // The sender lives as long as any slot clone, including this one.
        let _ = rx
            .wait_for(|state| !matches!(state, SlotState::Pending))
            .await;
        self.get()
    }
}

impl Default for ConnectionSlot {
    fn default() -> Self {
        Self::new()
    }
}
