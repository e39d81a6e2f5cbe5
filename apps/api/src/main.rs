//! # HQ API Server
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load config ──► bind listener ──► serve                                │
//! │                        │                                                │
//! │                        ├──► connect task ──► slot.install / slot.fail   │
//! │                        │                                                │
//! │                        └──► bootstrap task ── waits for slot.ready() ──►│
//! │                                                ensure_default_admin     │
//! │                                                                         │
//! │  Requests before the database is up get 503. A failed connection       │
//! │  shuts the server down with a non-zero exit.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hq_api::{router, ApiConfig, AppState};
use hq_db::bootstrap::generate_password;
use hq_db::{ensure_default_admin, session_store_for, BootstrapOutcome, ConnectionSlot, Database};

/// How often expired sessions are swept.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("Starting HQ API server...");

    let config = ApiConfig::load().context("invalid configuration")?;
    info!(
        addr = %config.bind_addr,
        engine = %config.db.engine,
        host = %config.db.host,
        database = %config.db.database,
        "Configuration loaded"
    );

    let slot = ConnectionSlot::new();
    let sessions = session_store_for(config.db.engine, slot.clone());

    spawn_connect(slot.clone(), &config);
    spawn_bootstrap(slot.clone(), config.admin_password.clone());
    spawn_session_purge(slot.clone(), sessions.clone());

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Listening");

    let state = AppState::new(slot.clone(), sessions, config);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(slot.clone()))
        .await
        .context("server error")?;

    if let Ok(db) = slot.get() {
        db.close().await;
    } else if slot.is_resolved() {
        // Resolved without a database: the connection failed.
        anyhow::bail!("database connection failed");
    }

    info!("Server shutdown complete");
    Ok(())
}

fn spawn_connect(slot: ConnectionSlot, config: &ApiConfig) {
    let db_config = config.db.clone();
    tokio::spawn(async move {
        match Database::connect(db_config).await {
            Ok(db) => {
                info!(engine = %db.kind(), "Database ready");
                slot.install(db);
            }
            Err(e) => {
                error!(error = %e, "Database connection failed");
                slot.fail(e.to_string());
            }
        }
    });
}

fn spawn_bootstrap(slot: ConnectionSlot, configured: Option<String>) {
    tokio::spawn(async move {
        let Ok(db) = slot.ready().await else {
            return;
        };

        let generated = configured.is_none();
        let password = configured.unwrap_or_else(generate_password);

        match ensure_default_admin(&db, &password).await {
            Ok(BootstrapOutcome::Created) if generated => {
                warn!(
                    username = hq_core::DEFAULT_ADMIN_USERNAME,
                    password = %password,
                    "Created default admin with a generated password; change it after first login"
                );
            }
            Ok(BootstrapOutcome::Created) => info!("Created default admin"),
            Ok(BootstrapOutcome::AlreadyPresent) => info!("Default admin already present"),
            Err(e) => error!(error = %e, "Default admin bootstrap failed"),
        }
    });
}

fn spawn_session_purge(slot: ConnectionSlot, sessions: std::sync::Arc<dyn hq_db::SessionStore>) {
    tokio::spawn(async move {
        if slot.ready().await.is_err() {
            return;
        }

        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Purged expired sessions"),
                Err(e) => warn!(error = %e, "Session purge failed"),
            }
        }
    });
}

/// Resolves on Ctrl+C, SIGTERM, or a failed database connection.
async fn shutdown_signal(slot: ConnectionSlot) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let connection_failed = async {
        if slot.ready().await.is_ok() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Shutdown signal received, starting graceful shutdown..."),
        _ = terminate => info!("Shutdown signal received, starting graceful shutdown..."),
        _ = connection_failed => error!("Shutting down: database unavailable"),
    }
}
