//! # parley-server
//!
//! Realtime direct-message server.
//!
//! This binary provides:
//! - **REST API** (axum) for the sidebar, conversations, sending and
//!   seen-marking
//! - **Live socket** pushing new messages and the online user list to every
//!   connected client
//! - **Presence registry** mapping each online user to its current connection

mod accounts;
mod api;
mod config;
mod dispatcher;
mod error;
mod lifecycle;
mod presence;
mod store;
mod unseen;
mod ws;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parley_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::lifecycle::LifecycleManager;
use crate::presence::PresenceRegistry;

/// Pending connect/disconnect events before sockets wait on the manager.
const LIFECYCLE_QUEUE: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,parley_server=debug")),
        )
        .init();

    info!("Starting Parley server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database (runs pending migrations)
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Database::open_at(path)?
        }
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database ready");
    }
    let db = Arc::new(Mutex::new(db));

    // -----------------------------------------------------------------------
    // 4. Presence registry and the connection lifecycle manager
    // -----------------------------------------------------------------------
    let presence = PresenceRegistry::new();
    let (lifecycle, lifecycle_task) = LifecycleManager::spawn(presence.clone(), LIFECYCLE_QUEUE);

    let http_addr = config.http_addr;
    let app_state = AppState::new(config, db, presence, lifecycle);

    // -----------------------------------------------------------------------
    // 5. Run the HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    lifecycle_task.abort();
    Ok(())
}
