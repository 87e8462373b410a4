//! HTTP service for an anonymous message wall.
//!
//! Visitors are identified by a signed cookie minted on first contact
//! (`notewall-protocol`). Posting is throttled per visitor by a sliding
//! window limiter whose ledger is swept in the background
//! (`notewall-state`). Track search goes through a token-caching catalog
//! client (`notewall-catalog`). Notes themselves are kept by a
//! [`store::MessageStore`]; the bundled one lives in memory.

pub mod config;
pub mod error;
pub mod message;
pub mod routes;
pub mod state;
pub mod store;
pub mod visitor;

use std::sync::Arc;

use anyhow::Context;
use notewall_state::Reclaimer;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
pub use store::{MemoryStore, MessageStore};

/// Serve until Ctrl+C or SIGTERM, then stop the ledger sweep.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let store: Arc<dyn MessageStore> = Arc::new(MemoryStore::new());
    let state = AppState::from_config(&config, store)?;

    let reclaimer = Reclaimer::from_limiter(state.limiter.clone()).spawn();

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        production = config.production,
        "Notewall listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reclaimer.shutdown().await;
    tracing::info!("Notewall stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
