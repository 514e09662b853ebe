//! Safety API server lifecycle.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::api::router::safety_api_router;
use crate::safety::DefaultSafetyEngine;

/// Handle to a running API server.
pub struct SafetyApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl SafetyApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Safety API server shutdown signal sent");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

impl Drop for SafetyApiServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Bind `addr` (port 0 picks an ephemeral port), mount the safety router and
/// spawn the axum server in a background tokio task.
pub async fn start_server(
    engine: Arc<DefaultSafetyEngine>,
    addr: SocketAddr,
) -> Result<SafetyApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind safety API server: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = safety_api_router(engine);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Safety API server received shutdown signal");
        };

        tracing::info!(%addr, "Safety API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Safety API server error: {e}");
        }

        tracing::info!("Safety API server stopped");
    });

    Ok(SafetyApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}
