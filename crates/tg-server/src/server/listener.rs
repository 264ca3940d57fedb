//! Admin HTTP listener
//!
//! Binds the admin address and serves the admin router until shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::server::handler::admin_routes;
use crate::state::GatewayState;

/// HTTP server for operator requests
pub struct AdminServer {
    /// Shared gateway state
    state: Arc<GatewayState>,
    /// Cancellation token for graceful shutdown
    cancel: CancellationToken,
}

impl AdminServer {
    /// Create a new admin server
    pub fn new(state: Arc<GatewayState>, cancel: CancellationToken) -> Self {
        Self { state, cancel }
    }

    /// Run the admin server until the cancellation token fires
    pub async fn run(&self, bind_addr: &str) -> Result<()> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;

        let local_addr = listener.local_addr()?;
        tracing::info!("Admin gateway listening on {}", local_addr);

        let app = admin_routes(Arc::clone(&self.state));
        let cancel = self.cancel.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Admin gateway shutting down");
            })
            .await
            .context("Admin gateway failed")?;

        Ok(())
    }
}
