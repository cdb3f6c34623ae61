//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the state delivery handlers
//! - Wire up middleware (tracing, body limit)
//! - Serve until the shutdown signal fires

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::http::handlers::{get_pools, get_status, put_state};
use crate::proxy::ProxyControl;
use crate::sync::Synchronizer;

/// Snapshots of large clusters easily exceed axum's 2 MiB default.
const MAX_SNAPSHOT_BYTES: usize = 64 * 1024 * 1024;

/// Build the router serving the synchronizer.
pub fn build_router<P: ProxyControl>(sync: Arc<Synchronizer<P>>) -> Router {
    Router::new()
        .route("/v1/state", put(put_state::<P>))
        .route("/v1/pools", get(get_pools::<P>))
        .route("/v1/status", get(get_status::<P>))
        .with_state(sync)
        .layer(DefaultBodyLimit::max(MAX_SNAPSHOT_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// HTTP front end of the synchronizer.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new<P: ProxyControl>(sync: Arc<Synchronizer<P>>) -> Self {
        Self {
            router: build_router(sync),
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
