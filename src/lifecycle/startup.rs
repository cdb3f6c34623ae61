//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize metrics when enabled
//! - Build the proxy driver and the synchronizer
//! - Bind the state delivery listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The proxy is not started here; the first update starts it

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::SyncConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::proxy::{Nutcracker, ProcessExit, ProxyControl};
use crate::sync::{SyncSettings, Synchronizer};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid {field}: {value:?}")]
    Address { field: &'static str, value: String },

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the synchronizer until SIGINT/SIGTERM.
pub async fn run(config: SyncConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr = parse_addr("observability.metrics_address", &config.observability.metrics_address)?;
        metrics::init_metrics(addr)?;
    }

    let proxy = Nutcracker::new(
        config.proxy.binary.clone(),
        Duration::from_secs(config.proxy.validate_timeout_secs),
    );
    let shutdown = Shutdown::new();
    let exits = proxy.supervisor().subscribe_exits();

    let sync = Arc::new(Synchronizer::new(SyncSettings::from(&config.proxy), proxy));
    tokio::spawn(track_exits(sync.clone(), exits, shutdown.subscribe()));

    let addr = parse_addr("listener.bind_address", &config.listener.bind_address)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::info!(
        listen = %addr,
        config_path = %config.proxy.config_path.display(),
        bind_host = %config.proxy.bind_host,
        binary = %config.proxy.binary,
        "Synchronizer ready"
    );

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signals::forward_shutdown_signals(signal_shutdown).await {
            tracing::error!(error = %e, "Failed to install signal handlers");
        }
    });

    HttpServer::new(sync)
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}

/// Drop exited proxy processes from the synchronizer until `stop` fires.
///
/// Subscribe to `exits` before the first update so no exit is missed.
pub async fn track_exits<P: ProxyControl>(
    sync: Arc<Synchronizer<P>>,
    mut exits: broadcast::Receiver<ProcessExit>,
    mut stop: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            exit = exits.recv() => match exit {
                Ok(exit) => {
                    if sync.forget_process(exit.pid).await && !exit.success() {
                        tracing::warn!(
                            pid = %exit.pid,
                            "Proxy is down, it will be started on the next changed update"
                        );
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Missed proxy exit reports");
                }
                Err(RecvError::Closed) => break,
            },
            _ = stop.recv() => break,
        }
    }
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        field,
        value: value.to_string(),
    })
}
