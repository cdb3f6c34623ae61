//! OS signal handling.
//!
//! SIGINT and SIGTERM stop the synchronizer. The managed proxy is left
//! running; it keeps serving the last applied configuration.

use tokio::signal::unix::{signal, SignalKind};

use crate::lifecycle::Shutdown;

/// Wait for SIGINT or SIGTERM, then fire `shutdown`.
pub async fn forward_shutdown_signals(shutdown: Shutdown) -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = terminate.recv() => tracing::info!("SIGTERM received"),
        _ = interrupt.recv() => tracing::info!("SIGINT received"),
    }

    shutdown.trigger();
    Ok(())
}
