//! Update failures returned to the state feed.

use thiserror::Error;

use crate::proxy::ProxyError;

/// Why an update was aborted. The last applied configuration is never
/// advanced when one of these is returned.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Rendering or persisting the configuration failed.
    #[error("failed to write config: {0}")]
    ConfigWriteFailed(#[source] ProxyError),

    /// The proxy rejected the freshly written configuration. The file on
    /// disk still holds the rejected content.
    #[error("config is invalid: {0}")]
    ConfigInvalid(#[source] ProxyError),

    /// Signalling the running proxy failed for a reason other than the
    /// process being gone.
    #[error("failed to reload proxy: {0}")]
    ReloadFailed(#[source] ProxyError),

    /// Launching the proxy failed.
    #[error("failed to start proxy: {0}")]
    ProcessStartFailed(#[source] ProxyError),
}

impl SyncError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::ConfigWriteFailed(_) => "write_failed",
            SyncError::ConfigInvalid(_) => "invalid",
            SyncError::ReloadFailed(_) => "reload_failed",
            SyncError::ProcessStartFailed(_) => "start_failed",
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
