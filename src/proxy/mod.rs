//! Managed proxy subsystem.
//!
//! # Data Flow
//! ```text
//! PoolConfiguration
//!     → writer.rs (render YAML, overwrite config path)
//!     → validator.rs (`<binary> -t -c <path>`)
//!     → supervisor.rs (start, or SIGUSR1 to reload)
//! ```
//!
//! # Design Decisions
//! - `ProxyControl` is the only seam the synchronizer sees
//! - `Nutcracker` is the production implementation; tests swap in a fake
//! - Validation runs under a deadline, start and reload return immediately

pub mod error;
pub mod supervisor;
pub mod validator;
pub mod writer;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

pub use error::{ProxyError, ProxyResult};
pub use supervisor::{ProcessExit, ProcessId, ProcessSupervisor};

use crate::pool::PoolConfiguration;

/// Everything the synchronizer needs from the outside world.
pub trait ProxyControl: Send + Sync + 'static {
    /// Persist `pools` at `path`, replacing whatever was there.
    fn write_config(
        &self,
        path: &Path,
        pools: &PoolConfiguration,
    ) -> impl Future<Output = ProxyResult<()>> + Send;

    /// Run the proxy's offline check against the file at `path`.
    fn validate(&self, path: &Path) -> impl Future<Output = ProxyResult<()>> + Send;

    /// Launch a new proxy process reading `path`.
    fn start(
        &self,
        path: &Path,
        extra_args: &[String],
    ) -> impl Future<Output = ProxyResult<ProcessId>> + Send;

    /// Signal a running proxy to reload.
    ///
    /// Must return [`ProxyError::NoSuchProcess`] when `pid` no longer exists.
    fn reload(&self, pid: ProcessId) -> impl Future<Output = ProxyResult<()>> + Send;
}

/// twemproxy (`nutcracker`) driven through its command line and signals.
#[derive(Debug, Clone)]
pub struct Nutcracker {
    supervisor: ProcessSupervisor,
    validate_timeout: Duration,
}

impl Nutcracker {
    pub fn new(binary: impl Into<String>, validate_timeout: Duration) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(binary),
            validate_timeout,
        }
    }

    /// The supervisor, for subscribing to process exits.
    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }
}

impl ProxyControl for Nutcracker {
    async fn write_config(&self, path: &Path, pools: &PoolConfiguration) -> ProxyResult<()> {
        writer::write_config(path, pools).await
    }

    async fn validate(&self, path: &Path) -> ProxyResult<()> {
        validator::validate_config(self.supervisor.binary(), path, self.validate_timeout).await
    }

    async fn start(&self, path: &Path, extra_args: &[String]) -> ProxyResult<ProcessId> {
        self.supervisor.start(path, extra_args)
    }

    async fn reload(&self, pid: ProcessId) -> ProxyResult<()> {
        self.supervisor.reload(pid)
    }
}
