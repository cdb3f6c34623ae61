//! twemproxy pool synchronizer.
//!
//! Compiles cluster state snapshots into twemproxy pool configuration,
//! writes and validates it, and starts or reloads the proxy when it changes.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pool;
pub mod proxy;
pub mod state;
pub mod sync;

pub use config::SyncConfig;
pub use pool::{PoolConfiguration, PoolSpec};
pub use proxy::{Nutcracker, ProxyControl};
pub use state::Snapshot;
pub use sync::{Synchronizer, UpdateOutcome};
