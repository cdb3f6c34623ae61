//! Synchronizer subsystem.
//!
//! # Data Flow
//! ```text
//! update(snapshot)                          [gate held throughout]
//!     → Compiling   pool::compile, log per-app errors
//!     → diff        equal to last applied? → Unchanged, return
//!     → Writing     ProxyControl::write_config
//!     → Validating  ProxyControl::validate
//!     → Reloading   start, reload, or restart if the process is gone
//!     → advance last applied, publish snapshot
//! ```
//!
//! # Design Decisions
//! - One async mutex serializes updates end to end
//! - Last applied only advances after the proxy accepted the change
//! - A write failure fails the update, not the service
//! - Equality is order sensitive: reordered tasks count as a change

pub mod error;
pub mod synchronizer;

pub use error::{SyncError, SyncResult};
pub use synchronizer::{
    Applied, ProxyAction, SyncPhase, SyncSettings, Synchronizer, UpdateOutcome,
};
