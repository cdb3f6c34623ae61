//! Cluster state subsystem.
//!
//! # Data Flow
//! ```text
//! state feed (JSON snapshot, pushed wholesale)
//!     → types.rs (Snapshot → Application → Task)
//!     → handed to the synchronizer as one immutable value
//! ```
//!
//! # Design Decisions
//! - Snapshots are complete, never deltas
//! - Applications are keyed by id in a BTreeMap so iteration is stable
//! - Missing lists and maps deserialize as empty

pub mod types;

pub use types::{Application, Snapshot, Task};
