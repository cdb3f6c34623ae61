//! HTTP subsystem: the state delivery endpoint.
//!
//! # Data Flow
//! ```text
//! state feed
//!     → PUT /v1/state (JSON Snapshot)
//!     → handlers.rs → Synchronizer::update
//!     → {"changed": bool} or {"error": ...}
//!
//! operators
//!     → GET /v1/pools, GET /v1/status (lock-free reads)
//! ```

pub mod handlers;
pub mod server;

pub use server::{build_router, HttpServer};
