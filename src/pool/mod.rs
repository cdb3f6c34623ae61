//! Pool configuration subsystem.
//!
//! # Data Flow
//! ```text
//! Snapshot
//!     → compiler.rs (one PoolOutcome per labelled app)
//!     → labels.rs (typed reads of operator labels)
//!     → fold Ok outcomes into PoolConfiguration (schema.rs)
//!     → Err outcomes surface as diagnostics
//! ```
//!
//! # Design Decisions
//! - Compilation is a pure function of (snapshot, bind host)
//! - Failures are scoped to one application, never the whole snapshot
//! - Absent labels stay absent in the rendered document
//! - Server order follows task order, so equality is order sensitive

pub mod compiler;
pub mod labels;
pub mod schema;

pub use compiler::{compile, compile_outcomes, Compilation, CompileError, PoolOutcome};
pub use schema::{BackendServer, PoolConfiguration, PoolSpec, ServerParseError};
