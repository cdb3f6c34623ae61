//! Errors raised while talking to the managed proxy.

use std::path::PathBuf;

use thiserror::Error;

use crate::proxy::supervisor::ProcessId;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The pool configuration could not be rendered.
    #[error("failed to render config: {0}")]
    Render(#[from] serde_yml::Error),

    /// The rendered configuration could not be written to disk.
    #[error("failed to write config to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The validation command could not be run at all.
    #[error("failed to run {binary} in test mode: {source}")]
    Validate {
        binary: String,
        source: std::io::Error,
    },

    /// The proxy rejected the configuration.
    #[error("config rejected (exit code {code:?}): {output}")]
    Invalid { code: Option<i32>, output: String },

    /// The validation command did not finish in time.
    #[error("config validation timed out after {secs}s")]
    ValidateTimeout { secs: u64 },

    /// The proxy process could not be launched.
    #[error("failed to start {binary}: {source}")]
    Start {
        binary: String,
        source: std::io::Error,
    },

    /// The tracked process is gone.
    #[error("no such process: {pid}")]
    NoSuchProcess { pid: ProcessId },

    /// Signalling the tracked process failed for another reason.
    #[error("failed to signal process {pid}: {source}")]
    Signal {
        pid: ProcessId,
        source: nix::errno::Errno,
    },
}

pub type ProxyResult<T> = Result<T, ProxyError>;
