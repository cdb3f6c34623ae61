//! Configuration schema definitions.
//!
//! This module defines the settings of the synchronizer itself (not the
//! pool document it writes for the proxy). All types derive Serde traits
//! for deserialization from a TOML settings file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the synchronizer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Managed proxy settings.
    pub proxy: ProxyConfig,

    /// State delivery endpoint.
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// How to run and configure the managed proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy executable, looked up on `PATH` when not absolute.
    pub binary: String,

    /// Where the generated pool configuration is written.
    pub config_path: PathBuf,

    /// Host every pool listens on.
    pub bind_host: String,

    /// Extra arguments appended when starting the proxy.
    pub extra_args: Vec<String>,

    /// Deadline for `<binary> -t` in seconds.
    pub validate_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            binary: "nutcracker".to_string(),
            config_path: PathBuf::new(),
            bind_host: "127.0.0.1".to_string(),
            extra_args: Vec::new(),
            validate_timeout_secs: 10,
        }
    }
}

/// Listener for state deliveries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:7676").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:7676".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
