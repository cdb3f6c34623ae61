//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SyncConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::SyncConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("proxy.config_path must be set")]
    MissingConfigPath,

    #[error("proxy.binary must be set")]
    MissingBinary,

    #[error("proxy.bind_host must be set")]
    MissingBindHost,

    #[error("proxy.validate_timeout_secs must be greater than zero")]
    ZeroValidateTimeout,

    #[error("{field} is not a socket address: {value:?}")]
    BadAddress { field: &'static str, value: String },
}

pub fn validate_config(config: &SyncConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.proxy.config_path.as_os_str().is_empty() {
        errors.push(ValidationError::MissingConfigPath);
    }
    if config.proxy.binary.trim().is_empty() {
        errors.push(ValidationError::MissingBinary);
    }
    if config.proxy.bind_host.trim().is_empty() {
        errors.push(ValidationError::MissingBindHost);
    }
    if config.proxy.validate_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValidateTimeout);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
