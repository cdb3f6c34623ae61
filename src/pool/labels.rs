//! Application labels that drive pool settings.
//!
//! Only `twemproxy_pool` is required; its absence keeps an application out
//! of the proxy entirely. Every other label is optional.

use std::collections::HashMap;
use std::num::ParseIntError;

/// Name of the pool the application should be exposed as.
pub const POOL: &str = "twemproxy_pool";

pub const HASH: &str = "twemproxy_hash";
pub const HASH_TAG: &str = "twemproxy_hash_tag";
pub const DISTRIBUTION: &str = "twemproxy_distribution";
pub const TIMEOUT: &str = "twemproxy_timeout";
pub const BACKLOG: &str = "twemproxy_backlog";
pub const PRECONNECT: &str = "twemproxy_preconnect";
pub const REDIS: &str = "twemproxy_redis";
pub const SERVER_CONNECTIONS: &str = "twemproxy_server_connections";
pub const AUTO_EJECT_HOSTS: &str = "twemproxy_auto_eject_hosts";
pub const SERVER_RETRY_TIMEOUT: &str = "twemproxy_server_retry_timeout";
pub const SERVER_FAILURE_LIMIT: &str = "twemproxy_server_failure_limit";

/// A label that was present but did not hold an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedLabel {
    pub label: &'static str,
    pub value: String,
    pub source: ParseIntError,
}

/// Read an integer label. Absent or `0` → `Ok(None)`, unparsable → `Err`.
///
/// Zero means "use the proxy default", so it is never passed through as an
/// explicit override.
pub fn int_label(
    labels: &HashMap<String, String>,
    label: &'static str,
) -> Result<Option<i64>, MalformedLabel> {
    let Some(value) = labels.get(label) else {
        return Ok(None);
    };

    let parsed: i64 = value.parse().map_err(|source| MalformedLabel {
        label,
        value: value.clone(),
        source,
    })?;
    Ok(Some(parsed).filter(|v| *v != 0))
}

/// Read a string label verbatim.
pub fn string_label(labels: &HashMap<String, String>, label: &str) -> Option<String> {
    labels.get(label).cloned()
}

/// Read a boolean label. Only `"true"` and `"1"` count as set.
pub fn bool_label(labels: &HashMap<String, String>, label: &str) -> bool {
    matches!(labels.get(label).map(String::as_str), Some("true" | "1"))
}
