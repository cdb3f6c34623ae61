//! Pool configuration schema.
//!
//! This module defines the document the managed proxy reads. All types
//! derive Serde traits; the on-disk form is YAML.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every pool the proxy should expose, keyed by pool name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PoolConfiguration {
    pools: BTreeMap<String, PoolSpec>,
}

impl PoolConfiguration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pool, returning the spec it replaced if the name was taken.
    pub fn insert(&mut self, name: impl Into<String>, pool: PoolSpec) -> Option<PoolSpec> {
        self.pools.insert(name.into(), pool)
    }

    /// Look up a pool by name.
    pub fn get(&self, name: &str) -> Option<&PoolSpec> {
        self.pools.get(name)
    }

    /// Iterate pools in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PoolSpec)> {
        self.pools.iter().map(|(name, pool)| (name.as_str(), pool))
    }

    /// Number of pools.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether no pools are configured.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Render the configuration as the YAML document the proxy consumes.
    pub fn to_yaml(&self) -> Result<String, serde_yml::Error> {
        serde_yml::to_string(self)
    }

    /// Parse a configuration previously produced by [`PoolConfiguration::to_yaml`].
    pub fn from_yaml(input: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(input)
    }
}

/// Settings for a single pool (one proxy front end).
///
/// `None` and `false` mean "let the proxy use its own default" and are left
/// out of the rendered document. `auto_eject_hosts` is always written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PoolSpec {
    /// Front end address, `host:port`.
    pub listen: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,

    /// Server response timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,

    /// Listen backlog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backlog: Option<i64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub preconnect: bool,

    /// Speak the redis protocol instead of memcached.
    #[serde(default, skip_serializing_if = "is_false")]
    pub redis: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_connections: Option<i64>,

    #[serde(default)]
    pub auto_eject_hosts: bool,

    /// Milliseconds before an ejected server is retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_retry_timeout: Option<i64>,

    /// Consecutive failures before a server is ejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_failure_limit: Option<i64>,

    #[serde(default)]
    pub servers: Vec<BackendServer>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One backend server entry, written as `host:port:weight name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct BackendServer {
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub name: String,
}

impl BackendServer {
    /// Create a server entry with the fixed weight of 1.
    pub fn new(host: impl Into<String>, port: u16, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            weight: 1,
            name: name.into(),
        }
    }
}

impl fmt::Display for BackendServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{} {}", self.host, self.port, self.weight, self.name)
    }
}

/// Error returned when a server entry string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid server entry {input:?}: {reason}")]
pub struct ServerParseError {
    pub input: String,
    pub reason: &'static str,
}

impl FromStr for BackendServer {
    type Err = ServerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ServerParseError {
            input: s.to_string(),
            reason,
        };

        let (address, name) = s.split_once(' ').unwrap_or((s, ""));

        // Host may itself contain colons (IPv6), so peel weight and port off the right.
        let mut parts = address.rsplitn(3, ':');
        let weight = parts.next().ok_or_else(|| err("missing weight"))?;
        let port = parts.next().ok_or_else(|| err("missing port"))?;
        let host = parts.next().ok_or_else(|| err("missing host"))?;

        if host.is_empty() {
            return Err(err("empty host"));
        }

        Ok(Self {
            host: host.to_string(),
            port: port.parse().map_err(|_| err("port is not a valid number"))?,
            weight: weight.parse().map_err(|_| err("weight is not a valid number"))?,
            name: name.to_string(),
        })
    }
}

impl From<BackendServer> for String {
    fn from(server: BackendServer) -> Self {
        server.to_string()
    }
}

impl TryFrom<String> for BackendServer {
    type Error = ServerParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
