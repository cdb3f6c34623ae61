//! Snapshot → pool configuration compiler.
//!
//! # Responsibilities
//! - Select applications carrying the pool label
//! - Build one `PoolSpec` per selected application
//! - Report per-application failures without failing the whole snapshot
//!
//! Pure: no I/O, no process interaction.

use thiserror::Error;

use crate::pool::labels::{self, MalformedLabel};
use crate::pool::schema::{BackendServer, PoolConfiguration, PoolSpec};
use crate::state::{Application, Snapshot};

/// Why a single application could not be turned into a pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The application has no service port to listen on.
    #[error("app {app} has no ports assigned")]
    MissingPorts { app: String },

    /// One of the application's tasks has no host port.
    #[error("task {task} of app {app} has zero ports")]
    MissingTaskPorts { app: String, task: String },

    /// One of the application's tasks has no host to reach it on.
    #[error("task {task} of app {app} has an empty host")]
    MissingTaskHost { app: String, task: String },

    /// An integer label could not be parsed.
    #[error("app {app} has malformed label {label}={value:?}: {source}")]
    MalformedIntLabel {
        app: String,
        label: &'static str,
        value: String,
        source: std::num::ParseIntError,
    },
}

impl CompileError {
    /// Id of the application the error belongs to.
    pub fn app(&self) -> &str {
        match self {
            CompileError::MissingPorts { app }
            | CompileError::MissingTaskPorts { app, .. }
            | CompileError::MissingTaskHost { app, .. }
            | CompileError::MalformedIntLabel { app, .. } => app,
        }
    }
}

/// Result of compiling one labelled application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOutcome {
    /// Application id in the snapshot.
    pub app: String,
    /// Pool name taken from the pool label.
    pub pool: String,
    pub result: Result<PoolSpec, CompileError>,
}

/// Folded compiler output: every pool that compiled plus every failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compilation {
    pub pools: PoolConfiguration,
    pub errors: Vec<CompileError>,
}

/// Compile every labelled application, keeping failures as tagged outcomes.
///
/// Applications without the pool label produce no outcome at all.
pub fn compile_outcomes(snapshot: &Snapshot, bind_host: &str) -> Vec<PoolOutcome> {
    snapshot
        .iter()
        .filter_map(|(id, app)| {
            let pool = app.labels.get(labels::POOL)?;
            Some(PoolOutcome {
                app: id.to_string(),
                pool: pool.clone(),
                result: compile_app(id, app, bind_host),
            })
        })
        .collect()
}

/// Compile a snapshot into a pool configuration on a best-effort basis.
///
/// Failed applications are left out and reported in `errors`. When two
/// applications name the same pool the later one (by id order) wins.
pub fn compile(snapshot: &Snapshot, bind_host: &str) -> Compilation {
    let mut compilation = Compilation::default();

    for outcome in compile_outcomes(snapshot, bind_host) {
        match outcome.result {
            Ok(spec) => {
                if compilation.pools.insert(outcome.pool.clone(), spec).is_some() {
                    tracing::warn!(
                        pool = %outcome.pool,
                        app = %outcome.app,
                        "Pool name claimed by more than one app, keeping the last"
                    );
                }
            }
            Err(e) => compilation.errors.push(e),
        }
    }

    compilation
}

/// Build the pool spec for a single application.
pub fn compile_app(id: &str, app: &Application, bind_host: &str) -> Result<PoolSpec, CompileError> {
    let port = app.ports.first().ok_or_else(|| CompileError::MissingPorts {
        app: id.to_string(),
    })?;

    let int = |label| {
        labels::int_label(&app.labels, label).map_err(|e: MalformedLabel| {
            CompileError::MalformedIntLabel {
                app: id.to_string(),
                label: e.label,
                value: e.value,
                source: e.source,
            }
        })
    };

    let mut spec = PoolSpec {
        listen: join_host_port(bind_host, *port),
        hash: labels::string_label(&app.labels, labels::HASH),
        hash_tag: labels::string_label(&app.labels, labels::HASH_TAG),
        distribution: labels::string_label(&app.labels, labels::DISTRIBUTION),
        timeout: int(labels::TIMEOUT)?,
        backlog: int(labels::BACKLOG)?,
        preconnect: labels::bool_label(&app.labels, labels::PRECONNECT),
        redis: labels::bool_label(&app.labels, labels::REDIS),
        server_connections: int(labels::SERVER_CONNECTIONS)?,
        auto_eject_hosts: labels::bool_label(&app.labels, labels::AUTO_EJECT_HOSTS),
        server_retry_timeout: int(labels::SERVER_RETRY_TIMEOUT)?,
        server_failure_limit: int(labels::SERVER_FAILURE_LIMIT)?,
        servers: Vec::with_capacity(app.tasks.len()),
    };

    for task in &app.tasks {
        let port = task.ports.first().ok_or_else(|| CompileError::MissingTaskPorts {
            app: id.to_string(),
            task: task.id.clone(),
        })?;
        if task.host.is_empty() {
            return Err(CompileError::MissingTaskHost {
                app: id.to_string(),
                task: task.id.clone(),
            });
        }
        spec.servers
            .push(BackendServer::new(task.host.clone(), *port, task.id.clone()));
    }

    Ok(spec)
}

/// `host:port`, bracketing IPv6 literals.
fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
