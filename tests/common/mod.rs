//! Shared utilities for synchronizer integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use twemproxy_sync::pool::labels;
use twemproxy_sync::pool::PoolConfiguration;
use twemproxy_sync::proxy::{writer, ProcessId, ProxyControl, ProxyError, ProxyResult};
use twemproxy_sync::state::{Application, Snapshot, Task};
use twemproxy_sync::sync::SyncSettings;

/// One interaction with the proxy, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Write,
    Validate,
    Start(Vec<String>),
    Reload(ProcessId),
}

#[derive(Debug)]
struct FakeState {
    calls: Vec<Call>,
    next_pid: u32,
    dead: HashSet<ProcessId>,
    fail_write: bool,
    fail_validate: bool,
    fail_start: bool,
    fail_reload: bool,
}

/// A proxy that records what it is asked to do.
///
/// Writes go to disk for real so tests can inspect the file; everything
/// else is simulated. Pids are handed out from 100 upwards.
#[derive(Debug)]
pub struct FakeProxy {
    state: Mutex<FakeState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    validate_delay: Duration,
}

impl Default for FakeProxy {
    fn default() -> Self {
        Self::with_validate_delay(Duration::ZERO)
    }
}

impl FakeProxy {
    pub fn with_validate_delay(validate_delay: Duration) -> Self {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                next_pid: 100,
                dead: HashSet::new(),
                fail_write: false,
                fail_validate: false,
                fail_start: false,
                fail_reload: false,
            }),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            validate_delay,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fail_write(&self, fail: bool) {
        self.state.lock().unwrap().fail_write = fail;
    }

    pub fn fail_validate(&self, fail: bool) {
        self.state.lock().unwrap().fail_validate = fail;
    }

    pub fn fail_start(&self, fail: bool) {
        self.state.lock().unwrap().fail_start = fail;
    }

    pub fn fail_reload(&self, fail: bool) {
        self.state.lock().unwrap().fail_reload = fail;
    }

    /// Simulate the process being killed behind the synchronizer's back.
    pub fn kill(&self, pid: ProcessId) {
        self.state.lock().unwrap().dead.insert(pid);
    }

    /// Highest number of validations observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl ProxyControl for FakeProxy {
    async fn write_config(&self, path: &Path, pools: &PoolConfiguration) -> ProxyResult<()> {
        self.record(Call::Write);
        if self.state.lock().unwrap().fail_write {
            return Err(ProxyError::Write {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        writer::write_config(path, pools).await
    }

    async fn validate(&self, _path: &Path) -> ProxyResult<()> {
        self.record(Call::Validate);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.validate_delay.is_zero() {
            tokio::time::sleep(self.validate_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.state.lock().unwrap().fail_validate {
            return Err(ProxyError::Invalid {
                code: Some(1),
                output: "nutcracker: configuration file has invalid format".into(),
            });
        }
        Ok(())
    }

    async fn start(&self, _path: &Path, extra_args: &[String]) -> ProxyResult<ProcessId> {
        self.record(Call::Start(extra_args.to_vec()));
        let mut state = self.state.lock().unwrap();
        if state.fail_start {
            return Err(ProxyError::Start {
                binary: "nutcracker".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        let pid = ProcessId(state.next_pid);
        state.next_pid += 1;
        Ok(pid)
    }

    async fn reload(&self, pid: ProcessId) -> ProxyResult<()> {
        self.record(Call::Reload(pid));
        let state = self.state.lock().unwrap();
        if state.dead.contains(&pid) {
            return Err(ProxyError::NoSuchProcess { pid });
        }
        if state.fail_reload {
            return Err(ProxyError::Signal {
                pid,
                source: nix::errno::Errno::EPERM,
            });
        }
        Ok(())
    }
}

/// Settings pointing at a config file inside `dir`.
pub fn settings(dir: &Path) -> SyncSettings {
    SyncSettings {
        config_path: dir.join("nutcracker.yml"),
        bind_host: "127.0.0.1".into(),
        extra_args: vec!["-v".into(), "6".into()],
    }
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join("nutcracker.yml")
}

/// A labelled redis application with one task per entry of `backends`.
pub fn cache_app(pool: &str, port: u16, backends: &[(&str, &str, u16)]) -> Application {
    backends.iter().fold(
        Application::new(pool)
            .with_ports([port])
            .with_label(labels::POOL, pool)
            .with_label(labels::REDIS, "true"),
        |app, (id, host, port)| app.with_task(Task::new(*id, *host, [*port])),
    )
}

/// The single-pool snapshot used throughout the tests.
pub fn cache_snapshot(backends: &[(&str, &str, u16)]) -> Snapshot {
    Snapshot::new().with_app("/cache", cache_app("cache", 6379, backends))
}
