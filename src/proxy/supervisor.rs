//! Managed proxy process supervision.
//!
//! # Responsibilities
//! - Launch the proxy with `-c <path> <extra args...>`
//! - Reap the child in the background and report how it exited
//! - Deliver the reload signal (`SIGUSR1`) to a running process
//!
//! # Design Decisions
//! - Starting never waits for the child; the reaper task owns it
//! - Exits are broadcast so callers may observe them, and are always logged
//! - "Process is gone" is its own error so the caller can restart instead

use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::Command;
use tokio::sync::broadcast;

use crate::observability::metrics;
use crate::proxy::error::{ProxyError, ProxyResult};

/// OS process id of a started proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        Self(pid)
    }
}

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub pid: ProcessId,
    /// `None` when waiting on the child itself failed.
    pub status: Option<ExitStatus>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.status.is_some_and(|s| s.success())
    }
}

/// Starts and signals the managed proxy.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    binary: String,
    exits: broadcast::Sender<ProcessExit>,
}

impl ProcessSupervisor {
    pub fn new(binary: impl Into<String>) -> Self {
        let (exits, _) = broadcast::channel(16);
        Self {
            binary: binary.into(),
            exits,
        }
    }

    /// Binary this supervisor launches.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Subscribe to exit reports of processes started from now on.
    pub fn subscribe_exits(&self) -> broadcast::Receiver<ProcessExit> {
        self.exits.subscribe()
    }

    /// Launch the proxy and return its pid without waiting for it.
    pub fn start(&self, config_path: &Path, extra_args: &[String]) -> ProxyResult<ProcessId> {
        let start_err = |source| ProxyError::Start {
            binary: self.binary.clone(),
            source,
        };

        let mut child = Command::new(&self.binary)
            .arg("-c")
            .arg(config_path)
            .args(extra_args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(start_err)?;

        let pid = child
            .id()
            .map(ProcessId)
            .ok_or_else(|| start_err(std::io::Error::other("process exited before its pid was read")))?;

        tracing::info!(
            pid = %pid,
            binary = %self.binary,
            config = %config_path.display(),
            "Proxy process started"
        );

        let exits = self.exits.clone();
        tokio::spawn(async move {
            let status = match child.wait().await {
                Ok(status) => Some(status),
                Err(e) => {
                    tracing::error!(pid = %pid, error = %e, "Failed to wait on proxy process");
                    None
                }
            };

            let exit = ProcessExit { pid, status };
            if exit.success() {
                tracing::info!(pid = %pid, "Proxy process exited");
            } else {
                tracing::warn!(pid = %pid, status = ?status, "Proxy process exited abnormally");
            }
            metrics::record_process_exit(exit.success());

            // Nobody listening is fine.
            let _ = exits.send(exit);
        });

        Ok(pid)
    }

    /// Ask a running proxy to re-read its configuration.
    pub fn reload(&self, pid: ProcessId) -> ProxyResult<()> {
        let raw = i32::try_from(pid.0).map_err(|_| ProxyError::Signal {
            pid,
            source: Errno::EINVAL,
        })?;

        match signal::kill(Pid::from_raw(raw), Signal::SIGUSR1) {
            Ok(()) => {
                tracing::debug!(pid = %pid, "Reload signal sent");
                Ok(())
            }
            Err(Errno::ESRCH) => Err(ProxyError::NoSuchProcess { pid }),
            Err(source) => Err(ProxyError::Signal { pid, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_start_reports_exit() {
        let supervisor = ProcessSupervisor::new("true");
        let mut exits = supervisor.subscribe_exits();

        let pid = supervisor
            .start(Path::new("/etc/nutcracker.yml"), &["-v".to_string()])
            .unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(5), exits.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit.pid, pid);
        assert!(exit.success());
    }

    #[tokio::test]
    async fn test_failed_exit_is_reported() {
        let supervisor = ProcessSupervisor::new("false");
        let mut exits = supervisor.subscribe_exits();

        supervisor.start(Path::new("x.yml"), &[]).unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(5), exits.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!exit.success());
    }

    #[tokio::test]
    async fn test_start_missing_binary() {
        let supervisor = ProcessSupervisor::new("/definitely/not/a/proxy");
        let err = supervisor.start(Path::new("x.yml"), &[]).unwrap_err();
        assert!(matches!(err, ProxyError::Start { .. }));
    }

    #[tokio::test]
    async fn test_reload_of_dead_process() {
        let supervisor = ProcessSupervisor::new("true");
        let mut exits = supervisor.subscribe_exits();

        let pid = supervisor.start(Path::new("x.yml"), &[]).unwrap();
        tokio::time::timeout(Duration::from_secs(5), exits.recv())
            .await
            .unwrap()
            .unwrap();

        let err = supervisor.reload(pid).unwrap_err();
        assert!(matches!(err, ProxyError::NoSuchProcess { pid: p } if p == pid));
    }

    #[tokio::test]
    async fn test_reload_running_process() {
        // sleep has no SIGUSR1 handler, so delivery terminates it.
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = ProcessId(child.id().unwrap());

        let supervisor = ProcessSupervisor::new("sleep");
        supervisor.reload(pid).unwrap();

        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!status.success());
    }
}
