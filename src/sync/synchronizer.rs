//! Update orchestration.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::pool::{self, Compilation, PoolConfiguration};
use crate::proxy::{Nutcracker, ProcessId, ProxyControl, ProxyError};
use crate::state::Snapshot;
use crate::sync::error::{SyncError, SyncResult};

/// Fixed inputs of a synchronizer, set at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Where the pool configuration is written.
    pub config_path: PathBuf,
    /// Host every pool listens on.
    pub bind_host: String,
    /// Appended to the proxy command line on start.
    pub extra_args: Vec<String>,
}

impl From<&ProxyConfig> for SyncSettings {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            config_path: config.config_path.clone(),
            bind_host: config.bind_host.clone(),
            extra_args: config.extra_args.clone(),
        }
    }
}

/// Where the synchronizer is in its update cycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle = 0,
    Compiling = 1,
    Unchanged = 2,
    Writing = 3,
    Validating = 4,
    Reloading = 5,
    Failed = 6,
}

impl From<u8> for SyncPhase {
    fn from(val: u8) -> Self {
        match val {
            1 => SyncPhase::Compiling,
            2 => SyncPhase::Unchanged,
            3 => SyncPhase::Writing,
            4 => SyncPhase::Validating,
            5 => SyncPhase::Reloading,
            6 => SyncPhase::Failed,
            _ => SyncPhase::Idle,
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Compiling => "compiling",
            SyncPhase::Unchanged => "unchanged",
            SyncPhase::Writing => "writing",
            SyncPhase::Validating => "validating",
            SyncPhase::Reloading => "reloading",
            SyncPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What happened to the proxy process during an applied update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyAction {
    /// No process was tracked yet, a new one was launched.
    Started(ProcessId),
    /// The tracked process was signalled to reload.
    Reloaded(ProcessId),
    /// The tracked process was gone, a new one was launched.
    Restarted { previous: ProcessId, pid: ProcessId },
}

impl ProxyAction {
    /// The process now serving the configuration.
    pub fn pid(&self) -> ProcessId {
        match *self {
            ProxyAction::Started(pid) | ProxyAction::Reloaded(pid) => pid,
            ProxyAction::Restarted { pid, .. } => pid,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ProxyAction::Started(_) => "start",
            ProxyAction::Reloaded(_) => "reload",
            ProxyAction::Restarted { .. } => "restart",
        }
    }
}

/// Result of a successful [`Synchronizer::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The snapshot compiled to the configuration already in place.
    Unchanged,
    /// A new configuration was written, validated and handed to the proxy.
    Applied { action: ProxyAction, pools: usize },
}

impl UpdateOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, UpdateOutcome::Applied { .. })
    }
}

/// Lock-free view of the last successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub pools: PoolConfiguration,
    /// Process serving `pools`, `None` once it has exited.
    pub pid: Option<ProcessId>,
}

/// State guarded by the update gate.
#[derive(Debug, Default)]
struct Gate {
    applied: Option<PoolConfiguration>,
    pid: Option<ProcessId>,
}

/// Keeps the proxy's pool configuration in line with cluster state.
///
/// All updates funnel through one async mutex, so the file on disk, the
/// validation result and the reload are never interleaved across calls.
pub struct Synchronizer<P = Nutcracker> {
    settings: SyncSettings,
    proxy: P,
    gate: Mutex<Gate>,
    published: ArcSwapOption<Applied>,
    phase: AtomicU8,
    sequence: AtomicU64,
}

impl<P: ProxyControl> Synchronizer<P> {
    pub fn new(settings: SyncSettings, proxy: P) -> Self {
        Self {
            settings,
            proxy,
            gate: Mutex::new(Gate::default()),
            published: ArcSwapOption::empty(),
            phase: AtomicU8::new(SyncPhase::Idle as u8),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn proxy(&self) -> &P {
        &self.proxy
    }

    /// Most recent phase. Observational only.
    pub fn phase(&self) -> SyncPhase {
        SyncPhase::from(self.phase.load(Ordering::Relaxed))
    }

    /// Last successfully applied state, without waiting on the gate.
    pub fn applied(&self) -> Option<Arc<Applied>> {
        self.published.load_full()
    }

    /// Last applied configuration, read under the gate.
    pub async fn last_applied(&self) -> Option<PoolConfiguration> {
        self.gate.lock().await.applied.clone()
    }

    /// Currently tracked proxy process, read under the gate.
    pub async fn tracked_process(&self) -> Option<ProcessId> {
        self.gate.lock().await.pid
    }

    /// Stop tracking `pid` after it exited.
    ///
    /// The next changed update starts a new process instead of signalling a
    /// pid the OS may already have handed to someone else. No-op when a
    /// different process is tracked by now. Returns whether `pid` was dropped.
    pub async fn forget_process(&self, pid: ProcessId) -> bool {
        let mut gate = self.gate.lock().await;
        if gate.pid != Some(pid) {
            return false;
        }
        gate.pid = None;

        if let Some(applied) = self.published.load_full() {
            self.published.store(Some(Arc::new(Applied {
                pools: applied.pools.clone(),
                pid: None,
            })));
        }
        tracing::info!(pid = %pid, "Proxy process no longer tracked");
        true
    }

    /// Bring the proxy in line with `snapshot`.
    ///
    /// Returns [`UpdateOutcome::Unchanged`] without touching disk or the
    /// proxy when the snapshot compiles to the configuration already applied.
    pub async fn update(&self, snapshot: &Snapshot) -> SyncResult<UpdateOutcome> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let span = tracing::info_span!("update", seq, apps = snapshot.len());

        async {
            let mut gate = self.gate.lock().await;
            tracing::debug!("Received update request");

            let result = self.apply(&mut gate, snapshot).await;
            match &result {
                Ok(UpdateOutcome::Unchanged) => {
                    metrics::record_update("unchanged");
                }
                Ok(UpdateOutcome::Applied { .. }) => {
                    self.set_phase(SyncPhase::Idle);
                    metrics::record_update("applied");
                }
                Err(e) => {
                    self.set_phase(SyncPhase::Failed);
                    tracing::error!(error = %e, "Error updating configuration");
                    metrics::record_update(e.kind());
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn apply(&self, gate: &mut Gate, snapshot: &Snapshot) -> SyncResult<UpdateOutcome> {
        self.set_phase(SyncPhase::Compiling);
        let Compilation { pools, errors } = pool::compile(snapshot, &self.settings.bind_host);

        for e in &errors {
            tracing::warn!(app = %e.app(), error = %e, "Skipping app");
        }
        metrics::record_compile_errors(errors.len());

        if gate.applied.as_ref() == Some(&pools) {
            self.set_phase(SyncPhase::Unchanged);
            tracing::info!("State is the same, not doing any updates");
            return Ok(UpdateOutcome::Unchanged);
        }

        let path = &self.settings.config_path;

        self.set_phase(SyncPhase::Writing);
        self.proxy
            .write_config(path, &pools)
            .await
            .map_err(SyncError::ConfigWriteFailed)?;
        tracing::info!(path = %path.display(), pools = pools.len(), "Config updated");

        self.set_phase(SyncPhase::Validating);
        self.proxy
            .validate(path)
            .await
            .map_err(SyncError::ConfigInvalid)?;
        tracing::info!("Config validity checked");

        self.set_phase(SyncPhase::Reloading);
        let action = self.reload_or_start(gate).await?;
        metrics::record_proxy_action(action.label());
        tracing::info!(pid = %action.pid(), action = action.label(), "Proxy reloaded");

        let count = pools.len();
        metrics::record_applied_pools(count);
        self.published.store(Some(Arc::new(Applied {
            pools: pools.clone(),
            pid: Some(action.pid()),
        })));
        gate.applied = Some(pools);

        Ok(UpdateOutcome::Applied {
            action,
            pools: count,
        })
    }

    async fn reload_or_start(&self, gate: &mut Gate) -> SyncResult<ProxyAction> {
        let Some(previous) = gate.pid else {
            tracing::info!("Proxy is not started yet, starting");
            let pid = self.start().await?;
            gate.pid = Some(pid);
            return Ok(ProxyAction::Started(pid));
        };

        match self.proxy.reload(previous).await {
            Ok(()) => Ok(ProxyAction::Reloaded(previous)),
            Err(ProxyError::NoSuchProcess { .. }) => {
                tracing::warn!(pid = %previous, "Proxy process is gone, starting a new one");
                // A failed start must not leave the dead pid tracked.
                gate.pid = None;
                let pid = self.start().await?;
                gate.pid = Some(pid);
                Ok(ProxyAction::Restarted { previous, pid })
            }
            Err(e) => Err(SyncError::ReloadFailed(e)),
        }
    }

    async fn start(&self) -> SyncResult<ProcessId> {
        self.proxy
            .start(&self.settings.config_path, &self.settings.extra_args)
            .await
            .map_err(SyncError::ProcessStartFailed)
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }
}
