use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::pool::PoolConfiguration;
use crate::proxy::ProxyControl;
use crate::state::Snapshot;
use crate::sync::{SyncError, SyncPhase, Synchronizer};

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub phase: SyncPhase,
    pub pid: Option<u32>,
    pub pools: usize,
}

/// Accept a full cluster snapshot and apply it.
///
/// The update runs on its own task so a client hanging up mid-request
/// cannot cut it short between write, validate and reload.
pub async fn put_state<P: ProxyControl>(
    State(sync): State<Arc<Synchronizer<P>>>,
    Json(snapshot): Json<Snapshot>,
) -> Response {
    let update = tokio::spawn(async move { sync.update(&snapshot).await });

    let result = match update.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "Update task failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "update aborted".into());
        }
    };

    match result {
        Ok(outcome) => Json(UpdateResponse {
            changed: outcome.changed(),
        })
        .into_response(),
        Err(e) => {
            let status = match e {
                SyncError::ConfigInvalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SyncError::ConfigWriteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
                SyncError::ReloadFailed(_) | SyncError::ProcessStartFailed(_) => {
                    StatusCode::BAD_GATEWAY
                }
            };
            error_response(status, e.to_string())
        }
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// The configuration the proxy is currently running with.
pub async fn get_pools<P: ProxyControl>(
    State(sync): State<Arc<Synchronizer<P>>>,
) -> Result<Json<PoolConfiguration>, StatusCode> {
    sync.applied()
        .map(|applied| Json(applied.pools.clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_status<P: ProxyControl>(
    State(sync): State<Arc<Synchronizer<P>>>,
) -> Json<SystemStatus> {
    let applied = sync.applied();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        phase: sync.phase(),
        pid: applied.as_ref().and_then(|a| a.pid).map(|pid| pid.0),
        pools: applied.as_ref().map_or(0, |a| a.pools.len()),
    })
}
