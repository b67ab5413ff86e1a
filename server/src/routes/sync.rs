//! Sync queue routes.

use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Json, Router,
};
use rindang_engine::SyncQueueItem;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::coordinator::{SyncReport, SyncStatus};
use crate::error::Result;
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync_handler))
        .route("/sync/status", get(status_handler))
        .route("/sync/queue", get(queue_handler))
        .route("/sync/retry-failed", post(retry_failed_handler))
        .route("/sync/failed", delete(purge_failed_handler))
        .route("/connectivity", put(connectivity_handler))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// False when offline or a pass was already running
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
}

/// POST /sync - Run a replay pass now.
async fn sync_handler(State(state): State<AppState>, _auth: AuthUser) -> Json<SyncResponse> {
    let report = state.coordinator.sync_now().await;
    Json(SyncResponse {
        started: report.is_some(),
        report,
    })
}

/// GET /sync/status
async fn status_handler(State(state): State<AppState>, _auth: AuthUser) -> Json<SyncStatus> {
    Json(state.coordinator.status().await)
}

/// GET /sync/queue - Every queued item, dead ones included.
async fn queue_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Json<Vec<SyncQueueItem>> {
    Json(state.coordinator.queue_items().await)
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub reset: usize,
}

/// POST /sync/retry-failed - Reset dead items for another round.
async fn retry_failed_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<RetryResponse>> {
    let reset = state.coordinator.retry_failed().await?;
    Ok(Json(RetryResponse { reset }))
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub purged: Vec<SyncQueueItem>,
}

/// DELETE /sync/failed - Drop dead items.
async fn purge_failed_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<PurgeResponse>> {
    let purged = state.coordinator.purge_failed().await?;
    Ok(Json(PurgeResponse { purged }))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectivityResponse {
    pub online: bool,
    pub changed: bool,
}

/// PUT /connectivity - Manual override of the probe.
async fn connectivity_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<ConnectivityRequest>,
) -> Json<ConnectivityResponse> {
    let changed = state.coordinator.connectivity().set_online(request.online);
    Json(ConnectivityResponse {
        online: request.online,
        changed,
    })
}
