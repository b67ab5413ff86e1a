//! Cached table routes: reads come from the local cache, writes go through
//! the sync queue.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rindang_engine::{EntityKind, QueuedMutation, ReconcileResult};
use serde::Serialize;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::AppState;

/// Create table routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tables/{table}/records",
            get(list_handler).post(create_handler),
        )
        .route(
            "/tables/{table}/records/{id}",
            get(get_handler).patch(update_handler).delete(delete_handler),
        )
        .route("/tables/{table}/pull", post(pull_handler))
}

/// A queued write and the cached row after it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    #[serde(flatten)]
    pub mutation: QueuedMutation,
    pub record: Option<Value>,
}

fn kind(table: &str) -> Result<EntityKind> {
    Ok(table.parse()?)
}

/// GET /tables/{table}/records
async fn list_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(table): Path<String>,
) -> Result<Json<Vec<Value>>> {
    Ok(Json(state.coordinator.rows(kind(&table)?).await))
}

/// GET /tables/{table}/records/{id}
async fn get_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    state
        .coordinator
        .get(kind(&table)?, &id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{table}/{id}")))
}

/// POST /tables/{table}/records
async fn create_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(table): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<WriteResponse>)> {
    let kind = kind(&table)?;
    let mutation = state.coordinator.queue_create(kind, payload).await?;
    let record = state.coordinator.get(kind, &mutation.record_id).await;
    Ok((StatusCode::CREATED, Json(WriteResponse { mutation, record })))
}

/// PATCH /tables/{table}/records/{id}
async fn update_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((table, id)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<Json<WriteResponse>> {
    let kind = kind(&table)?;
    let mutation = state.coordinator.queue_update(kind, &id, patch).await?;
    let record = state.coordinator.get(kind, &id).await;
    Ok(Json(WriteResponse { mutation, record }))
}

/// DELETE /tables/{table}/records/{id}
async fn delete_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((table, id)): Path<(String, String)>,
) -> Result<Json<WriteResponse>> {
    let kind = kind(&table)?;
    let mutation = state.coordinator.queue_delete(kind, &id).await?;
    let record = state.coordinator.get(kind, &id).await;
    Ok(Json(WriteResponse { mutation, record }))
}

/// POST /tables/{table}/pull - Refresh the cache from the remote.
async fn pull_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(table): Path<String>,
) -> Result<Json<ReconcileResult>> {
    Ok(Json(state.coordinator.pull(kind(&table)?).await?))
}
