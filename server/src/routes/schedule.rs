//! Schedule routes: season calendar and conflict checks.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rindang_engine::{find_all_conflicts, ConflictMap, ProductionRecord};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{build_calendar, check_candidate, CalendarResponse, CheckRequest, CheckResponse};
use crate::AppState;

/// Create schedule routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/calendar/{year}", get(calendar_handler))
        .route("/schedule/conflicts", post(conflicts_handler))
        .route("/schedule/check", post(check_handler))
}

/// GET /calendar/{year} - Calendar of the cached lands and productions.
async fn calendar_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(year): Path<i32>,
) -> Result<Json<CalendarResponse>> {
    let (productions, lands) = state.coordinator.schedule_inputs().await;
    let calendar = build_calendar(&productions, &lands, year, Utc::now().date_naive())?;
    Ok(Json(calendar))
}

#[derive(Debug, Deserialize)]
pub struct ConflictsRequest {
    pub productions: Vec<ProductionRecord>,
}

/// POST /schedule/conflicts
async fn conflicts_handler(
    _auth: AuthUser,
    Json(request): Json<ConflictsRequest>,
) -> Json<ConflictMap> {
    Json(find_all_conflicts(&request.productions))
}

/// POST /schedule/check - Conflicts a candidate would introduce.
async fn check_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<CheckRequest>,
) -> Json<CheckResponse> {
    let existing = match request.existing {
        Some(existing) => existing,
        None => state.coordinator.schedule_inputs().await.0,
    };
    Json(check_candidate(&request.candidate, &existing))
}
