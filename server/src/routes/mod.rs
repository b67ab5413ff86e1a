//! HTTP route definitions.

mod health;
mod schedule;
mod sync;
mod tables;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(sync::routes())
        .merge(tables::routes())
        .merge(schedule::routes())
}
