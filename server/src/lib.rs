//! Rindang sync daemon.
//!
//! Keeps a local cache of the farm tables and a queue of offline writes,
//! replays the queue against the remote store whenever connectivity returns,
//! and exposes the season calendar and conflict checks over a small local
//! HTTP surface.

pub mod auth;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod handlers;
pub mod persist;
pub mod remote;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use connectivity::Connectivity;
pub use coordinator::{SyncCoordinator, SyncReport, SyncStatus};
pub use error::{AppError, RemoteError};
pub use events::{ChannelSink, EventSink, SyncEvent, TracingSink};
pub use remote::{InMemoryRemote, RemoteStore, RestRemoteStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SyncCoordinator>,
    pub config: Arc<Config>,
}

/// Build the router with tracing and CORS layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
