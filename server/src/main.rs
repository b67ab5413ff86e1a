//! Rindang sync daemon entry point.

use std::sync::Arc;

use rindang_server::{
    persist, AppState, Config, Connectivity, InMemoryRemote, RemoteStore, RestRemoteStore,
    SyncCoordinator,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rindang_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Rindang sync daemon on {}:{}", config.host, config.port);

    let remote: Arc<dyn RemoteStore> = match &config.remote_url {
        Some(url) => {
            tracing::info!("Remote store at {}", url);
            Arc::new(RestRemoteStore::new(url.clone(), config.remote_api_key.clone()))
        }
        None => {
            tracing::warn!("REMOTE_URL not set, using an in-memory remote store");
            Arc::new(InMemoryRemote::new())
        }
    };

    let state = persist::load_state(&config.state_path).await?;

    // Start offline; the first probe tick decides
    let connectivity = Connectivity::new(false);
    let probe = connectivity.spawn_probe(remote.clone(), config.probe_interval);

    let coordinator = Arc::new(
        SyncCoordinator::new(state, remote, connectivity)
            .with_persistence(config.state_path.clone())
            .with_replay_timeout(config.replay_timeout),
    );
    coordinator.start().await;

    let app = rindang_server::app(AppState {
        coordinator: coordinator.clone(),
        config: Arc::new(config.clone()),
    });

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    probe.abort();
    coordinator.shutdown().await?;
    tracing::info!("Shut down cleanly");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
