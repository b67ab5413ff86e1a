//! Snapshot persistence for the queue and cache.

use std::path::Path;

use chrono::Utc;
use rindang_engine::{SyncSnapshot, SyncState};

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] rindang_engine::Error),
}

/// Load state from `path`. A missing file yields an empty state.
pub async fn load_state(path: &Path) -> Result<SyncState, PersistError> {
    let json = match tokio::fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No snapshot at {}, starting empty", path.display());
            return Ok(SyncState::new());
        }
        Err(e) => return Err(e.into()),
    };

    let snapshot = SyncSnapshot::from_json(&json)?;
    let meta = snapshot.metadata();
    tracing::info!(
        "Loaded snapshot: {} records ({} unsynced), {} queued",
        meta.record_count,
        meta.unsynced_count,
        meta.queued_count
    );

    let mut state = SyncState::new();
    state.import_state(snapshot)?;
    Ok(state)
}

/// Write `state` to `path`, via a temporary file and a rename.
pub async fn save_state(path: &Path, state: &SyncState) -> Result<(), PersistError> {
    let json = state.export_state(Utc::now()).to_json_pretty()?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    tracing::debug!("Saved snapshot to {}", path.display());
    Ok(())
}
