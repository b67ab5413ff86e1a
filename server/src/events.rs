//! Sync notifications.
//!
//! The coordinator reports what happened through an injected [`EventSink`]
//! instead of talking to a UI directly.

use rindang_engine::{EntityKind, ReconcileResult, RecordId, SyncOperation};
use serde::Serialize;
use tokio::sync::mpsc;

/// Something the sync coordinator did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncEvent {
    /// A local write was queued.
    #[serde(rename_all = "camelCase")]
    Queued {
        table: EntityKind,
        record_id: RecordId,
        operation: SyncOperation,
    },
    /// A replay pass finished.
    PassCompleted { succeeded: usize, failed: usize },
    WentOnline,
    WentOffline,
    /// A table was refreshed from the remote.
    Pulled {
        table: EntityKind,
        result: ReconcileResult,
    },
}

/// Receiver of sync events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SyncEvent);
}

/// Renders events as log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Queued {
                table,
                record_id,
                operation,
            } => tracing::debug!(%table, %record_id, operation = operation.as_str(), "Change queued"),
            SyncEvent::PassCompleted { succeeded, failed } => {
                if *succeeded > 0 {
                    tracing::info!(succeeded, "{} changes synced", succeeded);
                }
                if *failed > 0 {
                    tracing::warn!(failed, "{} changes failed to sync", failed);
                }
            }
            SyncEvent::WentOnline => tracing::info!("Back online"),
            SyncEvent::WentOffline => tracing::info!("Offline, changes will be queued"),
            SyncEvent::Pulled { table, result } => tracing::info!(
                %table,
                inserted = result.inserted.len(),
                updated = result.updated.len(),
                removed = result.removed.len(),
                kept_local = result.kept_local.len(),
                "Table refreshed from remote"
            ),
        }
    }
}

/// Forwards events to a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &SyncEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.tx.send(event.clone());
    }
}
