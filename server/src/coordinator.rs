//! Sync coordinator.
//!
//! Owns the [`SyncState`] behind an async mutex and replays its queue against
//! the remote store. The mutex is never held across a remote call, so local
//! writes keep flowing while a pass is in flight. At most one pass runs at a
//! time; a second trigger while one is running is a no-op.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use rindang_engine::{
    EntityKind, Land, ProductionRecord, QueuedMutation, ReconcileResult, SyncOperation,
    SyncQueueItem, SyncState,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::connectivity::Connectivity;
use crate::error::{AppError, RemoteError, Result};
use crate::events::{EventSink, SyncEvent, TracingSink};
use crate::persist::{self, PersistError};
use crate::remote::RemoteStore;

/// Outcome of one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub succeeded: usize,
    /// Items that failed this pass, dead ones included
    pub failed: usize,
    /// Dead items passed over without a remote call
    pub skipped: usize,
}

/// Queue status for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub online: bool,
    pub syncing: bool,
    /// Items still eligible for replay
    pub pending: usize,
    /// Items at the retry ceiling
    pub failed: usize,
    pub last_report: Option<SyncReport>,
}

/// Clears the in-flight flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator {
    state: Mutex<SyncState>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Connectivity,
    events: Arc<dyn EventSink>,
    syncing: AtomicBool,
    last_report: Mutex<Option<SyncReport>>,
    state_path: Option<PathBuf>,
    persist_lock: Mutex<()>,
    replay_timeout: Option<Duration>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SyncCoordinator {
    /// Create a coordinator over `state`. Events go to the log until
    /// [`with_events`](Self::with_events) replaces the sink.
    pub fn new(state: SyncState, remote: Arc<dyn RemoteStore>, connectivity: Connectivity) -> Self {
        Self {
            state: Mutex::new(state),
            remote,
            connectivity,
            events: Arc::new(TracingSink),
            syncing: AtomicBool::new(false),
            last_report: Mutex::new(None),
            state_path: None,
            persist_lock: Mutex::new(()),
            replay_timeout: None,
            listener: Mutex::new(None),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Persist a snapshot to `path` after every write and every pass.
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    pub fn with_replay_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.replay_timeout = timeout;
        self
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Subscribe to connectivity and replay on every offline to online
    /// transition. Also runs one pass right away if already online.
    pub async fn start(self: &Arc<Self>) {
        let mut rx = self.connectivity.subscribe();
        let mut was_online = *rx.borrow_and_update();
        let weak: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online == was_online {
                    continue;
                }
                was_online = online;

                let Some(coordinator) = weak.upgrade() else {
                    break;
                };
                if online {
                    coordinator.events.emit(&SyncEvent::WentOnline);
                    coordinator.sync_now().await;
                } else {
                    coordinator.events.emit(&SyncEvent::WentOffline);
                }
            }
        });

        if let Some(previous) = self.listener.lock().await.replace(handle) {
            previous.abort();
        }

        if self.connectivity.is_online() {
            self.sync_now().await;
        }
    }

    /// Stop listening for connectivity changes and write a final snapshot.
    pub async fn shutdown(&self) -> std::result::Result<(), PersistError> {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.abort();
        }
        self.persist().await
    }

    /// Run one replay pass.
    ///
    /// Returns `None` without touching the queue when offline or when a
    /// pass is already running. Items are replayed in FIFO order; dead
    /// items are skipped and reported as failed, failures bump the item's
    /// retry count.
    pub async fn sync_now(&self) -> Option<SyncReport> {
        if !self.connectivity.is_online() {
            tracing::debug!("Offline, skipping sync");
            return None;
        }
        let Some(_guard) = PassGuard::acquire(&self.syncing) else {
            tracing::debug!("Sync already in progress");
            return None;
        };

        let batch = self.state.lock().await.replay_batch();
        let mut report = SyncReport::default();

        for item in batch {
            if item.is_dead() {
                report.skipped += 1;
                report.failed += 1;
                continue;
            }

            match self.replay(&item).await {
                Ok(echo) => match self.state.lock().await.complete(item.id, echo) {
                    Ok(_) => {
                        tracing::debug!(
                            item_id = item.id,
                            table = %item.table,
                            record_id = %item.record_id,
                            "Replayed {}",
                            item.operation.as_str()
                        );
                        report.succeeded += 1;
                    }
                    Err(e) => tracing::warn!(item_id = item.id, "Replayed item vanished: {}", e),
                },
                Err(e) => {
                    let message = e.to_string();
                    match self.state.lock().await.fail(item.id, &message, Utc::now()) {
                        Ok(retry_count) => {
                            tracing::warn!(
                                item_id = item.id,
                                table = %item.table,
                                record_id = %item.record_id,
                                retry_count,
                                "Replay failed: {}",
                                message
                            );
                            report.failed += 1;
                        }
                        Err(e) => tracing::warn!(item_id = item.id, "Failed item vanished: {}", e),
                    }
                }
            }
        }

        if let Err(e) = self.persist().await {
            tracing::error!("Failed to persist after sync: {}", e);
        }
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Sync pass finished"
        );
        self.events.emit(&SyncEvent::PassCompleted {
            succeeded: report.succeeded,
            failed: report.failed,
        });
        *self.last_report.lock().await = Some(report);
        Some(report)
    }

    async fn replay(&self, item: &SyncQueueItem) -> std::result::Result<Option<Value>, RemoteError> {
        match self.replay_timeout {
            Some(limit) => tokio::time::timeout(limit, self.dispatch(item))
                .await
                .map_err(|_| RemoteError::Timeout(limit))?,
            None => self.dispatch(item).await,
        }
    }

    async fn dispatch(&self, item: &SyncQueueItem) -> std::result::Result<Option<Value>, RemoteError> {
        let endpoint = item.table.spec().remote_endpoint;
        match item.operation {
            SyncOperation::Create => {
                let row = self.remote.insert(endpoint, &item.data).await?;
                Ok(Some(row).filter(|row| !row.is_null()))
            }
            SyncOperation::Update => {
                self.remote
                    .update(endpoint, &item.record_id, &item.data)
                    .await?;
                Ok(None)
            }
            SyncOperation::Delete => {
                self.remote.delete(endpoint, &item.record_id).await?;
                Ok(None)
            }
        }
    }

    /// Write a new record locally and queue it.
    pub async fn queue_create(&self, kind: EntityKind, payload: Value) -> Result<QueuedMutation> {
        let mutation = self
            .state
            .lock()
            .await
            .queue_create(kind, payload, Utc::now())?;
        self.after_write(kind, &mutation).await;
        Ok(mutation)
    }

    /// Patch a record locally and queue the changed fields.
    pub async fn queue_update(
        &self,
        kind: EntityKind,
        record_id: &str,
        patch: Value,
    ) -> Result<QueuedMutation> {
        let mutation = self
            .state
            .lock()
            .await
            .queue_update(kind, record_id, patch, Utc::now())?;
        self.after_write(kind, &mutation).await;
        Ok(mutation)
    }

    /// Queue a delete; the row stays readable until the remote confirms.
    pub async fn queue_delete(&self, kind: EntityKind, record_id: &str) -> Result<QueuedMutation> {
        let mutation = self
            .state
            .lock()
            .await
            .queue_delete(kind, record_id, Utc::now())?;
        self.after_write(kind, &mutation).await;
        Ok(mutation)
    }

    /// The mutation is already applied in memory, so a failed snapshot is
    /// logged rather than reported; the next write or pass retries it.
    async fn after_write(&self, kind: EntityKind, mutation: &QueuedMutation) {
        self.events.emit(&SyncEvent::Queued {
            table: kind,
            record_id: mutation.record_id.clone(),
            operation: mutation.operation,
        });
        if let Err(e) = self.persist().await {
            tracing::error!("Failed to persist after write: {}", e);
        }
        if self.connectivity.is_online() {
            self.sync_now().await;
        }
    }

    /// Give dead items another three attempts, then replay if online.
    pub async fn retry_failed(&self) -> Result<usize> {
        let count = self.state.lock().await.retry_failed();
        tracing::info!(count, "Reset failed items for retry");
        self.persist().await?;
        if count > 0 && self.connectivity.is_online() {
            self.sync_now().await;
        }
        Ok(count)
    }

    /// Drop dead items from the queue.
    pub async fn purge_failed(&self) -> Result<Vec<SyncQueueItem>> {
        let purged = self.state.lock().await.purge_failed();
        tracing::info!(count = purged.len(), "Purged failed items");
        self.persist().await?;
        Ok(purged)
    }

    /// Refresh one cached table from the remote.
    pub async fn pull(&self, kind: EntityKind) -> Result<ReconcileResult> {
        if !self.connectivity.is_online() {
            return Err(AppError::Offline);
        }
        let rows = self.remote.select_all(kind.spec().remote_endpoint).await?;
        let result = self.state.lock().await.apply_remote_rows(kind, rows);
        self.persist().await?;
        self.events.emit(&SyncEvent::Pulled {
            table: kind,
            result: result.clone(),
        });
        Ok(result)
    }

    pub async fn status(&self) -> SyncStatus {
        let (pending, failed) = {
            let state = self.state.lock().await;
            (state.pending_count(), state.failed_count())
        };
        SyncStatus {
            online: self.connectivity.is_online(),
            syncing: self.syncing.load(Ordering::Acquire),
            pending,
            failed,
            last_report: *self.last_report.lock().await,
        }
    }

    /// A cached row, including its `_synced` flag.
    pub async fn get(&self, kind: EntityKind, record_id: &str) -> Option<Value> {
        self.state
            .lock()
            .await
            .get(kind, record_id)
            .and_then(|record| serde_json::to_value(record).ok())
    }

    /// Cached rows of a table with their `_synced` flags, ordered by id.
    pub async fn rows(&self, kind: EntityKind) -> Vec<Value> {
        let state = self.state.lock().await;
        state
            .cache()
            .table(kind)
            .map(|table| {
                table
                    .iter()
                    .filter_map(|(_, record)| serde_json::to_value(record).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Cached productions and lands, for schedule views.
    pub async fn schedule_inputs(&self) -> (Vec<ProductionRecord>, Vec<Land>) {
        let state = self.state.lock().await;
        (state.productions(), state.lands())
    }

    /// Items currently queued, dead ones included.
    pub async fn queue_items(&self) -> Vec<SyncQueueItem> {
        self.state.lock().await.replay_batch()
    }

    async fn persist(&self) -> std::result::Result<(), PersistError> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        let _write = self.persist_lock.lock().await;
        let state = self.state.lock().await.clone();
        persist::save_state(path, &state).await
    }
}
