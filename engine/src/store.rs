//! Sync state - the local cache and the mutation queue, moved together.
//!
//! [`SyncState`] holds every state transition of the offline write path and
//! of the replay outcome, with no IO. The async dispatcher owns one and calls
//! into it between remote calls.

use crate::cache::{CachedRecord, LocalCache};
use crate::operation::{SyncOperation, SyncQueueItem};
use crate::production::{Land, ProductionRecord};
use crate::queue::SyncQueue;
use crate::{error::Result, EntityKind, Error, QueueItemId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of a local write: which record, which queue item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMutation {
    pub item_id: QueueItemId,
    pub record_id: RecordId,
    pub operation: SyncOperation,
}

/// Queue and cache, kept consistent with each other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub(crate) queue: SyncQueue,
    pub(crate) cache: LocalCache,
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(Error::InvalidPayload("payload must be an object".into())),
    }
}

impl SyncState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from persisted parts.
    pub fn from_parts(queue: SyncQueue, cache: LocalCache) -> Self {
        Self { queue, cache }
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Queue a create.
    ///
    /// The payload's `id` is used when present, otherwise a UUID v4 is
    /// assigned and written into the payload. The row lands in the cache
    /// (unsynced) before the queue item is appended.
    pub fn queue_create(
        &mut self,
        kind: EntityKind,
        payload: Value,
        now: DateTime<Utc>,
    ) -> Result<QueuedMutation> {
        let mut data = into_object(payload)?;
        let record_id = match data.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let id = uuid::Uuid::new_v4().to_string();
                data.insert("id".into(), Value::String(id.clone()));
                id
            }
        };
        let data = Value::Object(data);
        kind.validate_create(&data)?;

        if let Value::Object(row) = &data {
            self.cache
                .put(kind, record_id.clone(), CachedRecord::new(row.clone(), false));
        }
        let item_id = self
            .queue
            .enqueue(kind, SyncOperation::Create, record_id.clone(), data, now);

        Ok(QueuedMutation {
            item_id,
            record_id,
            operation: SyncOperation::Create,
        })
    }

    /// Queue an update carrying only the changed fields.
    ///
    /// The cached row is patched and flagged unsynced. Fails with
    /// [`Error::RecordNotFound`] when the record is neither cached nor
    /// targeted by a queued item; pull the table first to edit remote rows.
    pub fn queue_update(
        &mut self,
        kind: EntityKind,
        record_id: &str,
        patch: Value,
        now: DateTime<Utc>,
    ) -> Result<QueuedMutation> {
        self.ensure_known(kind, record_id)?;
        let patch = into_object(patch)?;
        self.cache.update(kind, record_id, &patch);
        let item_id = self.queue.enqueue(
            kind,
            SyncOperation::Update,
            record_id,
            Value::Object(patch),
            now,
        );

        Ok(QueuedMutation {
            item_id,
            record_id: record_id.to_string(),
            operation: SyncOperation::Update,
        })
    }

    /// Queue a delete.
    ///
    /// The cached row stays readable, flagged unsynced, until the remote
    /// delete succeeds. Only then is it removed locally. Unknown records
    /// are rejected as in [`queue_update`](Self::queue_update).
    pub fn queue_delete(
        &mut self,
        kind: EntityKind,
        record_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QueuedMutation> {
        self.ensure_known(kind, record_id)?;
        self.cache.set_synced(kind, record_id, false);
        let item_id = self
            .queue
            .enqueue(kind, SyncOperation::Delete, record_id, Value::Null, now);

        Ok(QueuedMutation {
            item_id,
            record_id: record_id.to_string(),
            operation: SyncOperation::Delete,
        })
    }

    fn ensure_known(&self, kind: EntityKind, record_id: &str) -> Result<()> {
        let queued = self
            .queue
            .items()
            .iter()
            .any(|item| item.targets(kind, record_id));
        if self.cache.get(kind, record_id).is_none() && !queued {
            return Err(Error::RecordNotFound(record_id.to_string()));
        }
        Ok(())
    }

    /// Items for one replay pass, in FIFO order. Dead items are included so
    /// the dispatcher can count them.
    pub fn replay_batch(&self) -> Vec<SyncQueueItem> {
        self.queue.items().to_vec()
    }

    /// Apply a successful replay.
    ///
    /// Removes the item. A confirmed delete drops the cached row along with
    /// any earlier queued changes to it, dead ones included. Creates and
    /// updates mark the row synced, merged with the row the remote returned
    /// if any, unless another queued item still targets the same record.
    pub fn complete(&mut self, item_id: QueueItemId, echo: Option<Value>) -> Result<SyncQueueItem> {
        let item = self.queue.remove(item_id)?;

        match item.operation {
            SyncOperation::Delete => {
                self.cache.delete(item.table, &item.record_id);
                self.queue.remove_earlier_for(item.table, &item.record_id, item.id);
            }
            SyncOperation::Create | SyncOperation::Update => {
                if self.queue.has_other_for(item.table, &item.record_id, item.id) {
                    return Ok(item);
                }
                if let Some(Value::Object(row)) = echo {
                    if let Some(cached) = self.cache.get(item.table, &item.record_id).cloned() {
                        let mut merged = cached;
                        merged.merge(&row);
                        self.cache.put(item.table, item.record_id.clone(), merged);
                    }
                }
                self.cache.set_synced(item.table, &item.record_id, true);
            }
        }
        Ok(item)
    }

    /// Apply a failed replay; returns the new retry count.
    pub fn fail(
        &mut self,
        item_id: QueueItemId,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<u32> {
        self.queue.record_failure(item_id, error, now)
    }

    /// Operator-forced retry of dead items.
    pub fn retry_failed(&mut self) -> usize {
        self.queue.retry_dead()
    }

    /// Drop dead items. Their cached rows keep whatever state they have.
    pub fn purge_failed(&mut self) -> Vec<SyncQueueItem> {
        self.queue.purge_dead()
    }

    /// Items still eligible for replay.
    pub fn pending_count(&self) -> usize {
        self.queue.pending_count()
    }

    /// Items at the retry ceiling.
    pub fn failed_count(&self) -> usize {
        self.queue.dead_count()
    }

    /// Read a cached row.
    pub fn get(&self, kind: EntityKind, record_id: &str) -> Option<&CachedRecord> {
        self.cache.get(kind, record_id)
    }

    /// Cached rows of a table as plain JSON objects.
    pub fn rows(&self, kind: EntityKind) -> Vec<Value> {
        self.cache.rows(kind)
    }

    /// Cached productions that deserialize cleanly.
    pub fn productions(&self) -> Vec<ProductionRecord> {
        self.typed_rows(EntityKind::Productions)
    }

    /// Cached lands that deserialize cleanly.
    pub fn lands(&self) -> Vec<Land> {
        self.typed_rows(EntityKind::Lands)
    }

    fn typed_rows<T: serde::de::DeserializeOwned>(&self, kind: EntityKind) -> Vec<T> {
        self.cache
            .rows(kind)
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect()
    }
}
