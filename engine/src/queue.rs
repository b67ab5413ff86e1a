//! FIFO queue of pending mutations.

use crate::operation::{SyncOperation, SyncQueueItem};
use crate::{error::Result, EntityKind, Error, QueueItemId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered queue of mutations awaiting remote confirmation.
///
/// The queue only ever holds outstanding work: a successful replay removes
/// the item. Ids are assigned here and increase in enqueue order, so id
/// order is FIFO order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueue {
    /// Last id handed out
    last_id: QueueItemId,
    items: Vec<SyncQueueItem>,
}

impl SyncQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mutation and return its id.
    pub fn enqueue(
        &mut self,
        table: EntityKind,
        operation: SyncOperation,
        record_id: impl Into<RecordId>,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> QueueItemId {
        self.last_id += 1;
        let id = self.last_id;
        self.items.push(SyncQueueItem {
            id,
            table,
            operation,
            record_id: record_id.into(),
            data,
            retry_count: 0,
            last_error: None,
            enqueued_at: now,
            last_attempt_at: None,
        });
        id
    }

    /// All items in FIFO order, dead ones included.
    pub fn items(&self) -> &[SyncQueueItem] {
        &self.items
    }

    /// Get an item by id.
    pub fn get(&self, id: QueueItemId) -> Option<&SyncQueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Number of items, dead ones included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items still eligible for replay.
    pub fn pending_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_dead()).count()
    }

    /// Items at the retry ceiling.
    pub fn dead_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_dead()).count()
    }

    /// Remove an item after a successful replay.
    pub fn remove(&mut self, id: QueueItemId) -> Result<SyncQueueItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(Error::QueueItemNotFound(id))?;
        Ok(self.items.remove(index))
    }

    /// Record a failed replay; returns the new retry count.
    pub fn record_failure(
        &mut self,
        id: QueueItemId,
        error: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<u32> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(Error::QueueItemNotFound(id))?;
        item.record_failure(error, at);
        Ok(item.retry_count)
    }

    /// Whether any item other than `except` targets the record.
    pub fn has_other_for(&self, table: EntityKind, record_id: &str, except: QueueItemId) -> bool {
        self.items
            .iter()
            .any(|item| item.id != except && item.targets(table, record_id))
    }

    /// Drop items enqueued before `before` that target the record.
    pub fn remove_earlier_for(
        &mut self,
        table: EntityKind,
        record_id: &str,
        before: QueueItemId,
    ) -> Vec<SyncQueueItem> {
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| item.id < before && item.targets(table, record_id));
        self.items = kept;
        dropped
    }

    /// Operator-forced retry: reset dead items to zero retries.
    ///
    /// Returns how many items were revived.
    pub fn retry_dead(&mut self) -> usize {
        let mut revived = 0;
        for item in self.items.iter_mut().filter(|item| item.is_dead()) {
            item.retry_count = 0;
            revived += 1;
        }
        revived
    }

    /// Drop dead items from the queue and return them.
    pub fn purge_dead(&mut self) -> Vec<SyncQueueItem> {
        let (dead, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(SyncQueueItem::is_dead);
        self.items = live;
        dead
    }
}
