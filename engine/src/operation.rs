//! Queued mutations.
//!
//! Every local change becomes a queue item that is replayed against the
//! remote store later. Items are never mutated except for their retry
//! bookkeeping; success removes them.

use crate::{EntityKind, QueueItemId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retry ceiling. An item whose `retry_count` reaches this is dead: it stays
/// in the queue but is skipped until an operator retries or purges it.
pub const MAX_RETRY_COUNT: u32 = 3;

/// Kind of mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncOperation::Create => "create",
            SyncOperation::Update => "update",
            SyncOperation::Delete => "delete",
        }
    }
}

/// A pending mutation waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    /// Assigned by the queue, increasing in enqueue order
    pub id: QueueItemId,
    /// Target table
    pub table: EntityKind,
    pub operation: SyncOperation,
    /// Target record
    pub record_id: RecordId,
    /// Full row for creates, changed fields for updates, null for deletes
    pub data: serde_json::Value,
    /// Failed replay attempts so far
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl SyncQueueItem {
    /// Whether the item reached the retry ceiling.
    pub fn is_dead(&self) -> bool {
        self.retry_count >= MAX_RETRY_COUNT
    }

    /// Record a failed replay.
    pub fn record_failure(&mut self, error: impl Into<String>, at: DateTime<Utc>) {
        self.retry_count += 1;
        self.last_error = Some(error.into());
        self.last_attempt_at = Some(at);
    }

    /// Whether this item targets the given record.
    pub fn targets(&self, table: EntityKind, record_id: &str) -> bool {
        self.table == table && self.record_id == record_id
    }
}
