//! Snapshots for persisting and restoring sync state.
//!
//! A snapshot is the durable form of the queue and the cache. Maps inside are
//! ordered, so serialising the same state always yields the same bytes.

use crate::cache::LocalCache;
use crate::queue::SyncQueue;
use crate::store::SyncState;
use crate::{error::Result, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Point-in-time copy of the sync state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Pending mutations
    pub queue: SyncQueue,
    /// Local mirror
    pub cache: LocalCache,
}

/// Summary of a snapshot without the rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub format_version: u32,
    pub taken_at: DateTime<Utc>,
    pub record_count: usize,
    pub unsynced_count: usize,
    pub queued_count: usize,
}

impl SyncSnapshot {
    /// Validate format and internal consistency.
    ///
    /// Queue ids must be unique and strictly increasing, since replay order
    /// is id order.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::SnapshotVersionMismatch {
                expected: SNAPSHOT_FORMAT_VERSION,
                actual: self.format_version,
            });
        }

        let items = self.queue.items();
        if items.windows(2).any(|pair| pair[0].id >= pair[1].id) {
            return Err(Error::InvalidSnapshot(
                "queue items out of order".to_string(),
            ));
        }

        Ok(())
    }

    pub fn metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            format_version: self.format_version,
            taken_at: self.taken_at,
            record_count: self.cache.record_count(),
            unsynced_count: self.cache.unsynced_count(),
            queued_count: self.queue.len(),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl SyncState {
    /// Export the current state.
    pub fn export_state(&self, now: DateTime<Utc>) -> SyncSnapshot {
        SyncSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            taken_at: now,
            queue: self.queue.clone(),
            cache: self.cache.clone(),
        }
    }

    /// Replace the current state with a snapshot.
    pub fn import_state(&mut self, snapshot: SyncSnapshot) -> Result<()> {
        snapshot.validate()?;
        self.queue = snapshot.queue;
        self.cache = snapshot.cache;
        Ok(())
    }
}
