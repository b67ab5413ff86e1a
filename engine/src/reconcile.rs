//! Reconciliation of the local cache with a fresh read of a remote table.
//!
//! The remote read is authoritative for rows without local changes. Rows
//! with local changes still waiting in the queue are left alone; the queue
//! will push them out, and the next pull picks up the result.

use crate::cache::CachedRecord;
use crate::store::SyncState;
use crate::{EntityKind, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// What a pull changed in the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    /// Remote rows not previously cached
    pub inserted: Vec<RecordId>,
    /// Synced rows overwritten with the remote version
    pub updated: Vec<RecordId>,
    /// Synced rows gone from the remote, removed locally
    pub removed: Vec<RecordId>,
    /// Rows with local changes that were left untouched
    pub kept_local: Vec<RecordId>,
    /// Remote rows without a string id, ignored
    pub skipped: usize,
}

impl SyncState {
    /// Merge a full remote read of `kind` into the cache.
    pub fn apply_remote_rows(&mut self, kind: EntityKind, rows: Vec<Value>) -> ReconcileResult {
        let mut result = ReconcileResult::default();
        let mut remote_ids = HashSet::new();

        for row in rows {
            let Value::Object(data) = row else {
                result.skipped += 1;
                continue;
            };
            let Some(id) = data.get("id").and_then(Value::as_str).map(str::to_string) else {
                result.skipped += 1;
                continue;
            };
            remote_ids.insert(id.clone());

            if self.has_local_changes(kind, &id) {
                result.kept_local.push(id);
                continue;
            }

            let unchanged = self.cache.get(kind, &id).map(|cached| cached.data == data);
            match unchanged {
                Some(true) => {}
                Some(false) => {
                    self.cache.put(kind, id.clone(), CachedRecord::new(data, true));
                    result.updated.push(id);
                }
                None => {
                    self.cache.put(kind, id.clone(), CachedRecord::new(data, true));
                    result.inserted.push(id);
                }
            }
        }

        let stale: Vec<RecordId> = self
            .cache
            .table(kind)
            .map(|table| {
                table
                    .iter()
                    .filter(|(id, _)| !remote_ids.contains(id.as_str()))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default();

        for id in stale {
            if self.has_local_changes(kind, &id) {
                result.kept_local.push(id);
            } else {
                self.cache.delete(kind, &id);
                result.removed.push(id);
            }
        }

        result
    }

    fn has_local_changes(&self, kind: EntityKind, id: &str) -> bool {
        let unsynced = self.cache.get(kind, id).is_some_and(|r| !r.synced);
        unsynced || self.queue.items().iter().any(|item| item.targets(kind, id))
    }
}
