//! Local mirror cache of remote rows.
//!
//! Each cached row carries a `_synced` flag: `false` means the local copy has
//! mutations that have not been replayed against the remote store yet.

use crate::{EntityKind, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A cached row plus its sync flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    /// The row fields, `id` included
    #[serde(flatten)]
    pub data: Map<String, Value>,
    /// Whether the row matches what the remote store holds
    #[serde(rename = "_synced")]
    pub synced: bool,
}

impl CachedRecord {
    /// Create a cached row.
    pub fn new(data: Map<String, Value>, synced: bool) -> Self {
        Self { data, synced }
    }

    /// The row's id, if it carries a string id.
    pub fn id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    /// Overwrite the given fields, keeping the rest.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// The row as a plain JSON object, without the sync flag.
    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

/// One local table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheTable {
    records: BTreeMap<RecordId, CachedRecord>,
}

impl CacheTable {
    pub fn get(&self, id: &str) -> Option<&CachedRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CachedRecord> {
        self.records.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &CachedRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// All local tables, keyed by entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalCache {
    tables: BTreeMap<EntityKind, CacheTable>,
}

impl LocalCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table, if anything was ever written to it.
    pub fn table(&self, kind: EntityKind) -> Option<&CacheTable> {
        self.tables.get(&kind)
    }

    fn table_mut(&mut self, kind: EntityKind) -> &mut CacheTable {
        self.tables.entry(kind).or_default()
    }

    /// Insert or overwrite a full row.
    pub fn put(&mut self, kind: EntityKind, id: impl Into<RecordId>, record: CachedRecord) {
        self.table_mut(kind).records.insert(id.into(), record);
    }

    /// Patch fields of an existing row and mark it unsynced.
    ///
    /// Returns `false` when the row is not cached; nothing is written then.
    pub fn update(&mut self, kind: EntityKind, id: &str, patch: &Map<String, Value>) -> bool {
        match self.tables.get_mut(&kind).and_then(|t| t.get_mut(id)) {
            Some(record) => {
                record.merge(patch);
                record.synced = false;
                true
            }
            None => false,
        }
    }

    /// Remove a row.
    pub fn delete(&mut self, kind: EntityKind, id: &str) -> Option<CachedRecord> {
        self.tables.get_mut(&kind)?.records.remove(id)
    }

    /// Read a row.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&CachedRecord> {
        self.tables.get(&kind)?.get(id)
    }

    /// Set the sync flag of a row. Returns `false` when the row is not cached.
    pub fn set_synced(&mut self, kind: EntityKind, id: &str, synced: bool) -> bool {
        match self.tables.get_mut(&kind).and_then(|t| t.get_mut(id)) {
            Some(record) => {
                record.synced = synced;
                true
            }
            None => false,
        }
    }

    /// Rows of a table as plain JSON objects, ordered by id.
    pub fn rows(&self, kind: EntityKind) -> Vec<Value> {
        self.tables
            .get(&kind)
            .map(|t| t.records.values().map(CachedRecord::to_value).collect())
            .unwrap_or_default()
    }

    /// Number of rows with unreplayed local changes, across all tables.
    pub fn unsynced_count(&self) -> usize {
        self.tables
            .values()
            .flat_map(|t| t.records.values())
            .filter(|r| !r.synced)
            .count()
    }

    /// Total number of cached rows.
    pub fn record_count(&self) -> usize {
        self.tables.values().map(CacheTable::len).sum()
    }
}
