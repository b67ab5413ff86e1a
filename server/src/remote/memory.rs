//! In-process remote store.
//!
//! Used when no remote URL is configured and by the integration tests,
//! which drive its failure switch and latency to exercise the dispatcher.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::RemoteStore;
use crate::error::RemoteError;

/// One call seen by the store, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub op: &'static str,
    pub table: String,
    pub id: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: BTreeMap<String, BTreeMap<String, Value>>,
    failure: Option<String>,
    unreachable: bool,
    calls: Vec<RemoteCall>,
}

/// Remote store keeping rows in memory.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every mutation fail with `message` until [`recover`] is called.
    ///
    /// [`recover`]: InMemoryRemote::recover
    pub async fn fail_with(&self, message: impl Into<String>) {
        self.inner.lock().await.failure = Some(message.into());
    }

    pub async fn recover(&self) {
        self.inner.lock().await.failure = None;
    }

    /// Toggle whether [`RemoteStore::ping`] succeeds.
    pub async fn set_reachable(&self, reachable: bool) {
        self.inner.lock().await.unreachable = !reachable;
    }

    /// Seed a row without recording a call.
    pub async fn seed(&self, table: &str, row: Value) {
        let mut inner = self.inner.lock().await;
        if let Some(id) = row_id(&row) {
            inner
                .tables
                .entry(table.to_string())
                .or_default()
                .insert(id, row);
        }
    }

    /// Stored rows of a table, ordered by id.
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Every call made so far.
    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().await.calls.clone()
    }

    async fn begin(
        &self,
        op: &'static str,
        table: &str,
        id: Option<&str>,
    ) -> Result<tokio::sync::MutexGuard<'_, Inner>, RemoteError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut inner = self.inner.lock().await;
        inner.calls.push(RemoteCall {
            op,
            table: table.to_string(),
            id: id.map(str::to_string),
        });
        if let Some(message) = &inner.failure {
            return Err(RemoteError::Rejected(message.clone()));
        }
        Ok(inner)
    }
}

fn row_id(row: &Value) -> Option<String> {
    row.get("id").and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn insert(&self, table: &str, payload: &Value) -> Result<Value, RemoteError> {
        let id = row_id(payload);
        let mut inner = self.begin("insert", table, id.as_deref()).await?;
        let Some(id) = id else {
            return Err(RemoteError::Rejected("row has no id".into()));
        };

        let rows = inner.tables.entry(table.to_string()).or_default();
        if rows.contains_key(&id) {
            return Err(RemoteError::Status {
                status: 409,
                body: format!("duplicate key: {id}"),
            });
        }
        rows.insert(id, payload.clone());
        Ok(payload.clone())
    }

    async fn update(&self, table: &str, id: &str, payload: &Value) -> Result<(), RemoteError> {
        let mut inner = self.begin("update", table, Some(id)).await?;
        let row = inner
            .tables
            .get_mut(table)
            .and_then(|rows| rows.get_mut(id));
        if let (Some(Value::Object(row)), Value::Object(patch)) = (row, payload) {
            for (key, value) in patch {
                row.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError> {
        let mut inner = self.begin("delete", table, Some(id)).await?;
        if let Some(rows) = inner.tables.get_mut(table) {
            rows.remove(id);
        }
        Ok(())
    }

    async fn select_all(&self, table: &str) -> Result<Vec<Value>, RemoteError> {
        let inner = self.begin("select", table, None).await?;
        Ok(inner
            .tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), RemoteError> {
        if self.inner.lock().await.unreachable {
            return Err(RemoteError::Rejected("unreachable".into()));
        }
        Ok(())
    }
}
