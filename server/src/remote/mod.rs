//! Remote store abstraction.
//!
//! The dispatcher only needs three mutations plus a full table read for
//! pulls and a cheap reachability check for the connectivity probe.

mod memory;
mod rest;

pub use memory::{InMemoryRemote, RemoteCall};
pub use rest::RestRemoteStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RemoteError;

/// A remote table store. `table` is the remote endpoint name from the
/// table registry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert a row; returns the stored row, or `Null` if the store echoes
    /// nothing back.
    async fn insert(&self, table: &str, payload: &Value) -> Result<Value, RemoteError>;

    /// Update the given fields of the row with `id`.
    async fn update(&self, table: &str, id: &str, payload: &Value) -> Result<(), RemoteError>;

    /// Delete the row with `id`.
    async fn delete(&self, table: &str, id: &str) -> Result<(), RemoteError>;

    /// Read every row of a table.
    async fn select_all(&self, table: &str) -> Result<Vec<Value>, RemoteError>;

    /// Succeeds when the store can be reached at all.
    async fn ping(&self) -> Result<(), RemoteError>;
}
