//! Error types for the RINDANG engine.

use crate::{QueueItemId, RecordId};
use thiserror::Error;

/// All possible errors from the engine.
///
/// The schedule functions never return these; they clamp bad input instead.
/// Only the sync side (registry, cache, queue, snapshots) is fallible.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("missing required field '{field}' for table {table}")]
    MissingRequiredField { table: String, field: String },

    // Queue errors
    #[error("queue item not found: {0}")]
    QueueItemNotFound(QueueItemId),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("snapshot format mismatch: expected {expected}, got {actual}")]
    SnapshotVersionMismatch { expected: u32, actual: u32 },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
