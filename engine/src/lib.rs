//! # RINDANG Engine
//!
//! Pure logic behind the DigiFarm planting calendar and its offline write path.
//!
//! Nothing in this crate performs IO. Functions that need the current time
//! take it as a parameter, so the same inputs always produce the same state.
//!
//! ## Schedule
//!
//! - [`DateRange`] - inclusive day range; dates are parsed to UTC days at the
//!   boundary ([`parse_day`]) and never touch a local timezone
//! - [`find_all_conflicts`] - symmetric conflict index of productions that
//!   share a land and at least one day
//! - [`check_conflicts`] / [`next_free_start`] - planning helpers for a
//!   single candidate production
//! - [`bar_position`] - percentage geometry of a production bar on a year axis
//! - [`group_productions_by_land`] - per-land calendar rows
//!
//! ## Offline sync
//!
//! - [`EntityKind`] - closed set of mutable tables with their registry entry
//! - [`SyncQueue`] - FIFO of [`SyncQueueItem`]s with a retry ceiling of
//!   [`MAX_RETRY_COUNT`]
//! - [`LocalCache`] - mirror of remote rows flagged `_synced`
//! - [`SyncState`] - the queue and the cache moved together by the write path
//!   (`queue_create` / `queue_update` / `queue_delete`) and by replay outcomes
//!   (`complete` / `fail`)
//! - [`SyncSnapshot`] - durable JSON form of a [`SyncState`]
//!
//! ## Quick Start
//!
//! ```rust
//! use rindang_engine::{bar_position, find_all_conflicts, ProductionRecord};
//!
//! let productions = vec![
//!     ProductionRecord::new("p1", Some("l1"), "Padi", "2024-01-01").with_harvest("2024-03-01"),
//!     ProductionRecord::new("p2", Some("l1"), "Jagung", "2024-02-15")
//!         .with_estimated_harvest("2024-05-01"),
//! ];
//!
//! let conflicts = find_all_conflicts(&productions);
//! assert_eq!(conflicts["p1"][0].production_id, "p2");
//! assert_eq!(conflicts["p2"][0].production_id, "p1");
//!
//! let bar = bar_position(&productions[0].date_range().unwrap(), 2024);
//! assert!(bar.visible);
//! assert_eq!(bar.left, 0.0);
//! ```
//!
//! ```rust
//! use chrono::Utc;
//! use rindang_engine::{EntityKind, SyncState};
//! use serde_json::json;
//!
//! let mut state = SyncState::new();
//! let queued = state
//!     .queue_create(EntityKind::Lands, json!({"id": "l1", "name": "Sawah"}), Utc::now())
//!     .unwrap();
//! assert!(!state.get(EntityKind::Lands, "l1").unwrap().synced);
//!
//! // ... remote insert succeeded
//! state.complete(queued.item_id, None).unwrap();
//! assert!(state.get(EntityKind::Lands, "l1").unwrap().synced);
//! ```

pub mod cache;
pub mod calendar;
pub mod conflict;
pub mod date;
pub mod error;
pub mod grouping;
pub mod operation;
pub mod production;
pub mod queue;
pub mod reconcile;
pub mod snapshot;
pub mod store;
pub mod table;

// Re-export main types at crate root
pub use cache::{CacheTable, CachedRecord, LocalCache};
pub use calendar::{bar_position, day_marker, days_in_year, month_markers, BarPosition, MonthMarker};
pub use conflict::{
    check_conflicts, find_all_conflicts, has_conflict, next_free_start, ConflictDescriptor,
    ConflictMap,
};
pub use date::{parse_day, ranges_overlap, DateRange};
pub use error::Error;
pub use grouping::{group_productions_by_land, LandProductionGroup, ProductionWithRange};
pub use operation::{SyncOperation, SyncQueueItem, MAX_RETRY_COUNT};
pub use production::{to_date_range, Land, ProductionRecord, ProductionStatus};
pub use queue::SyncQueue;
pub use reconcile::ReconcileResult;
pub use snapshot::{SnapshotMetadata, SyncSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{QueuedMutation, SyncState};
pub use table::{EntityKind, TableSpec};

/// Type aliases for clarity
pub type ProductionId = String;
pub type LandId = String;
pub type RecordId = String;
pub type QueueItemId = u64;
