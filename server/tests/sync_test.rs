//! Integration tests for the sync coordinator.
//!
//! These run against the in-memory remote store; failures and latency are
//! injected through its test switches.

use std::sync::Arc;
use std::time::Duration;

use rindang_engine::{EntityKind, SyncState, MAX_RETRY_COUNT};
use rindang_server::{
    persist, AppError, ChannelSink, Connectivity, InMemoryRemote, SyncCoordinator, SyncEvent,
};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

/// Test helper: a coordinator over an empty state, wired to a channel sink.
fn coordinator(
    remote: &Arc<InMemoryRemote>,
    online: bool,
) -> (Arc<SyncCoordinator>, UnboundedReceiver<SyncEvent>) {
    let (sink, rx) = ChannelSink::new();
    let coordinator = SyncCoordinator::new(SyncState::new(), remote.clone(), Connectivity::new(online))
        .with_events(Arc::new(sink));
    (Arc::new(coordinator), rx)
}

fn land(id: &str) -> Value {
    json!({"id": id, "name": "Sawah Utara", "area_m2": 2500.0})
}

fn production(id: &str, land_id: &str) -> Value {
    json!({
        "id": id,
        "land_id": land_id,
        "commodity": "Padi",
        "planting_date": "2024-01-01",
        "estimated_harvest_date": "2024-04-10"
    })
}

fn is_synced(record: &Option<Value>) -> Option<bool> {
    record.as_ref()?.get("_synced")?.as_bool()
}

/// Wait for the next event matching `pick`, skipping others.
async fn next_event<T>(
    rx: &mut UnboundedReceiver<SyncEvent>,
    pick: impl Fn(&SyncEvent) -> Option<T>,
) -> T {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if let Some(value) = pick(&event) {
                return value;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[cfg(test)]
mod replay_tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_writes_replay_in_fifo_order() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, _rx) = coordinator(&remote, false);

        coordinator
            .queue_create(EntityKind::Lands, land("l1"))
            .await
            .unwrap();
        coordinator
            .queue_create(EntityKind::Productions, production("p1", "l1"))
            .await
            .unwrap();
        coordinator
            .queue_update(EntityKind::Productions, "p1", json!({"status": "growing"}))
            .await
            .unwrap();

        assert!(remote.calls().await.is_empty());
        assert_eq!(coordinator.status().await.pending, 3);

        coordinator.connectivity().set_online(true);
        let report = coordinator.sync_now().await.unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);

        let calls: Vec<_> = remote
            .calls()
            .await
            .into_iter()
            .map(|call| (call.op, call.table, call.id.unwrap_or_default()))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("insert", "lands".to_string(), "l1".to_string()),
                ("insert", "productions".to_string(), "p1".to_string()),
                ("update", "productions".to_string(), "p1".to_string()),
            ]
        );

        let stored = remote.rows("productions").await;
        assert_eq!(stored[0]["status"], "growing");

        let cached = coordinator.get(EntityKind::Productions, "p1").await;
        assert_eq!(is_synced(&cached), Some(true));
        assert_eq!(coordinator.status().await.pending, 0);
    }

    #[tokio::test]
    async fn test_transactions_use_remote_endpoint() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, _rx) = coordinator(&remote, true);

        coordinator
            .queue_create(
                EntityKind::Transactions,
                json!({"id": "t1", "type": "expense", "amount": 150000, "date": "2024-02-01"}),
            )
            .await
            .unwrap();

        assert_eq!(remote.rows("financial_transactions").await.len(), 1);
        assert!(remote.rows("transactions").await.is_empty());
    }

    #[tokio::test]
    async fn test_write_while_online_syncs_immediately() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, mut rx) = coordinator(&remote, true);

        let mutation = coordinator
            .queue_create(EntityKind::Lands, json!({"name": "Kebun Belakang"}))
            .await
            .unwrap();

        // The id was generated locally and travelled with the payload
        let stored = remote.rows("lands").await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["id"], mutation.record_id.as_str());

        let cached = coordinator.get(EntityKind::Lands, &mutation.record_id).await;
        assert_eq!(is_synced(&cached), Some(true));

        let queued = next_event(&mut rx, |event| match event {
            SyncEvent::Queued { record_id, .. } => Some(record_id.clone()),
            _ => None,
        })
        .await;
        assert_eq!(queued, mutation.record_id);

        let (succeeded, failed) = next_event(&mut rx, |event| match event {
            SyncEvent::PassCompleted { succeeded, failed } => Some((*succeeded, *failed)),
            _ => None,
        })
        .await;
        assert_eq!((succeeded, failed), (1, 0));
    }

    #[tokio::test]
    async fn test_invalid_create_is_rejected_before_queueing() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, _rx) = coordinator(&remote, false);

        let result = coordinator
            .queue_create(EntityKind::Productions, json!({"id": "p1", "commodity": "Padi"}))
            .await;

        assert!(matches!(result, Err(AppError::Engine(_))));
        assert_eq!(coordinator.status().await.pending, 0);
        assert!(coordinator.get(EntityKind::Productions, "p1").await.is_none());
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;

    /// Queue one land offline and fail it until it is dead.
    async fn dead_item(remote: &Arc<InMemoryRemote>) -> Arc<SyncCoordinator> {
        let (coordinator, _rx) = coordinator(remote, false);
        coordinator
            .queue_create(EntityKind::Lands, land("l1"))
            .await
            .unwrap();

        remote.fail_with("connection reset").await;
        coordinator.connectivity().set_online(true);
        for _ in 0..MAX_RETRY_COUNT {
            let report = coordinator.sync_now().await.unwrap();
            assert_eq!(report.failed, 1);
        }
        coordinator
    }

    #[tokio::test]
    async fn test_item_dies_after_max_retries() {
        let remote = Arc::new(InMemoryRemote::new());
        let coordinator = dead_item(&remote).await;

        let status = coordinator.status().await;
        assert_eq!(status.pending, 0);
        assert_eq!(status.failed, 1);

        let items = coordinator.queue_items().await;
        assert_eq!(items[0].retry_count, MAX_RETRY_COUNT);
        assert!(items[0]
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("connection reset")));

        // A further pass reports the dead item but leaves it alone
        let report = coordinator.sync_now().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(coordinator.queue_items().await[0].retry_count, MAX_RETRY_COUNT);
        assert_eq!(remote.calls().await.len(), MAX_RETRY_COUNT as usize);

        let cached = coordinator.get(EntityKind::Lands, "l1").await;
        assert_eq!(is_synced(&cached), Some(false));
    }

    #[tokio::test]
    async fn test_failing_items_all_stay_queued_at_ceiling() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, _rx) = coordinator(&remote, false);
        for id in ["l1", "l2", "l3"] {
            coordinator
                .queue_create(EntityKind::Lands, land(id))
                .await
                .unwrap();
        }

        remote.fail_with("server error").await;
        coordinator.connectivity().set_online(true);
        for _ in 0..=MAX_RETRY_COUNT {
            coordinator.sync_now().await.unwrap();
        }

        let items = coordinator.queue_items().await;
        let ids: Vec<_> = items.iter().map(|item| item.record_id.as_str()).collect();
        assert_eq!(ids, vec!["l1", "l2", "l3"]);
        assert!(items.iter().all(|item| item.retry_count == MAX_RETRY_COUNT));
        assert_eq!(remote.calls().await.len(), 3 * MAX_RETRY_COUNT as usize);
    }

    #[tokio::test]
    async fn test_retry_failed_replays_dead_items() {
        let remote = Arc::new(InMemoryRemote::new());
        let coordinator = dead_item(&remote).await;

        remote.recover().await;
        assert_eq!(coordinator.retry_failed().await.unwrap(), 1);

        let status = coordinator.status().await;
        assert_eq!(status.pending, 0);
        assert_eq!(status.failed, 0);
        assert_eq!(remote.rows("lands").await.len(), 1);
    }

    #[tokio::test]
    async fn test_confirmed_delete_clears_dead_create() {
        let remote = Arc::new(InMemoryRemote::new());
        let coordinator = dead_item(&remote).await;

        remote.recover().await;
        coordinator
            .queue_delete(EntityKind::Lands, "l1")
            .await
            .unwrap();

        assert!(coordinator.get(EntityKind::Lands, "l1").await.is_none());
        assert!(coordinator.queue_items().await.is_empty());
        assert_eq!(coordinator.retry_failed().await.unwrap(), 0);
        assert!(remote.rows("lands").await.is_empty());
    }

    #[tokio::test]
    async fn test_purge_failed_keeps_cached_row() {
        let remote = Arc::new(InMemoryRemote::new());
        let coordinator = dead_item(&remote).await;

        let purged = coordinator.purge_failed().await.unwrap();
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].record_id, "l1");
        assert!(coordinator.queue_items().await.is_empty());

        let cached = coordinator.get(EntityKind::Lands, "l1").await;
        assert_eq!(is_synced(&cached), Some(false));
    }

    #[tokio::test]
    async fn test_replay_timeout_counts_as_failure() {
        let remote = Arc::new(InMemoryRemote::new().with_latency(Duration::from_millis(200)));
        let coordinator = SyncCoordinator::new(
            SyncState::new(),
            remote.clone(),
            Connectivity::new(false),
        )
        .with_replay_timeout(Some(Duration::from_millis(20)));

        coordinator
            .queue_create(EntityKind::Lands, land("l1"))
            .await
            .unwrap();
        coordinator.connectivity().set_online(true);

        let report = coordinator.sync_now().await.unwrap();
        assert_eq!(report.failed, 1);

        let items = coordinator.queue_items().await;
        assert_eq!(items[0].retry_count, 1);
        assert!(items[0]
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("timed out")));
        assert!(remote.rows("lands").await.is_empty());
    }
}

#[cfg(test)]
mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_keeps_row_until_remote_confirms() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, _rx) = coordinator(&remote, true);

        coordinator
            .queue_create(EntityKind::Lands, land("l1"))
            .await
            .unwrap();
        assert_eq!(remote.rows("lands").await.len(), 1);

        coordinator.connectivity().set_online(false);
        coordinator
            .queue_delete(EntityKind::Lands, "l1")
            .await
            .unwrap();

        let cached = coordinator.get(EntityKind::Lands, "l1").await;
        assert_eq!(is_synced(&cached), Some(false));
        assert_eq!(remote.rows("lands").await.len(), 1);

        coordinator.connectivity().set_online(true);
        coordinator.sync_now().await.unwrap();

        assert!(coordinator.get(EntityKind::Lands, "l1").await.is_none());
        assert!(remote.rows("lands").await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_row_readable() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, _rx) = coordinator(&remote, true);
        coordinator
            .queue_create(EntityKind::Lands, land("l1"))
            .await
            .unwrap();

        remote.fail_with("503").await;
        coordinator
            .queue_delete(EntityKind::Lands, "l1")
            .await
            .unwrap();

        assert!(coordinator.get(EntityKind::Lands, "l1").await.is_some());
        assert_eq!(coordinator.queue_items().await[0].retry_count, 1);
    }
}

#[cfg(test)]
mod connectivity_tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_sync_runs_once() {
        let remote = Arc::new(InMemoryRemote::new().with_latency(Duration::from_millis(50)));
        let (coordinator, _rx) = coordinator(&remote, false);
        coordinator
            .queue_create(EntityKind::Lands, land("l1"))
            .await
            .unwrap();
        coordinator
            .queue_create(EntityKind::Lands, land("l2"))
            .await
            .unwrap();
        coordinator.connectivity().set_online(true);

        let (first, second) = tokio::join!(coordinator.sync_now(), coordinator.sync_now());
        assert!(first.is_some() != second.is_some());

        let report = first.or(second).unwrap();
        assert_eq!(report.succeeded, 2);
        assert_eq!(remote.calls().await.len(), 2);
        assert!(!coordinator.status().await.syncing);
    }

    #[tokio::test]
    async fn test_offline_sync_is_a_no_op() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, _rx) = coordinator(&remote, false);
        coordinator
            .queue_create(EntityKind::Lands, land("l1"))
            .await
            .unwrap();

        assert!(coordinator.sync_now().await.is_none());
        assert_eq!(coordinator.queue_items().await[0].retry_count, 0);
        assert!(remote.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_triggers_sync() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, mut rx) = coordinator(&remote, false);
        coordinator.start().await;

        coordinator
            .queue_create(EntityKind::Lands, land("l1"))
            .await
            .unwrap();
        coordinator.connectivity().set_online(true);

        next_event(&mut rx, |event| {
            matches!(event, SyncEvent::WentOnline).then_some(())
        })
        .await;
        let succeeded = next_event(&mut rx, |event| match event {
            SyncEvent::PassCompleted { succeeded, .. } => Some(*succeeded),
            _ => None,
        })
        .await;
        assert_eq!(succeeded, 1);
        assert_eq!(remote.rows("lands").await.len(), 1);

        coordinator.connectivity().set_online(false);
        next_event(&mut rx, |event| {
            matches!(event, SyncEvent::WentOffline).then_some(())
        })
        .await;

        coordinator.shutdown().await.unwrap();
    }
}

#[cfg(test)]
mod pull_tests {
    use super::*;

    #[tokio::test]
    async fn test_pull_keeps_local_changes() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.seed("lands", json!({"id": "l1", "name": "Remote A"})).await;
        remote.seed("lands", json!({"id": "l2", "name": "Remote B"})).await;

        let (coordinator, _rx) = coordinator(&remote, true);
        let first = coordinator.pull(EntityKind::Lands).await.unwrap();
        assert_eq!(first.inserted.len(), 2);

        coordinator.connectivity().set_online(false);
        coordinator
            .queue_update(EntityKind::Lands, "l1", json!({"name": "Local edit"}))
            .await
            .unwrap();

        coordinator.connectivity().set_online(true);
        let second = coordinator.pull(EntityKind::Lands).await.unwrap();
        assert_eq!(second.kept_local, vec!["l1".to_string()]);

        let cached = coordinator.get(EntityKind::Lands, "l1").await.unwrap();
        assert_eq!(cached["name"], "Local edit");
    }

    #[tokio::test]
    async fn test_pull_offline_fails() {
        let remote = Arc::new(InMemoryRemote::new());
        let (coordinator, _rx) = coordinator(&remote, false);
        assert!(matches!(
            coordinator.pull(EntityKind::Lands).await,
            Err(AppError::Offline)
        ));
    }
}

#[cfg(test)]
mod persistence_tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let remote = Arc::new(InMemoryRemote::new());

        {
            let coordinator = SyncCoordinator::new(
                SyncState::new(),
                remote.clone(),
                Connectivity::new(false),
            )
            .with_persistence(&path);
            coordinator
                .queue_create(EntityKind::Lands, land("l1"))
                .await
                .unwrap();
            coordinator
                .queue_create(EntityKind::Productions, production("p1", "l1"))
                .await
                .unwrap();
            coordinator.shutdown().await.unwrap();
        }

        let state = persist::load_state(&path).await.unwrap();
        assert_eq!(state.pending_count(), 2);

        let coordinator = SyncCoordinator::new(state, remote.clone(), Connectivity::new(true))
            .with_persistence(&path);
        let report = coordinator.sync_now().await.unwrap();
        assert_eq!(report.succeeded, 2);

        let reloaded = persist::load_state(&path).await.unwrap();
        assert_eq!(reloaded.pending_count(), 0);
        assert_eq!(reloaded.productions().len(), 1);
    }

    #[tokio::test]
    async fn test_write_applies_when_snapshot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("state.json");
        let remote = Arc::new(InMemoryRemote::new());

        let coordinator = SyncCoordinator::new(SyncState::new(), remote, Connectivity::new(false))
            .with_persistence(&path);
        let mutation = coordinator
            .queue_create(EntityKind::Lands, land("l1"))
            .await
            .unwrap();

        assert_eq!(mutation.record_id, "l1");
        assert_eq!(coordinator.status().await.pending, 1);
        assert!(coordinator.get(EntityKind::Lands, "l1").await.is_some());
        assert!(!path.exists());
        // The final snapshot still reports the problem
        assert!(coordinator.shutdown().await.is_err());
    }
}
