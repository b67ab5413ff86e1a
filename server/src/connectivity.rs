//! Network connectivity signal.
//!
//! A single boolean published on a `watch` channel. It is set either by the
//! background probe or manually through the control surface; the sync
//! coordinator subscribes and replays the queue on every offline to online
//! transition.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::remote::RemoteStore;

/// Shared online/offline flag.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Publish a new state. Returns whether it changed; subscribers are only
    /// woken on a change.
    pub fn set_online(&self, online: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Ping `remote` every `interval` and publish the result.
    pub fn spawn_probe(&self, remote: Arc<dyn RemoteStore>, interval: Duration) -> JoinHandle<()> {
        let connectivity = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let online = match remote.ping().await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::debug!(error = %e, "Connectivity probe failed");
                        false
                    }
                };
                if connectivity.set_online(online) {
                    tracing::info!(online, "Connectivity changed");
                }
            }
        })
    }
}
