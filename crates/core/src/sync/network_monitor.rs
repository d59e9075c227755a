//! Derived network state for UI, plus the reconnect-sync trigger.
//!
//! A thin signal over the connectivity stream: it never drives the sync
//! repository's control flow, it only reports and kicks the scheduler when
//! the device comes back online.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::sync::scheduler::SyncScheduler;

/// Coarse connectivity state surfaced to UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "message")]
pub enum NetworkState {
    Unknown,
    Online,
    Offline,
    Error(String),
}

/// Observes a boolean connectivity stream and exposes [`NetworkState`].
pub struct NetworkMonitor {
    state_tx: watch::Sender<NetworkState>,
    connectivity_rx: watch::Receiver<bool>,
}

impl NetworkMonitor {
    pub fn new(connectivity_rx: watch::Receiver<bool>) -> Self {
        let (state_tx, _) = watch::channel(NetworkState::Unknown);
        Self {
            state_tx,
            connectivity_rx,
        }
    }

    pub fn state(&self) -> watch::Receiver<NetworkState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> NetworkState {
        self.state_tx.borrow().clone()
    }

    /// Park until the connectivity stream reports online. Used as the
    /// scheduler's network constraint gate.
    pub async fn wait_until_online(&self) {
        let mut rx = self.connectivity_rx.clone();
        if *rx.borrow_and_update() {
            return;
        }
        loop {
            if rx.changed().await.is_err() {
                // Connectivity source is gone; let the caller proceed and
                // surface failures through the normal retry path.
                warn!("Connectivity stream closed while waiting to go online");
                return;
            }
            if *rx.borrow_and_update() {
                return;
            }
        }
    }

    /// Overlay a sync failure on the state. The underlying connectivity
    /// belief is untouched; the next transition overwrites this.
    pub fn report_sync_error(&self, message: impl Into<String>) {
        self.state_tx
            .send_replace(NetworkState::Error(message.into()));
    }

    /// Observe connectivity transitions, updating the derived state and
    /// kicking a sync attempt on every reconnect.
    pub fn spawn_observer(self: &Arc<Self>, scheduler: Arc<SyncScheduler>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut rx = monitor.connectivity_rx.clone();
            let mut online = *rx.borrow_and_update();
            monitor.state_tx.send_replace(if online {
                NetworkState::Online
            } else {
                NetworkState::Offline
            });
            if online {
                scheduler.schedule_immediate(false);
            }

            while rx.changed().await.is_ok() {
                let now_online = *rx.borrow_and_update();
                if now_online == online {
                    continue;
                }
                online = now_online;
                if online {
                    info!("Connectivity restored, scheduling a sync attempt");
                    monitor.state_tx.send_replace(NetworkState::Online);
                    scheduler.schedule_immediate(false);
                } else {
                    debug!("Connectivity lost");
                    monitor.state_tx.send_replace(NetworkState::Offline);
                }
            }
        })
    }
}
