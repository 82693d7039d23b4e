//! Periodic reaper for idle sessions.
//!
//! Runs on a fixed interval independent of request traffic. Each pass
//! calls `SessionStore::reap`, which compares idle timestamps against the
//! scan start, so sessions touched while a pass runs are never removed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::SessionStore;

/// Handle to the background reaper task.
pub struct Reaper {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Reaper {
    /// Spawn the reaper loop on the current runtime.
    pub fn spawn(store: Arc<SessionStore>, idle_timeout: Duration, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a fresh store
            // is not scanned at startup.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = task_cancel.cancelled() => {
                        debug!("session reaper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = store.reap(idle_timeout);
                        if removed > 0 {
                            info!(removed, active = store.active_count(), "reaped idle sessions");
                        }
                    }
                }
            }
        });

        Self { handle, cancel }
    }

    /// Stop the loop and wait for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}
