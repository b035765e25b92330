//! Background polling of a single voting session.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{EntityStore, SessionSnapshot};
use crate::client::ApiClient;

/// Handle to a polling task. Dropping it cancels the task.
pub struct SessionWatcher {
    session_id: i64,
    snapshots: watch::Receiver<Option<SessionSnapshot>>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SessionWatcher {
    pub fn spawn(
        client: ApiClient,
        store: Arc<RwLock<EntityStore>>,
        session_id: i64,
        interval: Duration,
    ) -> Self {
        let (tx, rx) = watch::channel(None);
        let refresh = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let worker = PollWorker {
            client,
            store,
            session_id,
            tx,
            last_revision: None,
        };
        let handle = tokio::spawn(worker.run(interval, refresh.clone(), cancel.clone()));

        Self {
            session_id,
            snapshots: rx,
            refresh,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn session_id(&self) -> i64 {
        self.session_id
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionSnapshot>> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> Option<SessionSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Fetch now instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(session_id = self.session_id, error = %e, "Session watcher task failed");
            }
        }
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct PollWorker {
    client: ApiClient,
    store: Arc<RwLock<EntityStore>>,
    session_id: i64,
    tx: watch::Sender<Option<SessionSnapshot>>,
    last_revision: Option<i64>,
}

impl PollWorker {
    async fn run(mut self, interval: Duration, refresh: Arc<Notify>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(session_id = self.session_id, ?interval, "Session watcher started");

        loop {
            let forced = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => false,
                _ = refresh.notified() => true,
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.poll_once(forced) => {}
            }
        }

        tracing::debug!(session_id = self.session_id, "Session watcher stopped");
    }

    /// Re-fetch the session unless nothing changed server-side since the
    /// last fetch, then publish a snapshot.
    async fn poll_once(&mut self, forced: bool) {
        let revision = match self.client.revision().await {
            Ok(revision) => Some(revision),
            Err(e) => {
                tracing::debug!(error = %e, "Revision check failed");
                None
            }
        };
        let stale = self.store.read().await.is_stale(self.session_id);
        let unchanged = revision.is_some() && revision == self.last_revision;

        if forced || stale || !unchanged {
            match self.client.get_session(self.session_id).await {
                Ok(session) => {
                    self.store.write().await.put_session(session);
                    self.last_revision = revision;
                }
                Err(e) => {
                    tracing::warn!(session_id = self.session_id, error = %e, "Session refresh failed");
                }
            }
        }

        // Status depends on the clock, so the snapshot is rebuilt even when
        // the fetch was skipped.
        let snapshot = {
            let store = self.store.read().await;
            store
                .session(self.session_id)
                .map(|s| SessionSnapshot::new(s, Utc::now(), store.is_stale(self.session_id)))
        };
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}
