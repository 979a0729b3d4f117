use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex as StdMutex,
};
use std::time::Duration;

use chrono::Utc;
use shared::{domain::LogoTransform, protocol::MockupUpdateRequest};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    project_store::RemoteProjectStore, store_failure_message, EditorEvent, Notice,
    NotificationSink, SharedState,
};

/// Quiet period after the last edit before a save is issued. Continuous
/// drag/resize gestures emit many intermediate values; only the final one
/// per quiet period reaches the backend.
pub const QUIET_INTERVAL: Duration = Duration::from_secs(1);

const SAVE_FAILED_FALLBACK: &str = "Failed to save logo changes.";

/// Coalesces the editor's continuous transform stream into one persistence
/// call per quiet period, always carrying the latest snapshot.
///
/// Every edit replaces the previously scheduled flush. The save itself runs
/// detached from the timer task, so a reschedule or teardown cancels only
/// the quiet-period wait; a network call already issued runs to completion
/// but its write-back is discarded once a newer flush supersedes it.
pub struct TransformSyncController {
    store: Arc<dyn RemoteProjectStore>,
    notifications: Arc<dyn NotificationSink>,
    state: SharedState,
    events: broadcast::Sender<EditorEvent>,
    quiet_interval: Duration,
    pending_timer: StdMutex<Option<JoinHandle<()>>>,
    issued_seq: Arc<AtomicU64>,
}

impl TransformSyncController {
    pub fn new(
        store: Arc<dyn RemoteProjectStore>,
        notifications: Arc<dyn NotificationSink>,
        state: SharedState,
        events: broadcast::Sender<EditorEvent>,
    ) -> Self {
        Self {
            store,
            notifications,
            state,
            events,
            quiet_interval: QUIET_INTERVAL,
            pending_timer: StdMutex::new(None),
            issued_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_quiet_interval(mut self, quiet_interval: Duration) -> Self {
        self.quiet_interval = quiet_interval;
        self
    }

    /// Called synchronously by the editor on every transform delta. Restarts
    /// the quiet-period timer and discards the previously scheduled
    /// snapshot; when the timer elapses, exactly one save with the latest
    /// snapshot is issued.
    pub fn on_transform_change(&self, transform: LogoTransform) {
        let seq = self.issued_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let flush = PendingFlush {
            store: Arc::clone(&self.store),
            notifications: Arc::clone(&self.notifications),
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            issued_seq: Arc::clone(&self.issued_seq),
            seq,
            transform,
        };
        let quiet_interval = self.quiet_interval;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet_interval).await;
            // Timer elapsed: detach the save so that aborting this handle
            // can only ever cancel a wait, never an issued network call.
            tokio::spawn(flush.run());
        });
        self.replace_pending_timer(Some(timer));
    }

    /// Tears the controller down: the pending timer is released and any
    /// save still in flight is barred from touching session state.
    pub fn shutdown(&self) {
        self.issued_seq.fetch_add(1, Ordering::SeqCst);
        self.replace_pending_timer(None);
        debug!("transform sync shut down");
    }

    fn replace_pending_timer(&self, timer: Option<JoinHandle<()>>) {
        let mut slot = match self.pending_timer.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = std::mem::replace(&mut *slot, timer) {
            previous.abort();
        }
    }
}

impl Drop for TransformSyncController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct PendingFlush {
    store: Arc<dyn RemoteProjectStore>,
    notifications: Arc<dyn NotificationSink>,
    state: SharedState,
    events: broadcast::Sender<EditorEvent>,
    issued_seq: Arc<AtomicU64>,
    seq: u64,
    transform: LogoTransform,
}

impl PendingFlush {
    fn is_superseded(&self) -> bool {
        self.issued_seq.load(Ordering::SeqCst) != self.seq
    }

    async fn run(self) {
        if self.is_superseded() {
            return;
        }

        // The backend expects a complete record, so unrelated fields are
        // carried through from current project state.
        let (project_id, request) = {
            let guard = self.state.lock().await;
            let Some(project) = guard.current_project.as_ref() else {
                return;
            };
            (
                project.id,
                MockupUpdateRequest::from_state(
                    self.transform,
                    project.marking_zone,
                    project.marking_technique.clone(),
                ),
            )
        };

        match self.store.update_mockup(project_id, request).await {
            Ok(_) => {
                if self.is_superseded() {
                    debug!(
                        project_id = project_id.0,
                        seq = self.seq,
                        "stale transform save completed; skipping write-back"
                    );
                    return;
                }
                let updated = {
                    let mut guard = self.state.lock().await;
                    match guard.current_project.as_mut() {
                        Some(project) if project.id == project_id => {
                            project.transform = self.transform;
                            project.updated_at = Utc::now();
                            Some(project.clone())
                        }
                        _ => None,
                    }
                };
                if let Some(project) = updated {
                    debug!(project_id = project_id.0, seq = self.seq, "transform saved");
                    let _ = self.events.send(EditorEvent::ProjectUpdated(project));
                }
            }
            Err(err) => {
                if self.is_superseded() {
                    return;
                }
                warn!(
                    project_id = project_id.0,
                    "failed to save logo transform: {err}"
                );
                self.notifications.notify(Notice::error(
                    "Save failed",
                    store_failure_message(&err, SAVE_FAILED_FALLBACK),
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/transform_sync_tests.rs"]
mod tests;
