use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use shared::{
    domain::{ImageSlot, LogoTransform, Project},
    protocol::MarkingTechnique,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

mod generation;
mod project_store;
mod transform_sync;
mod upload;

pub use generation::GenerationOrchestrator;
pub use project_store::{HttpProjectStore, MissingProjectStore, RemoteProjectStore};
pub use transform_sync::{TransformSyncController, QUIET_INTERVAL};
pub use upload::{UploadError, UploadFile, UploadGateway, UploadResult, MAX_UPLOAD_BYTES};

const TECHNIQUES_FAILED_FALLBACK: &str = "Failed to load marking techniques.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-facing message surfaced through the notification sink; never blocks
/// the flow it reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    fn notify(&self, notice: Notice) {
        debug!(title = %notice.title, "notice dropped (no sink attached)");
    }
}

/// What the preview modal needs to present a generated result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandOff {
    pub result_image_url: String,
    pub project_name: String,
    pub technique: String,
}

pub trait PreviewPresenter: Send + Sync {
    fn open(&self, preview: PreviewHandOff);
    fn close(&self);
}

pub struct NullPreviewPresenter;

impl PreviewPresenter for NullPreviewPresenter {
    fn open(&self, preview: PreviewHandOff) {
        debug!(project = %preview.project_name, "preview dropped (no presenter attached)");
    }

    fn close(&self) {}
}

#[derive(Debug, Clone)]
pub enum EditorEvent {
    ProjectUpdated(Project),
    TechniquesLoaded(Vec<MarkingTechnique>),
    PreviewReady { result_image_url: String },
}

/// Session-owned mutable record shared by the components. There is exactly
/// one logical owner (the session); components interleave on the single
/// async lock, never in parallel.
#[derive(Default)]
pub struct EditorState {
    pub current_project: Option<Project>,
    pub techniques: Vec<MarkingTechnique>,
    pub loading: bool,
}

pub type SharedState = Arc<Mutex<EditorState>>;

/// One editing session over one mockup project at a time. Wires the
/// transform-sync, upload, and generation components over a shared state
/// record and an injected remote store.
pub struct EditorSession {
    store: Arc<dyn RemoteProjectStore>,
    notifications: Arc<dyn NotificationSink>,
    presenter: Arc<dyn PreviewPresenter>,
    state: SharedState,
    transform_sync: TransformSyncController,
    uploads: UploadGateway,
    generation: GenerationOrchestrator,
    events: broadcast::Sender<EditorEvent>,
}

impl EditorSession {
    pub fn new(store: Arc<dyn RemoteProjectStore>) -> Arc<Self> {
        Self::new_with_dependencies(
            store,
            Arc::new(NullNotificationSink),
            Arc::new(NullPreviewPresenter),
        )
    }

    pub fn new_with_dependencies(
        store: Arc<dyn RemoteProjectStore>,
        notifications: Arc<dyn NotificationSink>,
        presenter: Arc<dyn PreviewPresenter>,
    ) -> Arc<Self> {
        Self::assemble(store, notifications, presenter, QUIET_INTERVAL)
    }

    fn assemble(
        store: Arc<dyn RemoteProjectStore>,
        notifications: Arc<dyn NotificationSink>,
        presenter: Arc<dyn PreviewPresenter>,
        quiet_interval: Duration,
    ) -> Arc<Self> {
        let state: SharedState = Arc::new(Mutex::new(EditorState::default()));
        let (events, _) = broadcast::channel(1024);
        let transform_sync = TransformSyncController::new(
            Arc::clone(&store),
            Arc::clone(&notifications),
            Arc::clone(&state),
            events.clone(),
        )
        .with_quiet_interval(quiet_interval);
        let uploads = UploadGateway::new(
            Arc::clone(&store),
            Arc::clone(&notifications),
            Arc::clone(&state),
            events.clone(),
        );
        let generation = GenerationOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&notifications),
            Arc::clone(&presenter),
            Arc::clone(&state),
            events.clone(),
        );
        Arc::new(Self {
            store,
            notifications,
            presenter,
            state,
            transform_sync,
            uploads,
            generation,
            events,
        })
    }

    /// Installs a project as the current one. Any flush still pending for
    /// the previous project is released first so it can neither fire nor
    /// write back against the new selection.
    pub async fn select_project(&self, project: Project) {
        self.transform_sync.shutdown();
        let installed = {
            let mut guard = self.state.lock().await;
            guard.loading = false;
            guard.current_project = Some(project);
            guard.current_project.clone()
        };
        if let Some(project) = installed {
            info!(project_id = project.id.0, name = %project.name, "project selected");
            let _ = self.events.send(EditorEvent::ProjectUpdated(project));
        }
    }

    /// Ends the editing session: the pending flush timer is released and no
    /// save fires afterwards.
    pub async fn shutdown(&self) {
        self.transform_sync.shutdown();
        let mut guard = self.state.lock().await;
        guard.current_project = None;
        guard.loading = false;
        debug!("editor session shut down");
    }

    pub fn on_transform_change(&self, transform: LogoTransform) {
        self.transform_sync.on_transform_change(transform);
    }

    pub async fn upload_image(
        &self,
        file: Option<UploadFile>,
        slot: ImageSlot,
    ) -> Result<Option<UploadResult>, UploadError> {
        self.uploads.upload_image(file, slot).await
    }

    pub async fn can_generate(&self) -> bool {
        self.generation.can_generate().await
    }

    pub async fn generate_preview(&self) -> bool {
        self.generation.generate_preview().await
    }

    /// Session-local merge; persisted on the next transform flush, which
    /// always carries the full record.
    pub async fn set_marking_technique(&self, technique: impl Into<String>) {
        let updated = {
            let mut guard = self.state.lock().await;
            match guard.current_project.as_mut() {
                Some(project) => {
                    project.marking_technique = Some(technique.into());
                    Some(project.clone())
                }
                None => None,
            }
        };
        if let Some(project) = updated {
            let _ = self.events.send(EditorEvent::ProjectUpdated(project));
        }
    }

    pub async fn set_logo_color(&self, color: impl Into<String>) {
        let updated = {
            let mut guard = self.state.lock().await;
            match guard.current_project.as_mut() {
                Some(project) => {
                    project.logo_color = Some(color.into());
                    Some(project.clone())
                }
                None => None,
            }
        };
        if let Some(project) = updated {
            let _ = self.events.send(EditorEvent::ProjectUpdated(project));
        }
    }

    pub async fn refresh_marking_techniques(&self) -> Result<Vec<MarkingTechnique>> {
        match self.store.fetch_marking_techniques().await {
            Ok(techniques) => {
                {
                    let mut guard = self.state.lock().await;
                    guard.techniques = techniques.clone();
                }
                let _ = self
                    .events
                    .send(EditorEvent::TechniquesLoaded(techniques.clone()));
                Ok(techniques)
            }
            Err(err) => {
                warn!("failed to fetch marking techniques: {err}");
                self.notifications.notify(Notice::error(
                    "Load failed",
                    store_failure_message(&err, TECHNIQUES_FAILED_FALLBACK),
                ));
                Err(err)
            }
        }
    }

    /// Fetches the generated result image and writes it next to the given
    /// directory as `{project name}-mockup.png`. Independent of the rest of
    /// the editing session.
    pub async fn download_preview(&self, dest_dir: &Path) -> Result<PathBuf> {
        let (path, project_name) = {
            let guard = self.state.lock().await;
            let project = guard
                .current_project
                .as_ref()
                .ok_or_else(|| anyhow!("no project selected"))?;
            let path = project
                .result_image_url
                .clone()
                .ok_or_else(|| anyhow!("no generated preview to download"))?;
            (path, project.name.clone())
        };

        let bytes = self.store.fetch_image(&path).await?;
        let dest = dest_dir.join(format!("{project_name}-mockup.png"));
        tokio::fs::write(&dest, &bytes)
            .await
            .with_context(|| format!("failed to write preview to '{}'", dest.display()))?;
        info!(dest = %dest.display(), size_bytes = bytes.len(), "preview downloaded");
        Ok(dest)
    }

    /// The preview modal's "edit more" action: closes the preview and
    /// returns control to the editor without touching state.
    pub fn dismiss_preview(&self) {
        self.presenter.close();
    }

    pub async fn current_project(&self) -> Option<Project> {
        self.state.lock().await.current_project.clone()
    }

    pub async fn techniques(&self) -> Vec<MarkingTechnique> {
        self.state.lock().await.techniques.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }
}

/// The store's own message when it has one, otherwise the caller's
/// user-facing fallback.
pub(crate) fn store_failure_message(err: &anyhow::Error, fallback: &str) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
