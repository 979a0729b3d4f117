use std::sync::Arc;

use shared::protocol::RegenerateRequest;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    project_store::RemoteProjectStore, store_failure_message, EditorEvent, Notice,
    NotificationSink, PreviewHandOff, PreviewPresenter, SharedState,
};

const GENERATE_FAILED_FALLBACK: &str = "Failed to generate preview.";

/// Drives the "generate preview" workflow: snapshot current parameters,
/// ask the store for a render, and hand the result to the preview
/// presenter. Single-flight is enforced here via the shared loading flag,
/// not left to whoever disabled the button.
pub struct GenerationOrchestrator {
    store: Arc<dyn RemoteProjectStore>,
    notifications: Arc<dyn NotificationSink>,
    presenter: Arc<dyn PreviewPresenter>,
    state: SharedState,
    events: broadcast::Sender<EditorEvent>,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Arc<dyn RemoteProjectStore>,
        notifications: Arc<dyn NotificationSink>,
        presenter: Arc<dyn PreviewPresenter>,
        state: SharedState,
        events: broadcast::Sender<EditorEvent>,
    ) -> Self {
        Self {
            store,
            notifications,
            presenter,
            state,
            events,
        }
    }

    /// Generation is meaningful only with a product image and a marking
    /// technique, and only while no other generation is running.
    pub async fn can_generate(&self) -> bool {
        let guard = self.state.lock().await;
        if guard.loading {
            return false;
        }
        guard.current_project.as_ref().is_some_and(|project| {
            project.product_image_url.is_some() && project.marking_technique.is_some()
        })
    }

    /// Returns false without dispatching when the precondition is unmet or
    /// a generation is already in flight; true once a request was
    /// dispatched, whatever its outcome. Success and failure are surfaced
    /// through the notification sink and the preview presenter.
    pub async fn generate_preview(&self) -> bool {
        let snapshot = {
            let mut guard = self.state.lock().await;
            if guard.loading {
                debug!("generation already in flight; rejecting");
                return false;
            }
            let Some(project) = guard.current_project.as_ref() else {
                debug!("no project selected; generation skipped");
                return false;
            };
            let (Some(_), Some(technique)) = (
                project.product_image_url.as_ref(),
                project.marking_technique.clone(),
            ) else {
                debug!(
                    project_id = project.id.0,
                    "product image or technique missing; generation skipped"
                );
                return false;
            };

            let technique_label = guard
                .techniques
                .iter()
                .find(|candidate| candidate.name == technique)
                .map(|candidate| candidate.display_name.clone())
                .unwrap_or_else(|| technique.clone());
            let request = RegenerateRequest {
                logo_scale: project.transform.scale,
                logo_rotation: project.transform.rotation,
                logo_color: project.logo_color.clone(),
                marking_zone_x: project.transform.x,
                marking_zone_y: project.transform.y,
                marking_zone_w: project.marking_zone.w,
                marking_zone_h: project.marking_zone.h,
                marking_technique: technique,
            };
            let snapshot = GenerationSnapshot {
                project_id: project.id,
                project_name: project.name.clone(),
                technique_label,
                request,
            };
            guard.loading = true;
            snapshot
        };

        info!(
            project_id = snapshot.project_id.0,
            technique = %snapshot.request.marking_technique,
            "requesting mockup regeneration"
        );
        let result = self
            .store
            .regenerate_mockup(snapshot.project_id, snapshot.request.clone())
            .await;

        match result {
            Ok(response) => {
                let updated = {
                    let mut guard = self.state.lock().await;
                    guard.loading = false;
                    match guard.current_project.as_mut() {
                        Some(project) if project.id == snapshot.project_id => {
                            project.result_image_url = Some(response.result_image_url.clone());
                            Some(project.clone())
                        }
                        _ => None,
                    }
                };
                if let Some(project) = updated {
                    let _ = self.events.send(EditorEvent::ProjectUpdated(project));
                }
                let _ = self.events.send(EditorEvent::PreviewReady {
                    result_image_url: response.result_image_url.clone(),
                });
                self.notifications.notify(Notice::success(
                    "Preview generated",
                    "Your AI mockup preview has been generated successfully.",
                ));
                self.presenter.open(PreviewHandOff {
                    result_image_url: response.result_image_url,
                    project_name: snapshot.project_name,
                    technique: snapshot.technique_label,
                });
            }
            Err(err) => {
                self.state.lock().await.loading = false;
                warn!(
                    project_id = snapshot.project_id.0,
                    "mockup regeneration failed: {err}"
                );
                self.notifications.notify(Notice::error(
                    "Generation failed",
                    store_failure_message(&err, GENERATE_FAILED_FALLBACK),
                ));
            }
        }
        true
    }
}

struct GenerationSnapshot {
    project_id: shared::domain::ProjectId,
    project_name: String,
    technique_label: String,
    request: RegenerateRequest,
}

#[cfg(test)]
#[path = "tests/generation_tests.rs"]
mod tests;
