use std::sync::Arc;

use anyhow::anyhow;
use shared::domain::ImageSlot;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    project_store::RemoteProjectStore, store_failure_message, EditorEvent, Notice,
    NotificationSink, SharedState,
};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A file the user picked for upload. The media type is whatever the picker
/// reported; validation trusts it the same way the editor does.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub image_url: String,
    pub slot: ImageSlot,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file is not an image")]
    InvalidType,
    #[error("file exceeds the 10 MiB upload limit")]
    TooLarge,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Validates a selected file locally, dispatches it to the store, and
/// merges the confirmed reference into project state. Unlike the transform
/// path there is no optimistic write: the slot field changes only after the
/// store acknowledges the upload.
pub struct UploadGateway {
    store: Arc<dyn RemoteProjectStore>,
    notifications: Arc<dyn NotificationSink>,
    state: SharedState,
    events: broadcast::Sender<EditorEvent>,
}

impl UploadGateway {
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
        }
    }

    /// Rejections happen before any network activity: a missing file is a
    /// quiet no-op, a non-image media type or an over-limit size is
    /// reported to the user and never dispatched.
    pub async fn upload_image(
        &self,
        file: Option<UploadFile>,
        slot: ImageSlot,
    ) -> Result<Option<UploadResult>, UploadError> {
        let Some(file) = file else {
            debug!(slot = slot.label(), "no file selected; skipping upload");
            return Ok(None);
        };

        if !file.mime_type.starts_with("image/") {
            self.notifications.notify(Notice::error(
                "Invalid file type",
                "Please select a valid image file.",
            ));
            return Err(UploadError::InvalidType);
        }

        if file.bytes.len() > MAX_UPLOAD_BYTES {
            self.notifications.notify(Notice::error(
                "File too large",
                "Please select an image smaller than 10MB.",
            ));
            return Err(UploadError::TooLarge);
        }

        let project_id = {
            let guard = self.state.lock().await;
            match guard.current_project.as_ref() {
                Some(project) => project.id,
                None => {
                    let err = anyhow!("no project selected");
                    self.notify_upload_failure(slot, &err);
                    return Err(UploadError::Store(err));
                }
            }
        };

        match self.store.upload_mockup_images(project_id, &file, slot).await {
            Ok(response) => {
                let updated = {
                    let mut guard = self.state.lock().await;
                    match guard.current_project.as_mut() {
                        Some(project) if project.id == project_id => {
                            project.set_image_url_for_slot(slot, response.image_url.clone());
                            Some(project.clone())
                        }
                        _ => None,
                    }
                };
                if let Some(project) = updated {
                    let _ = self.events.send(EditorEvent::ProjectUpdated(project));
                }
                info!(
                    project_id = project_id.0,
                    slot = slot.label(),
                    filename = %file.filename,
                    "image uploaded"
                );
                self.notifications.notify(upload_success_notice(slot));
                Ok(Some(UploadResult {
                    image_url: response.image_url,
                    slot,
                }))
            }
            Err(err) => {
                warn!(
                    project_id = project_id.0,
                    slot = slot.label(),
                    "image upload failed: {err}"
                );
                self.notify_upload_failure(slot, &err);
                Err(UploadError::Store(err))
            }
        }
    }

    fn notify_upload_failure(&self, slot: ImageSlot, err: &anyhow::Error) {
        let fallback = format!("Failed to upload {} image.", slot.label());
        self.notifications.notify(Notice::error(
            "Upload failed",
            store_failure_message(err, &fallback),
        ));
    }
}

fn upload_success_notice(slot: ImageSlot) -> Notice {
    match slot {
        ImageSlot::Product => Notice::success(
            "Product image uploaded",
            "Your product image has been uploaded successfully.",
        ),
        ImageSlot::Logo => {
            Notice::success("Logo uploaded", "Your logo has been uploaded successfully.")
        }
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
