use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{ImageSlot, MarkingZone, Project, ProjectId},
    protocol::{
        MarkingTechnique, MockupUpdateRequest, MockupUpdateResponse, RegenerateRequest,
        RegenerateResponse, UploadImageResponse,
    },
};
use tokio::sync::{broadcast, Mutex};

use crate::{
    EditorEvent, EditorState, Notice, NotificationSink, PreviewHandOff, PreviewPresenter,
    RemoteProjectStore, SharedState, UploadFile,
};

pub struct TestProjectStore {
    pub fail_with: Option<String>,
    pub result_image_url: String,
    pub uploaded_image_url: String,
    pub techniques: Vec<MarkingTechnique>,
    pub image_bytes: Vec<u8>,
    pub update_delays: Mutex<Vec<Duration>>,
    pub regenerate_delay: Option<Duration>,
    pub updates: Arc<Mutex<Vec<(ProjectId, MockupUpdateRequest)>>>,
    pub regenerations: Arc<Mutex<Vec<(ProjectId, RegenerateRequest)>>>,
    pub uploads: Arc<Mutex<Vec<(ProjectId, String, ImageSlot, usize)>>>,
    pub fetched_paths: Arc<Mutex<Vec<String>>>,
}

impl TestProjectStore {
    pub fn ok() -> Self {
        Self {
            fail_with: None,
            result_image_url: "/uploads/results/42.png".to_string(),
            uploaded_image_url: "/uploads/logos/7.png".to_string(),
            techniques: vec![
                MarkingTechnique {
                    name: "embroidery".to_string(),
                    display_name: "Embroidery".to_string(),
                },
                MarkingTechnique {
                    name: "screen_print".to_string(),
                    display_name: "Screen print".to_string(),
                },
            ],
            image_bytes: b"rendered-bytes".to_vec(),
            update_delays: Mutex::new(Vec::new()),
            regenerate_delay: None,
            updates: Arc::new(Mutex::new(Vec::new())),
            regenerations: Arc::new(Mutex::new(Vec::new())),
            uploads: Arc::new(Mutex::new(Vec::new())),
            fetched_paths: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(err: impl Into<String>) -> Self {
        let mut store = Self::ok();
        store.fail_with = Some(err.into());
        store
    }

    pub fn with_update_delays(mut self, delays: Vec<Duration>) -> Self {
        self.update_delays = Mutex::new(delays);
        self
    }

    pub fn with_regenerate_delay(mut self, delay: Duration) -> Self {
        self.regenerate_delay = Some(delay);
        self
    }
}

#[async_trait]
impl RemoteProjectStore for TestProjectStore {
    async fn update_mockup(
        &self,
        project_id: ProjectId,
        update: MockupUpdateRequest,
    ) -> Result<MockupUpdateResponse> {
        self.updates.lock().await.push((project_id, update.clone()));
        let delay = {
            let mut delays = self.update_delays.lock().await;
            if delays.is_empty() {
                None
            } else {
                Some(delays.remove(0))
            }
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.fail_with {
            return Err(anyhow!(err.clone()));
        }
        Ok(MockupUpdateResponse {
            logo_scale: update.logo_scale,
            logo_rotation: update.logo_rotation,
            marking_zone_x: update.marking_zone_x,
            marking_zone_y: update.marking_zone_y,
            marking_zone_w: update.marking_zone_w,
            marking_zone_h: update.marking_zone_h,
            marking_technique: update.marking_technique,
            logo_opacity: update.logo_opacity,
            updated_at: Utc::now(),
        })
    }

    async fn regenerate_mockup(
        &self,
        project_id: ProjectId,
        request: RegenerateRequest,
    ) -> Result<RegenerateResponse> {
        self.regenerations
            .lock()
            .await
            .push((project_id, request.clone()));
        if let Some(delay) = self.regenerate_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.fail_with {
            return Err(anyhow!(err.clone()));
        }
        Ok(RegenerateResponse {
            result_image_url: self.result_image_url.clone(),
        })
    }

    async fn upload_mockup_images(
        &self,
        project_id: ProjectId,
        file: &UploadFile,
        slot: ImageSlot,
    ) -> Result<UploadImageResponse> {
        self.uploads
            .lock()
            .await
            .push((project_id, file.filename.clone(), slot, file.bytes.len()));
        if let Some(err) = &self.fail_with {
            return Err(anyhow!(err.clone()));
        }
        Ok(UploadImageResponse {
            image_url: self.uploaded_image_url.clone(),
        })
    }

    async fn fetch_marking_techniques(&self) -> Result<Vec<MarkingTechnique>> {
        if let Some(err) = &self.fail_with {
            return Err(anyhow!(err.clone()));
        }
        Ok(self.techniques.clone())
    }

    async fn fetch_image(&self, path: &str) -> Result<Vec<u8>> {
        self.fetched_paths.lock().await.push(path.to_string());
        if let Some(err) = &self.fail_with {
            return Err(anyhow!(err.clone()));
        }
        Ok(self.image_bytes.clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    pub notices: StdMutex<Vec<Notice>>,
}

impl RecordingNotifications {
    pub fn titles(&self) -> Vec<String> {
        self.notices
            .lock()
            .expect("notices lock")
            .iter()
            .map(|notice| notice.title.clone())
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices
            .lock()
            .expect("notices lock")
            .iter()
            .map(|notice| notice.message.clone())
            .collect()
    }
}

impl NotificationSink for RecordingNotifications {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("notices lock").push(notice);
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub opened: StdMutex<Vec<PreviewHandOff>>,
    pub closed: StdMutex<u32>,
}

impl PreviewPresenter for RecordingPresenter {
    fn open(&self, preview: PreviewHandOff) {
        self.opened.lock().expect("opened lock").push(preview);
    }

    fn close(&self) {
        *self.closed.lock().expect("closed lock") += 1;
    }
}

pub fn sample_project() -> Project {
    let mut project = Project::new(ProjectId(42), "cap-run");
    project.product_image_url = Some("/uploads/products/3.png".to_string());
    project.logo_image_url = Some("/uploads/logos/3.png".to_string());
    project.marking_technique = Some("embroidery".to_string());
    project.marking_zone = MarkingZone { w: 120.0, h: 80.0 };
    project
}

pub fn session_parts(project: Option<Project>) -> (SharedState, broadcast::Sender<EditorEvent>) {
    let state: SharedState = Arc::new(Mutex::new(EditorState {
        current_project: project,
        techniques: Vec::new(),
        loading: false,
    }));
    let (events, _) = broadcast::channel(64);
    (state, events)
}
