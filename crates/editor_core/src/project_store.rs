use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{ImageSlot, ProjectId},
    error::ApiError,
    protocol::{
        MarkingTechnique, MockupUpdateRequest, MockupUpdateResponse, RegenerateRequest,
        RegenerateResponse, UploadImageResponse,
    },
};
use url::Url;

use crate::upload::UploadFile;

/// Remote persistence and generation service consumed by the editing core.
/// All project/mockup state the backend holds is reached through this trait;
/// components receive it injected and never talk to global state.
#[async_trait]
pub trait RemoteProjectStore: Send + Sync {
    /// Idempotent full-field overwrite of the transform-related subset.
    async fn update_mockup(
        &self,
        project_id: ProjectId,
        update: MockupUpdateRequest,
    ) -> Result<MockupUpdateResponse>;

    /// Triggers a backend render; each call may produce a new artifact.
    async fn regenerate_mockup(
        &self,
        project_id: ProjectId,
        request: RegenerateRequest,
    ) -> Result<RegenerateResponse>;

    async fn upload_mockup_images(
        &self,
        project_id: ProjectId,
        file: &UploadFile,
        slot: ImageSlot,
    ) -> Result<UploadImageResponse>;

    async fn fetch_marking_techniques(&self) -> Result<Vec<MarkingTechnique>>;

    /// Fetches the bytes behind a stored image reference. References are
    /// paths relative to the configured upload base URL.
    async fn fetch_image(&self, path: &str) -> Result<Vec<u8>>;
}

pub struct MissingProjectStore;

#[async_trait]
impl RemoteProjectStore for MissingProjectStore {
    async fn update_mockup(
        &self,
        project_id: ProjectId,
        _update: MockupUpdateRequest,
    ) -> Result<MockupUpdateResponse> {
        Err(anyhow!(
            "project store unavailable for project {}",
            project_id.0
        ))
    }

    async fn regenerate_mockup(
        &self,
        project_id: ProjectId,
        _request: RegenerateRequest,
    ) -> Result<RegenerateResponse> {
        Err(anyhow!(
            "project store unavailable for project {}",
            project_id.0
        ))
    }

    async fn upload_mockup_images(
        &self,
        project_id: ProjectId,
        _file: &UploadFile,
        _slot: ImageSlot,
    ) -> Result<UploadImageResponse> {
        Err(anyhow!(
            "project store unavailable for project {}",
            project_id.0
        ))
    }

    async fn fetch_marking_techniques(&self) -> Result<Vec<MarkingTechnique>> {
        Err(anyhow!("project store is unavailable"))
    }

    async fn fetch_image(&self, _path: &str) -> Result<Vec<u8>> {
        Err(anyhow!("project store is unavailable"))
    }
}

/// HTTP implementation against the project service. The API base URL hosts
/// the mockup endpoints; stored image references resolve against the upload
/// base URL.
pub struct HttpProjectStore {
    http: Client,
    api_base_url: String,
    upload_base_url: String,
}

impl HttpProjectStore {
    pub fn new(api_base_url: impl Into<String>, upload_base_url: impl Into<String>) -> Result<Self> {
        let api_base_url = api_base_url.into();
        let upload_base_url = upload_base_url.into();
        Url::parse(&api_base_url)
            .with_context(|| format!("invalid api base url '{api_base_url}'"))?;
        Url::parse(&upload_base_url)
            .with_context(|| format!("invalid upload base url '{upload_base_url}'"))?;
        Ok(Self {
            http: Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: upload_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetchable address for a stored image reference, for display and
    /// download alike.
    pub fn image_url(&self, path: &str) -> String {
        joined_image_url(&self.upload_base_url, path)
    }
}

#[async_trait]
impl RemoteProjectStore for HttpProjectStore {
    async fn update_mockup(
        &self,
        project_id: ProjectId,
        update: MockupUpdateRequest,
    ) -> Result<MockupUpdateResponse> {
        let response = self
            .http
            .put(format!("{}/mockups/{}", self.api_base_url, project_id.0))
            .json(&update)
            .send()
            .await?;
        let response = check_status("mockup update", response).await?;
        Ok(response.json().await?)
    }

    async fn regenerate_mockup(
        &self,
        project_id: ProjectId,
        request: RegenerateRequest,
    ) -> Result<RegenerateResponse> {
        let response = self
            .http
            .post(format!(
                "{}/mockups/{}/regenerate",
                self.api_base_url, project_id.0
            ))
            .json(&request)
            .send()
            .await?;
        let response = check_status("mockup regeneration", response).await?;
        Ok(response.json().await?)
    }

    async fn upload_mockup_images(
        &self,
        project_id: ProjectId,
        file: &UploadFile,
        slot: ImageSlot,
    ) -> Result<UploadImageResponse> {
        let response = self
            .http
            .post(format!(
                "{}/mockups/{}/images",
                self.api_base_url, project_id.0
            ))
            .query(&[
                ("slot", slot.wire_name()),
                ("filename", file.filename.as_str()),
                ("mime_type", file.mime_type.as_str()),
            ])
            .body(file.bytes.clone())
            .send()
            .await?;
        let response = check_status("image upload", response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_marking_techniques(&self) -> Result<Vec<MarkingTechnique>> {
        let response = self
            .http
            .get(format!("{}/marking_techniques", self.api_base_url))
            .send()
            .await?;
        let response = check_status("marking technique listing", response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_image(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.http.get(self.image_url(path)).send().await?;
        let response = check_status("image fetch", response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Surfaces the service's own error message when the body carries one,
/// otherwise falls back to the status line.
async fn check_status(
    context: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ApiError>().await {
        Ok(err) => Err(anyhow!(err.message)),
        Err(_) => Err(anyhow!("{context} request failed with status {status}")),
    }
}

fn joined_image_url(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
#[path = "tests/project_store_tests.rs"]
mod tests;
