use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ConfigError, ProtocolError, UploadError};
use crate::model::{Book, UploadResult};

const PHOTO_FIELD: &str = "photo";
const PHOTO_MIME: &str = "image/jpeg";
const FALLBACK_FILE_NAME: &str = "photo.jpg";

/// Anything that can turn a local image into an [`UploadResult`].
///
/// [`RecommendationClient`] is the network implementation; sessions accept any
/// implementor so they can be driven by doubles.
#[async_trait]
pub trait RecommendationService: Send + Sync {
    async fn upload(&self, image: &Path) -> Result<UploadResult, UploadError>;
}

#[async_trait]
impl<T: RecommendationService + ?Sized> RecommendationService for Arc<T> {
    async fn upload(&self, image: &Path) -> Result<UploadResult, UploadError> {
        (**self).upload(image).await
    }
}

/// HTTP client for the bookshelf recommendation service.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct RecommendationClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl RecommendationClient {
    /// Build the pooled HTTP client. Fails before any request is made, e.g. on
    /// an invalid user agent or TLS backend setup.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .timeout(config.request_ceiling())
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `image` as the `photo` part of a multipart POST and decode the reply.
    ///
    /// Makes exactly one attempt. A missing or unreadable file fails with
    /// [`UploadError::Input`] before any connection is opened.
    pub async fn upload(&self, image: &Path) -> Result<UploadResult, UploadError> {
        let part = photo_part(image).await?;
        let form = Form::new().part(PHOTO_FIELD, part);
        let url = self.config.endpoint();

        debug!(url = %url, path = %image.display(), "uploading photo");
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| {
                warn!(error = %e, timeout = e.is_timeout(), "upload request failed")
            })?;

        let result = parse_upload_response(resp, self.config.max_error_body_bytes)
            .await
            .inspect_err(|e| warn!(error = %e, "upload response rejected"))?;
        info!(
            success = result.success,
            books = result.books.len(),
            "upload completed"
        );
        Ok(result)
    }

    /// [`upload`](Self::upload), then unwrap the books or surface `success = false`
    /// as [`UploadError::Application`].
    pub async fn recommend(&self, image: &Path) -> Result<Vec<Book>, UploadError> {
        self.upload(image).await?.into_recommendations()
    }
}

#[async_trait]
impl RecommendationService for RecommendationClient {
    async fn upload(&self, image: &Path) -> Result<UploadResult, UploadError> {
        RecommendationClient::upload(self, image).await
    }
}

async fn photo_part(image: &Path) -> Result<Part, UploadError> {
    let metadata = tokio::fs::metadata(image)
        .await
        .map_err(|e| UploadError::input(image, e))?;
    if !metadata.is_file() {
        return Err(UploadError::input(
            image,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let bytes = tokio::fs::read(image)
        .await
        .map_err(|e| UploadError::input(image, e))?;
    let file_name = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

    debug!(file_name = %file_name, bytes = bytes.len(), "prepared photo part");
    Ok(Part::bytes(bytes).file_name(file_name).mime_str(PHOTO_MIME)?)
}

async fn parse_upload_response(
    resp: reqwest::Response,
    max_error_body_bytes: usize,
) -> Result<UploadResult, UploadError> {
    let status = resp.status();
    if !status.is_success() {
        let body = read_limited_text(resp, max_error_body_bytes).await;
        return Err(ProtocolError::Status { status, body }.into());
    }

    let body = resp.bytes().await?;
    let result = serde_json::from_slice::<UploadResult>(&body).map_err(ProtocolError::from)?;
    Ok(result)
}

// Error bodies are for diagnostics only; a failed read still yields the status.
async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(body) => {
            let end = body.len().min(max_bytes);
            String::from_utf8_lossy(&body[..end]).into_owned()
        }
        Err(e) => {
            warn!(error = %e, "could not read body of failed upload");
            String::new()
        }
    }
}
