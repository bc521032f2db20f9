//! HTTP client for the catalog backend.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use url::Url;

use super::types::{PeerInfo, VideoMetadata};
use crate::config::CatalogConfig;

/// Errors from catalog backend communication.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Request failed in transit or the backend answered non-2xx.
    #[error("Catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Base URL from configuration could not be parsed or joined.
    #[error("Invalid catalog URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL text
        url: String,
        /// Parse failure detail
        reason: String,
    },

    /// Local file for an upload could not be read.
    #[error("Upload source unreadable: {0}")]
    Io(#[from] std::io::Error),

    /// Upload request could not be assembled.
    #[error("Upload rejected: {reason}")]
    Upload {
        /// What made the upload unusable
        reason: String,
    },
}

/// Fields accompanying an uploaded file.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub title: String,
    pub description: String,
    pub creator: String,
}

/// Catalog backend client: listing, node identity and multipart upload with
/// byte-level progress reporting.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    base_url: Url,
    client: reqwest::Client,
    /// Uploads are exempt from the per-request timeout; a large file can
    /// legitimately outlast any fixed budget.
    upload_client: reqwest::Client,
}

impl HttpCatalogClient {
    /// Creates a client from the catalog configuration section.
    ///
    /// # Errors
    /// - `CatalogError::InvalidUrl` - Configured base URL does not parse
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| CatalogError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        // Trailing slash so join() appends instead of replacing /api
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(Self {
            base_url,
            client: reqwest::Client::builder()
                .timeout(config.request_timeout)
                .user_agent(config.user_agent)
                .build()
                .expect("HTTP client creation should not fail"),
            upload_client: reqwest::Client::builder()
                .user_agent(config.user_agent)
                .build()
                .expect("HTTP client creation should not fail"),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        self.base_url.join(path).map_err(|e| CatalogError::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            reason: e.to_string(),
        })
    }

    /// Ordered catalog of available content.
    pub async fn list_videos(&self) -> Result<Vec<VideoMetadata>, CatalogError> {
        let url = self.endpoint("list")?;
        let mut videos = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<VideoMetadata>>()
            .await?;

        // The backend stores its catalog unordered; newest first for display
        videos.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(videos)
    }

    /// Backend node identity.
    pub async fn peer_info(&self) -> Result<PeerInfo, CatalogError> {
        let url = self.endpoint("peer-info")?;
        let info = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<PeerInfo>()
            .await?;

        Ok(info)
    }

    /// Liveness probe.
    pub async fn health(&self) -> Result<(), CatalogError> {
        let url = self.endpoint("health")?;
        self.client.get(url).send().await?.error_for_status()?;
        Ok(())
    }

    /// Uploads `path` as multipart form data, invoking `on_progress` with
    /// `(bytes_sent, total_bytes)` as the body streams out.
    ///
    /// # Errors
    /// - `CatalogError::Io` - File cannot be opened or read
    /// - `CatalogError::Upload` - Path has no usable file name
    /// - `CatalogError::Request` - Backend rejected the upload
    pub async fn upload<F>(
        &self,
        path: &Path,
        request: UploadRequest,
        on_progress: F,
    ) -> Result<VideoMetadata, CatalogError>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| CatalogError::Upload {
                reason: format!("path {} has no file name", path.display()),
            })?
            .to_string();

        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();

        debug!("Uploading {file_name} ({total} bytes)");

        let on_progress = Arc::new(on_progress);
        let body_stream = futures::stream::try_unfold((file, 0u64), move |(mut file, sent)| {
            let on_progress = Arc::clone(&on_progress);
            async move {
                let mut buffer = vec![0u8; 64 * 1024];
                let read = file.read(&mut buffer).await?;
                if read == 0 {
                    return Ok::<_, std::io::Error>(None);
                }
                buffer.truncate(read);
                let sent = sent + read as u64;
                on_progress(sent, total);
                Ok(Some((Bytes::from(buffer), (file, sent))))
            }
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body_stream), total)
            .file_name(file_name.clone())
            .mime_str(&video_mime(path))
            .map_err(CatalogError::Request)?;

        let form = Form::new()
            .text("title", request.title)
            .text("description", request.description)
            .text("creator", request.creator)
            .part("video", part);

        let url = self.endpoint("upload")?;
        let video = self
            .upload_client
            .post(url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json::<VideoMetadata>()
            .await?;

        info!("Uploaded {file_name} as {}", video.filename);
        Ok(video)
    }
}

/// Content type for an upload's file part.
///
/// The backend accepts any `video/*` type, so an unrecognized or non-video
/// extension falls back to `video/mp4` rather than being rejected outright.
fn video_mime(path: &Path) -> String {
    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    if guessed.type_() == mime_guess::mime::VIDEO {
        guessed.essence_str().to_string()
    } else {
        "video/mp4".to_string()
    }
}
