//! HTTP client for the local transfer daemon.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::types::{NetworkStats, TransferStatus};
use crate::config::DaemonConfig;

/// Errors from daemon communication.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Request failed in transit: connection refused, timeout, or a non-2xx
    /// status. All of these are transient from the poller's point of view.
    #[error("Daemon request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Daemon is unreachable or refused the request.
    #[error("Daemon unavailable: {reason}")]
    Unavailable {
        /// Connection failure detail
        reason: String,
    },

    /// Base URL from configuration could not be parsed or joined.
    #[error("Invalid daemon URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL text
        url: String,
        /// Parse failure detail
        reason: String,
    },
}

impl DaemonError {
    /// Folds connection-level reqwest failures into `Unavailable` so callers
    /// can tell "daemon not running" apart from protocol errors.
    fn from_transport(error: reqwest::Error) -> Self {
        if error.is_connect() {
            DaemonError::Unavailable {
                reason: error.to_string(),
            }
        } else {
            DaemonError::Request(error)
        }
    }
}

/// Operations the transfer daemon exposes.
///
/// Seam for tests: sessions and observers hold `Arc<dyn DaemonClient>` so a
/// scripted mock can stand in for the HTTP implementation.
#[async_trait]
pub trait DaemonClient: Send + Sync + 'static {
    /// Begins or resumes a transfer. Idempotent if already in progress.
    async fn start_download(&self, filename: &str) -> Result<(), DaemonError>;

    /// Full status table, keyed by filename.
    async fn transfer_statuses(&self) -> Result<HashMap<String, TransferStatus>, DaemonError>;

    /// Process-wide P2P telemetry.
    async fn network_stats(&self) -> Result<NetworkStats, DaemonError>;

    /// URL a playback source can be attached to once the transfer is
    /// satisfied.
    fn stream_url(&self, filename: &str) -> Result<Url, DaemonError>;

    /// Liveness probe.
    async fn health(&self) -> Result<(), DaemonError>;
}

/// `DaemonClient` over HTTP with a bounded per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpDaemonClient {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpDaemonClient {
    /// Creates a client from the daemon configuration section.
    ///
    /// # Errors
    /// - `DaemonError::InvalidUrl` - Configured base URL does not parse
    pub fn new(config: &DaemonConfig) -> Result<Self, DaemonError> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| DaemonError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        // Trailing slash so join() appends instead of replacing path segments
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
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DaemonError> {
        self.base_url.join(path).map_err(|e| DaemonError::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl DaemonClient for HttpDaemonClient {
    async fn start_download(&self, filename: &str) -> Result<(), DaemonError> {
        let url = self.endpoint("download")?;
        debug!("Requesting transfer start for {filename}");

        self.client
            .post(url)
            .json(&json!({ "filename": filename }))
            .send()
            .await
            .map_err(DaemonError::from_transport)?
            .error_for_status()?;

        Ok(())
    }

    async fn transfer_statuses(&self) -> Result<HashMap<String, TransferStatus>, DaemonError> {
        let url = self.endpoint("status")?;
        let table = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DaemonError::from_transport)?
            .error_for_status()?
            .json::<HashMap<String, TransferStatus>>()
            .await?;

        Ok(table)
    }

    async fn network_stats(&self) -> Result<NetworkStats, DaemonError> {
        let url = self.endpoint("stats")?;
        let stats = self
            .client
            .get(url)
            .send()
            .await
            .map_err(DaemonError::from_transport)?
            .error_for_status()?
            .json::<NetworkStats>()
            .await?;

        Ok(stats)
    }

    fn stream_url(&self, filename: &str) -> Result<Url, DaemonError> {
        self.endpoint(&format!("stream/{filename}"))
    }

    async fn health(&self) -> Result<(), DaemonError> {
        let url = self.endpoint("health")?;
        self.client
            .get(url)
            .send()
            .await
            .map_err(DaemonError::from_transport)?
            .error_for_status()?;
        Ok(())
    }
}
