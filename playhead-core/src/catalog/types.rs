//! Wire types for the catalog backend's JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One catalog record from `GET /list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Content key used with the transfer daemon
    pub filename: String,
    #[serde(default)]
    pub thumbnail: String,
    /// Duration in seconds, 0 when unknown
    #[serde(default)]
    pub duration: i64,
    /// Size in bytes
    pub size: i64,
    #[serde(default)]
    pub creator: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Backend node identity from `GET /peer-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub peer_id: String,
    #[serde(default)]
    pub addrs: Vec<String>,
    #[serde(default)]
    pub peers: u64,
}
