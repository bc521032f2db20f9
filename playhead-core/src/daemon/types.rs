//! Wire types for the transfer daemon's JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of one content transfer.
///
/// Closed set: every consumer matches exhaustively so a new phase cannot be
/// silently ignored. `NotStarted` never appears on the wire; the daemon
/// simply omits unknown files from its status table and observers synthesize
/// the sentinel via [`TransferStatus::not_started`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    NotStarted,
    Downloading,
    Seeding,
    Completed,
    Error,
}

impl TransferPhase {
    /// Whether local availability is sufficient to attach a playback source.
    pub fn is_satisfied(self) -> bool {
        match self {
            TransferPhase::Seeding | TransferPhase::Completed => true,
            TransferPhase::NotStarted | TransferPhase::Downloading | TransferPhase::Error => false,
        }
    }
}

impl std::fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransferPhase::NotStarted => "not_started",
            TransferPhase::Downloading => "downloading",
            TransferPhase::Seeding => "seeding",
            TransferPhase::Completed => "completed",
            TransferPhase::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// One entry of the daemon's `GET /status` table.
///
/// Observed, never mutated, by this crate. Field names follow the daemon's
/// JSON exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferStatus {
    /// Stable content key, unique per item.
    pub filename: String,
    #[serde(rename = "status")]
    pub phase: TransferPhase,
    /// Percent complete, 0..=100. Meaningful while `Downloading`.
    pub progress: f64,
    pub bytes_downloaded: i64,
    pub total_bytes: i64,
    pub peers_connected: i64,
    /// Instantaneous rate in KB/s.
    pub download_speed: f64,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransferStatus {
    /// Sentinel for a file the daemon has no entry for yet.
    ///
    /// This is the expected state before a transfer has been registered
    /// server-side, not an error.
    pub fn not_started(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            phase: TransferPhase::NotStarted,
            progress: 0.0,
            bytes_downloaded: 0,
            total_bytes: 0,
            peers_connected: 0,
            download_speed: 0.0,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Process-wide P2P telemetry from `GET /stats`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    pub peer_id: String,
    pub connected_peers: u64,
    pub seeding_files: u64,
    pub downloading_files: u64,
    pub cache_files: u64,
}
