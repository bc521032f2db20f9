//! Playhead Core - Playback readiness coordination for P2P-delivered media
//!
//! This crate provides the building blocks for watching content that arrives
//! through a local transfer daemon: non-overlapping polling, per-content
//! status observation, the playback readiness state machine, a catalog
//! client, and the controls visibility timer.

pub mod activity;
pub mod catalog;
pub mod config;
pub mod daemon;
pub mod observer;
pub mod player;
pub mod poller;
pub mod session;
pub mod tracing_setup;

#[cfg(test)]
mod test_support;

// Re-export main types for convenient access
pub use activity::ActivityTimer;
pub use catalog::{CatalogError, HttpCatalogClient, PeerInfo, UploadRequest, VideoMetadata};
pub use config::PlayheadConfig;
pub use daemon::{
    DaemonClient, DaemonError, HttpDaemonClient, NetworkStats, TransferPhase, TransferStatus,
};
pub use observer::{StatsObserver, StatusObserver};
pub use player::{MediaSink, MediaSinkError, Player};
pub use poller::{PollFailure, PollSnapshot, PollSource, Poller, PollerHandle};
pub use session::{PlaybackPhase, PlaybackSession, ReadinessState, SessionError};

/// Core errors that can bubble up from any Playhead subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PlayheadError {
    #[error("Daemon error: {0}")]
    Daemon(#[from] DaemonError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Media sink error: {0}")]
    Media(#[from] MediaSinkError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlayheadError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            PlayheadError::Daemon(e) => match e {
                DaemonError::Unavailable { .. } => {
                    "Transfer daemon is not running".to_string()
                }
                _ => "Transfer daemon request failed".to_string(),
            },
            PlayheadError::Catalog(_) => "Catalog backend request failed".to_string(),
            PlayheadError::Session(e) => match e {
                SessionError::InvalidContentKey { reason } => {
                    format!("Invalid content key: {reason}")
                }
                SessionError::TransferStartFailed { filename, .. } => {
                    format!("Could not start transfer for {filename}")
                }
                SessionError::TransferFailed { filename } => {
                    format!("Transfer of {filename} failed")
                }
                SessionError::Closed => "Playback was cancelled".to_string(),
            },
            PlayheadError::Media(_) => "Playback error occurred".to_string(),
            PlayheadError::Configuration { .. } => "Configuration error occurred".to_string(),
            PlayheadError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PlayheadError::Configuration { .. }
                | PlayheadError::Session(SessionError::InvalidContentKey { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, PlayheadError>;
