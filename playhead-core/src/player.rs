//! Player front: at most one active playback session, an opaque media sink,
//! and the controls visibility timer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::activity::ActivityTimer;
use crate::config::PlayheadConfig;
use crate::daemon::DaemonClient;
use crate::session::PlaybackSession;

/// Errors from the playback primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaSinkError {
    /// Sink could not use the given source
    #[error("Media source rejected: {reason}")]
    SourceRejected {
        /// Sink failure detail
        reason: String,
    },

    /// A play/pause/seek/volume operation failed
    #[error("Playback control failed: {reason}")]
    ControlFailed {
        /// Sink failure detail
        reason: String,
    },
}

/// Opaque playback primitive.
///
/// Decode and render live behind this seam; the coordinator only attaches a
/// source once the content is ready and forwards transport controls.
#[async_trait]
pub trait MediaSink: Send + Sync + 'static {
    /// Attaches a byte-stream source. Called only after readiness.
    async fn attach(&self, source: Url) -> Result<(), MediaSinkError>;
    async fn play(&self) -> Result<(), MediaSinkError>;
    async fn pause(&self) -> Result<(), MediaSinkError>;
    async fn seek(&self, position: Duration) -> Result<(), MediaSinkError>;
    /// Volume in `0.0..=1.0`.
    async fn set_volume(&self, volume: f64) -> Result<(), MediaSinkError>;
}

/// Coordinates one sink, one session at a time, and control visibility.
///
/// Mirrors what a player surface does: request playback of a content key,
/// wait until the transfer is locally satisfied, attach the daemon's stream
/// URL and start playing.
pub struct Player {
    client: Arc<dyn DaemonClient>,
    sink: Arc<dyn MediaSink>,
    config: PlayheadConfig,
    controls: ActivityTimer,
    session: Option<PlaybackSession>,
}

impl Player {
    pub fn new(
        client: Arc<dyn DaemonClient>,
        sink: Arc<dyn MediaSink>,
        config: PlayheadConfig,
    ) -> Self {
        let controls = ActivityTimer::new(config.ui.controls_hide_after);
        Self {
            client,
            sink,
            config,
            controls,
            session: None,
        }
    }

    /// Switches playback to `content_key`.
    ///
    /// Any previous session is fully torn down before the new one is
    /// created, so status samples cannot cross between sessions. Waits for
    /// readiness, then attaches the stream source and starts the sink.
    ///
    /// # Errors
    /// - `PlayheadError::Session` - Invalid key, or the session failed
    /// - `PlayheadError::Daemon` - Stream URL could not be built
    /// - `PlayheadError::Media` - Sink rejected the source or the play call
    pub async fn play(&mut self, content_key: &str) -> crate::Result<()> {
        if let Some(previous) = self.session.take() {
            info!(
                "Switching playback from {} to {content_key}",
                previous.content_key()
            );
            previous.close().await;
        }

        let session = PlaybackSession::start(
            Arc::clone(&self.client),
            content_key,
            self.config.polling.status_interval,
        )?;

        if let Err(e) = session.ready().await {
            session.close().await;
            return Err(e.into());
        }

        let source = self.client.stream_url(session.content_key())?;
        self.sink.attach(source).await?;
        self.sink.play().await?;

        self.controls.touch();
        self.session = Some(session);
        Ok(())
    }

    /// Stops playback and tears down the active session, if any.
    pub async fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }

    pub async fn pause(&self) -> crate::Result<()> {
        self.sink.pause().await?;
        self.controls.touch();
        Ok(())
    }

    pub async fn resume(&self) -> crate::Result<()> {
        self.sink.play().await?;
        self.controls.touch();
        Ok(())
    }

    pub async fn seek(&self, position: Duration) -> crate::Result<()> {
        self.sink.seek(position).await?;
        self.controls.touch();
        Ok(())
    }

    pub async fn set_volume(&self, volume: f64) -> crate::Result<()> {
        self.sink.set_volume(volume.clamp(0.0, 1.0)).await?;
        self.controls.touch();
        Ok(())
    }

    /// Active session, if one is playing.
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Controls visibility state, driven by the UI's activity events.
    pub fn controls(&self) -> &ActivityTimer {
        &self.controls
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::daemon::TransferPhase;
    use crate::session::SessionError;
    use crate::test_support::{ScriptedDaemon, status};
    use crate::PlayheadError;

    /// Records every sink call in order.
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }
    }

    #[async_trait]
    impl MediaSink for RecordingSink {
        async fn attach(&self, source: Url) -> Result<(), MediaSinkError> {
            self.events.lock().push(format!("attach {source}"));
            Ok(())
        }

        async fn play(&self) -> Result<(), MediaSinkError> {
            self.events.lock().push("play".to_string());
            Ok(())
        }

        async fn pause(&self) -> Result<(), MediaSinkError> {
            self.events.lock().push("pause".to_string());
            Ok(())
        }

        async fn seek(&self, position: Duration) -> Result<(), MediaSinkError> {
            self.events.lock().push(format!("seek {position:?}"));
            Ok(())
        }

        async fn set_volume(&self, volume: f64) -> Result<(), MediaSinkError> {
            self.events.lock().push(format!("volume {volume}"));
            Ok(())
        }
    }

    fn test_player(daemon: &Arc<ScriptedDaemon>, sink: &Arc<RecordingSink>) -> Player {
        Player::new(
            Arc::clone(daemon) as Arc<dyn DaemonClient>,
            Arc::clone(sink) as Arc<dyn MediaSink>,
            PlayheadConfig::for_testing(),
        )
    }

    #[tokio::test]
    async fn attaches_stream_source_once_ready() {
        let daemon = Arc::new(ScriptedDaemon::new());
        daemon.push_status(status("clip.mp4", TransferPhase::Seeding, 100.0));
        let sink = Arc::new(RecordingSink::default());

        let mut player = test_player(&daemon, &sink);
        player.play("clip.mp4").await.unwrap();

        assert_eq!(
            sink.events(),
            vec![
                "attach http://daemon.test/stream/clip.mp4".to_string(),
                "play".to_string(),
            ]
        );
        assert_eq!(player.session().unwrap().content_key(), "clip.mp4");

        player.stop().await;
    }

    #[tokio::test]
    async fn switching_keys_tears_down_previous_session() {
        let daemon = Arc::new(ScriptedDaemon::new());
        daemon.push_status(status("first.mp4", TransferPhase::Seeding, 100.0));
        let sink = Arc::new(RecordingSink::default());

        let mut player = test_player(&daemon, &sink);
        player.play("first.mp4").await.unwrap();

        let mut table = std::collections::HashMap::new();
        table.insert(
            "first.mp4".to_string(),
            status("first.mp4", TransferPhase::Seeding, 100.0),
        );
        table.insert(
            "second.mp4".to_string(),
            status("second.mp4", TransferPhase::Seeding, 100.0),
        );
        daemon.push_status_table(table);

        player.play("second.mp4").await.unwrap();

        // Both satisfied on first sample: no start calls either time
        assert!(daemon.start_calls().is_empty());
        assert_eq!(player.session().unwrap().content_key(), "second.mp4");
        assert_eq!(
            sink.events().last().map(String::as_str),
            Some("play")
        );
        assert!(
            sink.events()
                .contains(&"attach http://daemon.test/stream/second.mp4".to_string())
        );

        player.stop().await;
    }

    #[tokio::test]
    async fn failed_session_propagates_and_attaches_nothing() {
        let daemon = Arc::new(ScriptedDaemon::new());
        daemon.push_empty_status();
        daemon.fail_transfer_starts();
        let sink = Arc::new(RecordingSink::default());

        let mut player = test_player(&daemon, &sink);
        let err = player.play("clip.mp4").await.unwrap_err();

        assert!(matches!(
            err,
            PlayheadError::Session(SessionError::TransferStartFailed { .. })
        ));
        assert!(sink.events().is_empty());
        assert!(player.session().is_none());
    }

    #[tokio::test]
    async fn volume_is_clamped_to_unit_range() {
        let daemon = Arc::new(ScriptedDaemon::new());
        let sink = Arc::new(RecordingSink::default());

        let player = test_player(&daemon, &sink);
        player.set_volume(2.5).await.unwrap();

        assert_eq!(sink.events(), vec!["volume 1".to_string()]);
    }
}
