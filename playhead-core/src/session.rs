//! Playback readiness: the per-session state machine over transfer status
//! samples, and the session object that drives it.
//!
//! A session observes one content key, issues the transfer-start call at most
//! once, and reports `Ready` the instant a status sample shows the content is
//! locally available. Transient poll errors are retried; only a failed start
//! call (or a daemon-reported transfer error) is fatal to the session.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::daemon::{DaemonClient, TransferPhase, TransferStatus};
use crate::observer::StatusObserver;
use crate::poller::PollSnapshot;

/// Errors from playback session management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Caller supplied an unusable content key. Rejected synchronously, no
    /// network call issued.
    #[error("Invalid content key: {reason}")]
    InvalidContentKey {
        /// Why the key was rejected
        reason: String,
    },

    /// The transfer-start call itself failed. Fatal to the session.
    #[error("Transfer start failed for {filename}: {reason}")]
    TransferStartFailed {
        /// Content key of the session
        filename: String,
        /// Underlying daemon failure
        reason: String,
    },

    /// The daemon gave up on the transfer and reported an error phase.
    #[error("Transfer failed for {filename}")]
    TransferFailed {
        /// Content key of the session
        filename: String,
    },

    /// Session was torn down before reaching a terminal phase.
    #[error("Session closed before becoming ready")]
    Closed,
}

/// Where a session is on the way to playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Waiting for the first status sample
    Initializing,
    /// Transfer start issued; waiting for local availability
    AwaitingTransfer,
    /// Content is attachable as a playback source. Terminal for the happy path.
    Ready,
    /// Start call failed or the daemon reported a transfer error. Terminal.
    Failed,
}

/// Why a session entered [`PlaybackPhase::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    /// `POST /download` was rejected
    StartRejected {
        /// Daemon failure text
        reason: String,
    },
    /// A status sample reported `TransferPhase::Error`
    TransferErrored,
}

impl SessionFailure {
    fn into_session_error(self, filename: &str) -> SessionError {
        match self {
            SessionFailure::StartRejected { reason } => SessionError::TransferStartFailed {
                filename: filename.to_string(),
                reason,
            },
            SessionFailure::TransferErrored => SessionError::TransferFailed {
                filename: filename.to_string(),
            },
        }
    }
}

/// Side effect requested by a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    StartTransfer,
}

/// Readiness state for one playback session.
///
/// The transition function is pure: it never performs IO itself, it only
/// requests the transfer-start side effect through [`Action`].
#[derive(Debug, Clone)]
pub struct ReadinessState {
    pub content_key: String,
    pub phase: PlaybackPhase,
    /// Most recent status sample, for progress and rate display
    pub last_status: Option<TransferStatus>,
    /// Whether this session has issued its one transfer-start call
    pub transfer_requested: bool,
    /// Set when `phase == Failed`
    pub failure: Option<SessionFailure>,
}

impl ReadinessState {
    fn new(content_key: &str) -> Self {
        Self {
            content_key: content_key.to_string(),
            phase: PlaybackPhase::Initializing,
            last_status: None,
            transfer_requested: false,
            failure: None,
        }
    }

    /// Applies one status sample, returning a side effect to execute.
    ///
    /// Exactly one `StartTransfer` action is ever returned per state, and
    /// none at all when the very first sample already shows the transfer
    /// satisfied.
    pub(crate) fn apply(&mut self, status: &TransferStatus) -> Option<Action> {
        self.last_status = Some(status.clone());

        match self.phase {
            PlaybackPhase::Initializing => match status.phase {
                TransferPhase::Seeding | TransferPhase::Completed => {
                    self.phase = PlaybackPhase::Ready;
                    None
                }
                // A daemon-side Error here means a previous attempt died;
                // the start call resumes it, same as the untouched case.
                TransferPhase::NotStarted | TransferPhase::Downloading | TransferPhase::Error => {
                    self.transfer_requested = true;
                    self.phase = PlaybackPhase::AwaitingTransfer;
                    Some(Action::StartTransfer)
                }
            },
            PlaybackPhase::AwaitingTransfer => match status.phase {
                TransferPhase::Seeding | TransferPhase::Completed => {
                    self.phase = PlaybackPhase::Ready;
                    None
                }
                TransferPhase::Error => {
                    self.phase = PlaybackPhase::Failed;
                    self.failure = Some(SessionFailure::TransferErrored);
                    None
                }
                TransferPhase::NotStarted | TransferPhase::Downloading => None,
            },
            // Terminal phases: samples keep refreshing last_status for the
            // telemetry overlay, but no phase transitions remain.
            PlaybackPhase::Ready | PlaybackPhase::Failed => None,
        }
    }

    /// Records a failed transfer-start call.
    ///
    /// A session that became `Ready` while the start call was still in
    /// flight stays `Ready`; the content is available regardless.
    pub(crate) fn fail_start(&mut self, reason: String) {
        if self.phase == PlaybackPhase::Ready {
            warn!(
                "Ignoring late start failure for {}: already ready",
                self.content_key
            );
            return;
        }
        self.phase = PlaybackPhase::Failed;
        self.failure = Some(SessionFailure::StartRejected { reason });
    }
}

/// One consumer's interest in playing back one content key.
///
/// Owns a [`StatusObserver`] and a driver task feeding its samples through
/// the readiness transition function. Dropping the session cancels the
/// observer, which in turn unwinds the driver; [`close`](Self::close)
/// additionally waits for both to exit.
pub struct PlaybackSession {
    content_key: String,
    observer: StatusObserver,
    state_rx: watch::Receiver<ReadinessState>,
    driver: JoinHandle<()>,
}

impl PlaybackSession {
    /// Opens a session for `content_key` and begins status observation.
    ///
    /// # Errors
    /// - `SessionError::InvalidContentKey` - Empty or whitespace-only key
    pub fn start(
        client: Arc<dyn DaemonClient>,
        content_key: &str,
        status_interval: Duration,
    ) -> Result<Self, SessionError> {
        let key = content_key.trim();
        if key.is_empty() {
            return Err(SessionError::InvalidContentKey {
                reason: "content key is empty".to_string(),
            });
        }

        let observer = StatusObserver::spawn(Arc::clone(&client), key, status_interval);
        let samples = observer.subscribe();
        let (state_tx, state_rx) = watch::channel(ReadinessState::new(key));

        let driver = tokio::spawn(drive(client, key.to_string(), samples, state_tx));

        info!("Playback session opened for {key}");
        Ok(Self {
            content_key: key.to_string(),
            observer,
            state_rx,
            driver,
        })
    }

    /// Readiness state stream for the presentation layer.
    pub fn subscribe(&self) -> watch::Receiver<ReadinessState> {
        self.state_rx.clone()
    }

    /// Current readiness state.
    pub fn state(&self) -> ReadinessState {
        self.state_rx.borrow().clone()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state_rx.borrow().phase
    }

    pub fn content_key(&self) -> &str {
        &self.content_key
    }

    /// Raw status telemetry, including transient poll errors the state
    /// machine skips over.
    pub fn telemetry(&self) -> PollSnapshot<TransferStatus> {
        self.observer.latest()
    }

    /// Waits until the session is `Ready`, or fails with the session's
    /// terminal error.
    pub async fn ready(&self) -> Result<(), SessionError> {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|state| {
                matches!(state.phase, PlaybackPhase::Ready | PlaybackPhase::Failed)
            })
            .await
            .map_err(|_| SessionError::Closed)?
            .clone();

        match state.failure {
            None => Ok(()),
            Some(failure) => Err(failure.into_session_error(&self.content_key)),
        }
    }

    /// Tears the session down, discarding any in-flight status request.
    ///
    /// Once this returns, no further readiness mutation can be observed.
    pub async fn close(self) {
        self.driver.abort();
        // Abort lands at the next await point; the driver may be mid-way
        // through applying a sample on another worker. Join before returning
        // so the no-mutation-after-close guarantee holds.
        let _ = self.driver.await;
        self.observer.stop().await;
        info!("Playback session closed for {}", self.content_key);
    }
}

/// Feeds observer samples into the transition function and executes the
/// one-shot transfer-start side effect.
async fn drive(
    client: Arc<dyn DaemonClient>,
    content_key: String,
    mut samples: watch::Receiver<PollSnapshot<TransferStatus>>,
    state_tx: watch::Sender<ReadinessState>,
) {
    // A sample may have landed between observer spawn and this subscription;
    // treat whatever is in the channel as unseen.
    samples.mark_changed();

    loop {
        if samples.changed().await.is_err() {
            // Observer cancelled: the session is being torn down
            debug!("Status stream for {content_key} ended");
            return;
        }
        let snapshot = samples.borrow_and_update().clone();

        if let Some(failure) = &snapshot.last_error {
            // Transient poll errors never fail the session
            warn!("Transient status poll failure for {content_key}: {failure}");
            continue;
        }
        let Some(status) = snapshot.value else {
            continue;
        };

        let mut action = None;
        let mut entered = None;
        state_tx.send_modify(|state| {
            let before = state.phase;
            action = state.apply(&status);
            if state.phase != before {
                entered = Some(state.phase);
            }
        });

        if let Some(phase) = entered {
            info!("Session {content_key} entered {phase:?}");
        }

        if action == Some(Action::StartTransfer) {
            match client.start_download(&content_key).await {
                Ok(()) => info!("Transfer start issued for {content_key}"),
                Err(e) => {
                    error!("Transfer start failed for {content_key}: {e}");
                    state_tx.send_modify(|state| state.fail_start(e.to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedDaemon, status};

    const KEY: &str = "clip.mp4";

    fn sample(phase: TransferPhase, progress: f64) -> TransferStatus {
        status(KEY, phase, progress)
    }

    mod transitions {
        use super::*;

        #[test]
        fn first_satisfied_sample_skips_start_call() {
            for phase in [TransferPhase::Seeding, TransferPhase::Completed] {
                let mut state = ReadinessState::new(KEY);
                let action = state.apply(&sample(phase, 100.0));

                assert_eq!(action, None);
                assert_eq!(state.phase, PlaybackPhase::Ready);
                assert!(!state.transfer_requested);
            }
        }

        #[test]
        fn download_scenario_issues_one_start_and_reaches_ready() {
            let mut state = ReadinessState::new(KEY);
            let samples = [
                sample(TransferPhase::NotStarted, 0.0),
                sample(TransferPhase::Downloading, 10.0),
                sample(TransferPhase::Downloading, 55.0),
                sample(TransferPhase::Completed, 100.0),
            ];

            let mut trace = vec![state.phase];
            let mut starts = 0;
            for s in &samples {
                if state.apply(s) == Some(Action::StartTransfer) {
                    starts += 1;
                }
                trace.push(state.phase);
            }

            assert_eq!(starts, 1);
            assert_eq!(
                trace,
                vec![
                    PlaybackPhase::Initializing,
                    PlaybackPhase::AwaitingTransfer,
                    PlaybackPhase::AwaitingTransfer,
                    PlaybackPhase::AwaitingTransfer,
                    PlaybackPhase::Ready,
                ]
            );
            assert_eq!(state.last_status.unwrap().progress, 100.0);
            assert!(state.transfer_requested);
        }

        #[test]
        fn ready_is_terminal_but_keeps_absorbing_telemetry() {
            let mut state = ReadinessState::new(KEY);
            state.apply(&sample(TransferPhase::Seeding, 100.0));
            assert_eq!(state.phase, PlaybackPhase::Ready);

            let action = state.apply(&sample(TransferPhase::Downloading, 12.0));
            assert_eq!(action, None);
            assert_eq!(state.phase, PlaybackPhase::Ready);
            assert_eq!(state.last_status.unwrap().progress, 12.0);
        }

        #[test]
        fn daemon_error_phase_fails_awaiting_session() {
            let mut state = ReadinessState::new(KEY);
            state.apply(&sample(TransferPhase::Downloading, 5.0));
            state.apply(&sample(TransferPhase::Error, 5.0));

            assert_eq!(state.phase, PlaybackPhase::Failed);
            assert_eq!(state.failure, Some(SessionFailure::TransferErrored));
        }

        #[test]
        fn late_start_failure_does_not_unready() {
            let mut state = ReadinessState::new(KEY);
            state.apply(&sample(TransferPhase::Downloading, 5.0));
            state.apply(&sample(TransferPhase::Completed, 100.0));
            assert_eq!(state.phase, PlaybackPhase::Ready);

            state.fail_start("late rejection".to_string());
            assert_eq!(state.phase, PlaybackPhase::Ready);
        }

        mod properties {
            use proptest::prelude::*;

            use super::*;

            fn any_phase() -> impl Strategy<Value = TransferPhase> {
                prop_oneof![
                    Just(TransferPhase::NotStarted),
                    Just(TransferPhase::Downloading),
                    Just(TransferPhase::Seeding),
                    Just(TransferPhase::Completed),
                    Just(TransferPhase::Error),
                ]
            }

            proptest! {
                #[test]
                fn at_most_one_start_per_session(
                    phases in proptest::collection::vec(any_phase(), 0..40)
                ) {
                    let mut state = ReadinessState::new(KEY);
                    let mut starts = 0;
                    for phase in phases {
                        if state.apply(&sample(phase, 0.0)) == Some(Action::StartTransfer) {
                            starts += 1;
                        }
                    }
                    prop_assert!(starts <= 1);
                }

                #[test]
                fn ready_is_never_left(
                    phases in proptest::collection::vec(any_phase(), 1..40)
                ) {
                    let mut state = ReadinessState::new(KEY);
                    let mut was_ready = false;
                    for phase in phases {
                        state.apply(&sample(phase, 0.0));
                        if was_ready {
                            prop_assert_eq!(state.phase, PlaybackPhase::Ready);
                        }
                        was_ready |= state.phase == PlaybackPhase::Ready;
                    }
                }
            }
        }
    }

    mod sessions {
        use std::time::Duration;

        use super::*;

        const FAST: Duration = Duration::from_millis(5);

        fn open(daemon: &Arc<ScriptedDaemon>, key: &str) -> Result<PlaybackSession, SessionError> {
            PlaybackSession::start(Arc::clone(daemon) as Arc<dyn DaemonClient>, key, FAST)
        }

        #[tokio::test]
        async fn reaches_ready_with_exactly_one_start_call() {
            let daemon = Arc::new(ScriptedDaemon::new());
            daemon.push_empty_status();
            daemon.push_status(sample(TransferPhase::Downloading, 10.0));
            daemon.push_status(sample(TransferPhase::Downloading, 55.0));
            daemon.push_status(sample(TransferPhase::Completed, 100.0));

            let session = open(&daemon, KEY).unwrap();
            session.ready().await.unwrap();

            assert_eq!(daemon.start_calls(), vec![KEY.to_string()]);
            let state = session.state();
            assert_eq!(state.phase, PlaybackPhase::Ready);
            assert!(state.transfer_requested);
            assert_eq!(state.last_status.unwrap().progress, 100.0);

            session.close().await;
        }

        #[tokio::test]
        async fn already_seeding_needs_no_start_call() {
            let daemon = Arc::new(ScriptedDaemon::new());
            daemon.push_status(sample(TransferPhase::Seeding, 100.0));

            let session = open(&daemon, KEY).unwrap();
            session.ready().await.unwrap();

            assert!(daemon.start_calls().is_empty());
            assert!(!session.state().transfer_requested);

            session.close().await;
        }

        #[tokio::test]
        async fn start_rejection_fails_session_but_polling_continues() {
            let daemon = Arc::new(ScriptedDaemon::new());
            daemon.push_empty_status();
            daemon.fail_transfer_starts();

            let session = open(&daemon, KEY).unwrap();

            let err = session.ready().await.unwrap_err();
            assert!(matches!(err, SessionError::TransferStartFailed { .. }));
            assert_eq!(session.phase(), PlaybackPhase::Failed);

            // Status polling keeps running until teardown
            let before = session.telemetry().samples;
            tokio::time::sleep(Duration::from_millis(40)).await;
            assert!(session.telemetry().samples > before);

            session.close().await;
        }

        #[tokio::test]
        async fn empty_key_rejected_without_network_calls() {
            let daemon = Arc::new(ScriptedDaemon::new());

            let result = open(&daemon, "   ");

            assert!(matches!(
                result,
                Err(SessionError::InvalidContentKey { .. })
            ));
            assert!(daemon.start_calls().is_empty());
        }

        #[tokio::test]
        async fn close_discards_in_flight_sample() {
            let daemon = Arc::new(ScriptedDaemon::new());
            daemon.push_status(sample(TransferPhase::Seeding, 100.0));
            daemon.set_status_delay(Duration::from_secs(3600));

            let session = open(&daemon, KEY).unwrap();
            let mut state_rx = session.subscribe();

            session.close().await;

            // The delayed sample never mutated the state, and the state
            // channel is gone.
            assert_eq!(state_rx.borrow().phase, PlaybackPhase::Initializing);
            assert!(state_rx.changed().await.is_err());
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn no_state_mutation_after_close_returns() {
            let daemon = Arc::new(ScriptedDaemon::new());
            daemon.push_empty_status();
            daemon.push_status(sample(TransferPhase::Downloading, 10.0));

            let session = open(&daemon, KEY).unwrap();
            let mut state_rx = session.subscribe();

            // Samples are actively flowing when close() is called; the
            // driver must be fully joined, not merely flagged for abort.
            state_rx.changed().await.unwrap();
            session.close().await;

            // Whatever landed before close() returned is fair game; nothing
            // may land after.
            let frozen = state_rx.borrow_and_update().clone();
            tokio::time::sleep(Duration::from_millis(40)).await;

            assert!(state_rx.changed().await.is_err());
            assert_eq!(state_rx.borrow().phase, frozen.phase);
            assert_eq!(
                state_rx.borrow().last_status.as_ref().map(|s| s.progress),
                frozen.last_status.as_ref().map(|s| s.progress)
            );
        }

        #[tokio::test]
        async fn transient_poll_failures_do_not_fail_session() {
            let daemon = Arc::new(ScriptedDaemon::new());
            daemon.push_status_failure("connection refused");
            daemon.push_status_failure("connection refused");
            daemon.push_status(sample(TransferPhase::Seeding, 100.0));

            let session = open(&daemon, KEY).unwrap();
            session.ready().await.unwrap();

            assert_eq!(session.phase(), PlaybackPhase::Ready);
            session.close().await;
        }
    }
}
