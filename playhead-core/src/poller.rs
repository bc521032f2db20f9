//! Generic cancellable recurring-fetch primitive.
//!
//! A [`Poller`] invokes a [`PollSource`] once immediately, then re-arms the
//! interval only after each invocation completes, so at most one request is
//! ever in flight and receipt order equals request order. Results are
//! published as [`PollSnapshot`] values through a `watch` channel: consumers
//! always observe the latest sample, with no intermediate buffering.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::daemon::DaemonError;

/// A transient fetch failure, surfaced on the snapshot without stopping the
/// polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PollFailure {
    /// Human-readable failure description
    pub message: String,
}

impl PollFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<DaemonError> for PollFailure {
    fn from(error: DaemonError) -> Self {
        Self::new(error.to_string())
    }
}

/// One recurring fetch operation.
#[async_trait]
pub trait PollSource: Send + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Performs a single fetch. Called again only after the previous call
    /// has resolved.
    async fn poll(&mut self) -> Result<Self::Output, PollFailure>;
}

/// Latest observed state of a polling loop.
///
/// On success the value is replaced wholesale and the error cleared; on
/// failure the previous value is retained so consumers show a stale-but-present
/// reading instead of flickering back to empty.
#[derive(Debug, Clone)]
pub struct PollSnapshot<T> {
    /// Most recent successfully fetched value, if any
    pub value: Option<T>,
    /// Failure from the most recent fetch, cleared on the next success
    pub last_error: Option<PollFailure>,
    /// Count of successful fetches
    pub samples: u64,
    /// Count of failed fetches
    pub failures: u64,
}

impl<T> Default for PollSnapshot<T> {
    fn default() -> Self {
        Self {
            value: None,
            last_error: None,
            samples: 0,
            failures: 0,
        }
    }
}

impl<T> PollSnapshot<T> {
    /// Whether the value predates the most recent (failed) fetch.
    pub fn is_stale(&self) -> bool {
        self.last_error.is_some() && self.value.is_some()
    }

    fn absorb(&mut self, result: Result<T, PollFailure>) {
        match result {
            Ok(value) => {
                self.value = Some(value);
                self.last_error = None;
                self.samples += 1;
            }
            Err(failure) => {
                self.last_error = Some(failure);
                self.failures += 1;
            }
        }
    }
}

/// Handle to a running polling loop.
///
/// Dropping the handle cancels the loop: the shutdown channel closes, any
/// pending tick is voided and an in-flight request's result is discarded
/// before it can touch the snapshot.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Requests cancellation without waiting for the loop to exit.
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Cancels the loop and waits for it to exit. Once this returns, no
    /// further snapshot mutation can occur.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }

    /// Whether the loop has exited (cancelled, or single-shot completed).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns polling loops.
pub struct Poller;

impl Poller {
    /// Starts polling `source`, fetching once immediately and then every
    /// `interval`, measured from the completion of the previous fetch.
    ///
    /// `interval == None` means fetch once and never repeat.
    pub fn spawn<S: PollSource>(
        mut source: S,
        interval: Option<Duration>,
    ) -> (PollerHandle, watch::Receiver<PollSnapshot<S::Output>>) {
        let (snapshot_tx, snapshot_rx) = watch::channel(PollSnapshot::default());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                // The biased select checks shutdown first, so a cancellation
                // racing an in-flight completion always wins and the late
                // result is discarded. `wait_for` also resolves (with an
                // error) when the handle is dropped.
                let result = tokio::select! {
                    biased;
                    _ = shutdown_rx.wait_for(|stop| *stop) => return,
                    result = source.poll() => result,
                };

                match &result {
                    Ok(_) => debug!("Poll sample received"),
                    Err(failure) => warn!("Poll failed, retrying next tick: {failure}"),
                }
                snapshot_tx.send_modify(|snapshot| snapshot.absorb(result));

                let Some(interval) = interval else { return };
                tokio::select! {
                    biased;
                    _ = shutdown_rx.wait_for(|stop| *stop) => return,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });

        (
            PollerHandle { shutdown_tx, task },
            snapshot_rx,
        )
    }
}
