//! Per-key transfer status observer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::daemon::{DaemonClient, TransferStatus};
use crate::poller::{PollFailure, PollSource, Poller, PollerHandle, PollSnapshot};

/// Fetches the full status table and projects out one content key.
struct StatusSource {
    client: Arc<dyn DaemonClient>,
    content_key: String,
}

#[async_trait]
impl PollSource for StatusSource {
    type Output = TransferStatus;

    async fn poll(&mut self) -> Result<TransferStatus, PollFailure> {
        let table: HashMap<String, TransferStatus> = self.client.transfer_statuses().await?;

        // An absent entry is the expected state before the daemon has
        // registered the transfer, not an error.
        Ok(table
            .get(&self.content_key)
            .cloned()
            .unwrap_or_else(|| TransferStatus::not_started(&self.content_key)))
    }
}

/// Polls one content key's transfer status at a fixed cadence.
///
/// Wraps [`Poller`], inheriting its guarantees: one request in flight at
/// most, transient failures retried at the same interval, latest-sample-only
/// delivery. Dropping the observer stops polling and leaks no timers.
pub struct StatusObserver {
    handle: PollerHandle,
    snapshot_rx: watch::Receiver<PollSnapshot<TransferStatus>>,
    content_key: String,
}

impl StatusObserver {
    /// Starts observing `content_key`, sampling every `interval`.
    pub fn spawn(client: Arc<dyn DaemonClient>, content_key: &str, interval: Duration) -> Self {
        debug!("Observing transfer status for {content_key} every {interval:?}");

        let source = StatusSource {
            client,
            content_key: content_key.to_string(),
        };
        let (handle, snapshot_rx) = Poller::spawn(source, Some(interval));

        Self {
            handle,
            snapshot_rx,
            content_key: content_key.to_string(),
        }
    }

    /// Latest-sample stream for this key. Clones fan out read-only.
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot<TransferStatus>> {
        self.snapshot_rx.clone()
    }

    /// Most recent snapshot.
    pub fn latest(&self) -> PollSnapshot<TransferStatus> {
        self.snapshot_rx.borrow().clone()
    }

    pub fn content_key(&self) -> &str {
        &self.content_key
    }

    /// Requests cancellation without waiting.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Stops polling and waits for the loop to exit.
    pub async fn stop(self) {
        self.handle.stop().await;
    }
}
