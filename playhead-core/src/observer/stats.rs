//! Process-wide network telemetry observer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::daemon::{DaemonClient, NetworkStats};
use crate::poller::{PollFailure, PollSource, Poller, PollerHandle, PollSnapshot};

struct StatsSource {
    client: Arc<dyn DaemonClient>,
}

#[async_trait]
impl PollSource for StatsSource {
    type Output = NetworkStats;

    async fn poll(&mut self) -> Result<NetworkStats, PollFailure> {
        Ok(self.client.network_stats().await?)
    }
}

/// Refreshes [`NetworkStats`] wholesale on a fixed cadence.
///
/// One observer owns the write path; any number of subscribers fan out
/// read-only through cloned watch receivers. A failed refresh keeps the
/// previous value on the snapshot so displays never flicker back to zero.
pub struct StatsObserver {
    handle: PollerHandle,
    snapshot_rx: watch::Receiver<PollSnapshot<NetworkStats>>,
}

impl StatsObserver {
    /// Starts polling telemetry every `interval`.
    ///
    /// `Duration::ZERO` means fetch once and never repeat.
    pub fn spawn(client: Arc<dyn DaemonClient>, interval: Duration) -> Self {
        let repeat = if interval.is_zero() {
            debug!("Fetching network stats once");
            None
        } else {
            debug!("Observing network stats every {interval:?}");
            Some(interval)
        };

        let (handle, snapshot_rx) = Poller::spawn(StatsSource { client }, repeat);

        Self {
            handle,
            snapshot_rx,
        }
    }

    /// Latest-sample stream. Clones fan out read-only.
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot<NetworkStats>> {
        self.snapshot_rx.clone()
    }

    /// Most recent snapshot.
    pub fn latest(&self) -> PollSnapshot<NetworkStats> {
        self.snapshot_rx.borrow().clone()
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
