//! Scripted daemon mock shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::daemon::{DaemonClient, DaemonError, NetworkStats, TransferStatus};

type Scripted<T> = Mutex<VecDeque<Result<T, String>>>;

/// `DaemonClient` that replays scripted responses.
///
/// Each status/stats fetch pops the next scripted entry; once the script is
/// exhausted the last entry is repeated, modelling a daemon in steady state.
/// `Err(reason)` entries surface as `DaemonError::Unavailable`.
#[derive(Default)]
pub struct ScriptedDaemon {
    status_script: Scripted<HashMap<String, TransferStatus>>,
    last_status: Mutex<Option<Result<HashMap<String, TransferStatus>, String>>>,
    stats_script: Scripted<NetworkStats>,
    last_stats: Mutex<Option<Result<NetworkStats, String>>>,
    start_calls: Mutex<Vec<String>>,
    fail_start: AtomicBool,
    status_delay: Mutex<Duration>,
}

impl ScriptedDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one status table response.
    pub fn push_status_table(&self, table: HashMap<String, TransferStatus>) {
        self.status_script.lock().push_back(Ok(table));
    }

    /// Queues a single-entry status table for `status.filename`.
    pub fn push_status(&self, status: TransferStatus) {
        let mut table = HashMap::new();
        table.insert(status.filename.clone(), status);
        self.push_status_table(table);
    }

    /// Queues an empty status table (daemon knows nothing about the file).
    pub fn push_empty_status(&self) {
        self.push_status_table(HashMap::new());
    }

    /// Queues a failed status fetch.
    pub fn push_status_failure(&self, reason: &str) {
        self.status_script.lock().push_back(Err(reason.to_string()));
    }

    pub fn push_stats(&self, stats: NetworkStats) {
        self.stats_script.lock().push_back(Ok(stats));
    }

    pub fn push_stats_failure(&self, reason: &str) {
        self.stats_script.lock().push_back(Err(reason.to_string()));
    }

    /// Holds each status fetch open for `delay` before responding.
    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock() = delay;
    }

    /// Makes subsequent `start_download` calls fail.
    pub fn fail_transfer_starts(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    /// Filenames passed to `start_download`, in call order.
    pub fn start_calls(&self) -> Vec<String> {
        self.start_calls.lock().clone()
    }

    fn next<T: Clone>(
        script: &Scripted<T>,
        last: &Mutex<Option<Result<T, String>>>,
        what: &str,
    ) -> Result<T, DaemonError> {
        let entry = match script.lock().pop_front() {
            Some(entry) => {
                *last.lock() = Some(entry.clone());
                entry
            }
            // Script exhausted: hold the last response, error or not
            None => match last.lock().clone() {
                Some(entry) => entry,
                None => Err(format!("no scripted {what} response")),
            },
        };

        entry.map_err(|reason| DaemonError::Unavailable { reason })
    }
}

#[async_trait]
impl DaemonClient for ScriptedDaemon {
    async fn start_download(&self, filename: &str) -> Result<(), DaemonError> {
        self.start_calls.lock().push(filename.to_string());
        if self.fail_start.load(Ordering::SeqCst) {
            Err(DaemonError::Unavailable {
                reason: "scripted start failure".to_string(),
            })
        } else {
            Ok(())
        }
    }

    async fn transfer_statuses(&self) -> Result<HashMap<String, TransferStatus>, DaemonError> {
        let delay = *self.status_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Self::next(&self.status_script, &self.last_status, "status")
    }

    async fn network_stats(&self) -> Result<NetworkStats, DaemonError> {
        Self::next(&self.stats_script, &self.last_stats, "stats")
    }

    fn stream_url(&self, filename: &str) -> Result<Url, DaemonError> {
        Url::parse(&format!("http://daemon.test/stream/{filename}")).map_err(|e| {
            DaemonError::InvalidUrl {
                url: filename.to_string(),
                reason: e.to_string(),
            }
        })
    }

    async fn health(&self) -> Result<(), DaemonError> {
        Ok(())
    }
}

/// Builds a `TransferStatus` with the given phase and progress.
pub fn status(filename: &str, phase: crate::daemon::TransferPhase, progress: f64) -> TransferStatus {
    TransferStatus {
        progress,
        phase,
        ..TransferStatus::not_started(filename)
    }
}
