//! Centralized configuration for Playhead.
//!
//! All tunable parameters live here so intervals and endpoints are not
//! hard-coded throughout the codebase.

use std::time::Duration;

/// Central configuration for all Playhead components.
///
/// Groups related settings into logical sections and supports environment
/// variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct PlayheadConfig {
    pub daemon: DaemonConfig,
    pub catalog: CatalogConfig,
    pub polling: PollingConfig,
    pub ui: UiConfig,
}

/// Local transfer daemon endpoint configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Base URL of the daemon's HTTP API
    pub base_url: String,
    /// Bounded timeout for each daemon request
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9090".to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: "playhead/0.1.0",
        }
    }
}

/// Catalog backend endpoint configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog's HTTP API
    pub base_url: String,
    /// Bounded timeout for each catalog request. Uploads are exempt; a large
    /// file can legitimately take longer than any fixed request budget.
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api".to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: "playhead/0.1.0",
        }
    }
}

/// Poll cadence for the status and stats observers.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Interval between transfer status samples for an active session
    pub status_interval: Duration,
    /// Interval between network telemetry refreshes.
    /// `Duration::ZERO` means fetch once and never repeat.
    pub stats_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(2),
            stats_interval: Duration::from_secs(5),
        }
    }
}

/// Presentation-layer timing.
#[derive(Debug, Clone)]
pub struct UiConfig {
    /// Idle time before playback controls hide themselves
    pub controls_hide_after: Duration,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            controls_hide_after: Duration::from_secs(3),
        }
    }
}

impl PlayheadConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via `PLAYHEAD_*` variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("PLAYHEAD_DAEMON_URL") {
            config.daemon.base_url = url;
        }

        if let Ok(url) = std::env::var("PLAYHEAD_CATALOG_URL") {
            config.catalog.base_url = url;
        }

        if let Ok(timeout) = std::env::var("PLAYHEAD_REQUEST_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.daemon.request_timeout = Duration::from_secs(seconds);
                config.catalog.request_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(interval) = std::env::var("PLAYHEAD_STATUS_INTERVAL_MS") {
            if let Ok(millis) = interval.parse::<u64>() {
                config.polling.status_interval = Duration::from_millis(millis);
            }
        }

        if let Ok(interval) = std::env::var("PLAYHEAD_STATS_INTERVAL_MS") {
            if let Ok(millis) = interval.parse::<u64>() {
                config.polling.stats_interval = Duration::from_millis(millis);
            }
        }

        if let Ok(hide) = std::env::var("PLAYHEAD_CONTROLS_HIDE_MS") {
            if let Ok(millis) = hide.parse::<u64>() {
                config.ui.controls_hide_after = Duration::from_millis(millis);
            }
        }

        config
    }

    /// Creates a configuration with short intervals suitable for tests.
    pub fn for_testing() -> Self {
        Self {
            polling: PollingConfig {
                status_interval: Duration::from_millis(10),
                stats_interval: Duration::from_millis(10),
            },
            ui: UiConfig {
                controls_hide_after: Duration::from_millis(50),
            },
            ..Default::default()
        }
    }
}
