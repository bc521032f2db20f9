//! Poller specializations: per-key transfer status and global telemetry.

mod stats;
mod status;

pub use stats::StatsObserver;
pub use status::StatusObserver;
