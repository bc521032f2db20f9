//! Transfer daemon collaborator: wire types and HTTP client.
//!
//! The daemon itself is an external process. This module only speaks its
//! JSON API: `POST /download`, `GET /status`, `GET /stats`,
//! `GET /stream/{filename}` and `GET /health`.

mod client;
mod types;

pub use client::{DaemonClient, DaemonError, HttpDaemonClient};
pub use types::{NetworkStats, TransferPhase, TransferStatus};
