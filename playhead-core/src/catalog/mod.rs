//! Catalog backend collaborator: content listing and upload.

mod client;
mod types;

pub use client::{CatalogError, HttpCatalogClient, UploadRequest};
pub use types::{PeerInfo, VideoMetadata};
