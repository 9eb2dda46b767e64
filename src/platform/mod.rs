//! Platform metadata access
//!
//! Album pages embed their state as a JSON blob; episode listings and playback
//! manifests come from private JSON APIs.

pub mod client;
pub mod models;

pub use client::IqiyiClient;
pub use models::{ContentKind, ContentRecord, EpisodeRef, ManifestContent, RawSubtitle};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for platform metadata sources
#[async_trait]
pub trait MetadataApi: Send + Sync {
    /// Album record for an album page; `None` when the page carries no album
    async fn fetch_album(&self, album_url: &str) -> Result<Option<ContentRecord>>;

    /// Ordered episode listing between two orders (inclusive)
    async fn fetch_episodes(&self, album_id: &str, start_order: u32, end_order: u32) -> Result<Vec<EpisodeRef>>;

    /// Subtitle listing from a playback manifest URL
    async fn fetch_manifest(&self, manifest_url: &str) -> Result<ManifestContent>;
}
