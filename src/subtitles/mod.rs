//! Subtitle post-processing: SRT model and format conversion

pub mod convert;
pub mod srt;

pub use convert::{parse_webvtt, parse_xml, SrtConverter};
pub use srt::{format_duration, SRTEntry, SRTGenerator};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Converts every downloaded subtitle in a folder to the final format.
///
/// `platform` is set on the final top-level pass only.
#[async_trait]
pub trait SubtitleConverter: Send + Sync {
    async fn convert(&self, folder: &Path, platform: Option<&str>, locale: &str) -> Result<()>;
}
