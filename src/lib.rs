//! iQIYI Subtitle Downloader - Rust Implementation
//!
//! Resolves iQIYI album and play pages into language-filtered subtitle files for
//! movies and multi-episode series.

pub mod browser;
pub mod collector;
pub mod config;
pub mod download;
pub mod episodes;
pub mod error;
pub mod filename;
pub mod language;
pub mod pipeline;
pub mod platform;
pub mod region;
pub mod subtitles;

// Re-export main types for easy access
pub use crate::config::Config;
pub use crate::error::{HaltReason, Result, SubtitleError};
pub use crate::language::{LanguageRequest, LanguageSet};
pub use crate::pipeline::{PipelineOptions, PipelineOutcome, SubtitlePipeline};
pub use crate::platform::{ContentKind, ContentRecord, EpisodeRef, IqiyiClient};
pub use crate::collector::{DownloadItem, SubtitleTrack};
