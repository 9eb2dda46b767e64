//! Resolves per-episode playback manifest URLs through a browser session

use super::BrowserSession;
use crate::error::{Result, SubtitleError};
use regex::Regex;
use std::time::Duration;
use tracing::debug;

/// Watches a play page's network traffic for the manifest request
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    pattern: Regex,
    timeout: Duration,
}

impl ManifestResolver {
    pub fn new(pattern: &str, timeout: Duration) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| SubtitleError::Browser(format!("invalid manifest pattern {}: {}", pattern, e)))?;
        Ok(Self { pattern, timeout })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Navigate to `page_url` and return the first request URL matching the pattern.
    ///
    /// A timeout surfaces as `SubtitleError::ManifestNotFound`.
    pub async fn resolve(&self, session: &mut dyn BrowserSession, page_url: &str) -> Result<String> {
        session.navigate(page_url).await?;
        let url = session.observe_request(&self.pattern, self.timeout).await?;
        debug!("Manifest URL: {}", url);
        Ok(url)
    }
}
