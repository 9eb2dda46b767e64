//! Browser automation for runtime-generated manifest URLs
//!
//! The playback manifest URL only exists after the player script runs, so it is
//! recovered by loading the play page in a real browser and watching its network
//! requests.

pub mod manifest;
pub mod webdriver;

pub use manifest::ManifestResolver;
pub use webdriver::{WebDriverLauncher, WebDriverSession};

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

/// Capabilities the pipeline needs from a browser session
#[async_trait]
pub trait BrowserSession: Send {
    /// Load a page, discarding network activity from earlier pages
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait until a request whose URL matches `pattern` is observed
    async fn observe_request(&mut self, pattern: &Regex, timeout: Duration) -> Result<String>;

    /// Shut the browser down; safe to call more than once
    async fn close(&mut self) -> Result<()>;
}

/// Factory for browser sessions, one per content item
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}
