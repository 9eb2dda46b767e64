//! W3C WebDriver client (chromedriver) with performance-log network capture

use super::{BrowserLauncher, BrowserSession};
use crate::config::BrowserConfig;
use crate::error::{Result, SubtitleError};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One entry of the browser's performance log
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct PerformanceMessage {
    message: DevtoolsEvent,
}

#[derive(Debug, Deserialize)]
struct DevtoolsEvent {
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct WebDriverResponse<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// URLs of every outgoing request recorded in a batch of performance log entries
pub fn request_urls(entries: &[LogEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| serde_json::from_str::<PerformanceMessage>(&entry.message).ok())
        .filter(|event| event.message.method == "Network.requestWillBeSent")
        .filter_map(|event| {
            event.message.params["request"]["url"]
                .as_str()
                .map(|url| url.to_string())
        })
        .collect()
}

/// First request URL matching the pattern
pub fn find_matching_request(urls: &[String], pattern: &Regex) -> Option<String> {
    urls.iter().find(|url| pattern.is_match(url)).cloned()
}

/// Launches chromedriver-backed sessions
#[derive(Clone)]
pub struct WebDriverLauncher {
    client: Client,
    config: BrowserConfig,
}

impl WebDriverLauncher {
    pub fn new(config: BrowserConfig) -> Result<Self> {
        // Navigation blocks until page load, so allow well past the manifest wait
        let client = Client::builder()
            .timeout(Duration::from_secs(config.manifest_timeout_seconds.max(30) * 2))
            .build()?;

        Ok(Self { client, config })
    }

    fn capabilities(&self) -> Value {
        let mut args = self.config.args.clone();
        if self.config.headless {
            args.push("--headless=new".to_string());
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": self.config.browser_name,
                    "goog:loggingPrefs": { "performance": "ALL" },
                    "goog:chromeOptions": { "args": args },
                }
            }
        })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let endpoint = format!("{}/session", self.config.webdriver_url.trim_end_matches('/'));
        debug!("Opening WebDriver session at {}", endpoint);

        let response = self.client.post(&endpoint).json(&self.capabilities()).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SubtitleError::Browser(format!("WebDriver error {}: {}", status, text)));
        }

        let created: WebDriverResponse<NewSession> = response.json().await?;
        info!("🌐 Browser session started: {}", created.value.session_id);

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            base_url: self.config.webdriver_url.trim_end_matches('/').to_string(),
            session_id: Some(created.value.session_id),
            poll_interval: Duration::from_millis(self.config.poll_interval_millis),
        }))
    }
}

/// A live browser session
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: Option<String>,
    poll_interval: Duration,
}

impl WebDriverSession {
    fn session_url(&self, path: &str) -> Result<String> {
        let id = self
            .session_id
            .as_ref()
            .ok_or_else(|| SubtitleError::Browser("session already closed".to_string()))?;
        Ok(format!("{}/session/{}{}", self.base_url, id, path))
    }

    async fn command(&self, path: &str, body: Value) -> Result<Value> {
        let url = self.session_url(path)?;
        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SubtitleError::Browser(format!("WebDriver error {}: {}", status, text)));
        }

        let payload: WebDriverResponse<Value> = response.json().await?;
        Ok(payload.value)
    }

    /// Drain the performance log; entries are consumed by reading them
    async fn read_performance_log(&self) -> Result<Vec<LogEntry>> {
        let value = self.command("/se/log", json!({ "type": "performance" })).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let stale = self.read_performance_log().await?;
        debug!("Discarded {} stale network log entries", stale.len());

        debug!("Navigating to {}", url);
        self.command("/url", json!({ "url": url })).await?;
        Ok(())
    }

    async fn observe_request(&mut self, pattern: &Regex, timeout: Duration) -> Result<String> {
        let started = Instant::now();

        loop {
            let entries = self.read_performance_log().await?;
            let urls = request_urls(&entries);
            if let Some(url) = find_matching_request(&urls, pattern) {
                debug!("Matched request after {:.1}s: {}", started.elapsed().as_secs_f64(), url);
                return Ok(url);
            }

            if started.elapsed() >= timeout {
                return Err(SubtitleError::ManifestNotFound {
                    pattern: pattern.as_str().to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn close(&mut self) -> Result<()> {
        let Some(id) = self.session_id.take() else {
            return Ok(());
        };

        let url = format!("{}/session/{}", self.base_url, id);
        let response = self.client.delete(&url).send().await?;
        if !response.status().is_success() {
            warn!("⚠️ Browser session {} did not close cleanly: {}", id, response.status());
        } else {
            info!("🌐 Browser session closed: {}", id);
        }
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if let Some(id) = &self.session_id {
            warn!("⚠️ Browser session {} dropped without being closed", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: &str, url: &str) -> LogEntry {
        let message = json!({
            "message": {
                "method": method,
                "params": { "request": { "url": url } }
            },
            "webview": "ABC"
        });
        LogEntry {
            message: message.to_string(),
        }
    }

    #[test]
    fn test_request_urls_only_outgoing_requests() {
        let entries = vec![
            entry("Network.requestWillBeSent", "https://www.iq.com/play/abc"),
            entry("Network.responseReceived", "https://cache-video.iq.com/dash?tvid=1"),
            LogEntry {
                message: "not json".to_string(),
            },
            entry("Network.requestWillBeSent", "https://cache-video.iq.com/dash?tvid=2"),
        ];
        let urls = request_urls(&entries);
        assert_eq!(
            urls,
            vec![
                "https://www.iq.com/play/abc".to_string(),
                "https://cache-video.iq.com/dash?tvid=2".to_string()
            ]
        );
    }

    #[test]
    fn test_find_matching_request() {
        let pattern = Regex::new(r"https:\/\/cache-video\.iq\.com\/dash\?").unwrap();
        let urls = vec![
            "https://www.iq.com/play/abc".to_string(),
            "https://cache-video.iq.com/dash?tvid=2&vid=9".to_string(),
        ];
        assert_eq!(
            find_matching_request(&urls, &pattern).as_deref(),
            Some("https://cache-video.iq.com/dash?tvid=2&vid=9")
        );
        assert!(find_matching_request(&urls[..1], &pattern).is_none());
    }

    #[test]
    fn test_capabilities_enable_performance_log() {
        let mut config = crate::config::Config::default().browser;
        config.headless = true;
        let launcher = WebDriverLauncher::new(config).unwrap();
        let caps = launcher.capabilities();

        let always = &caps["capabilities"]["alwaysMatch"];
        assert_eq!(always["goog:loggingPrefs"]["performance"], "ALL");
        let args = always["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|arg| arg == "--headless=new"));
    }
}
