//! iQIYI page and private API client

use super::models::{
    ContentRecord, EpisodeListResponse, EpisodeRef, ManifestContent, ManifestResponse, PageData,
};
use super::MetadataApi;
use crate::config::PlatformConfig;
use crate::error::{Result, SubtitleError};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

fn props_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"(\{"props":\{.*\})"#).expect("props pattern is valid"))
}

/// Rewrite a play page URL into its album URL; album URLs pass through
pub fn album_url(content_url: &str, config: &PlatformConfig) -> Result<String> {
    let parsed = Url::parse(content_url.trim())
        .map_err(|e| SubtitleError::InvalidUrl(format!("{}: {}", content_url, e)))?;

    let mut segments = parsed
        .path_segments()
        .map(|s| s.filter(|segment| !segment.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    match segments.next() {
        Some("play") => {
            let slug = segments
                .next()
                .ok_or_else(|| SubtitleError::InvalidUrl(format!("no play id in {}", content_url)))?;
            // Slugs look like `show-name-<id>`; the id is the last dash-separated part
            let id = slug.rsplit('-').next().unwrap_or(slug);
            Ok(format!(
                "{}/{}?lang={}",
                config.album_base_url.trim_end_matches('/'),
                id,
                config.lang_code
            ))
        }
        Some("album") => Ok(content_url.trim().to_string()),
        _ => Err(SubtitleError::InvalidUrl(format!(
            "expected a play or album page: {}",
            content_url
        ))),
    }
}

/// Make a movie play URL absolute and force the configured language
pub fn normalize_play_url(raw: &str, config: &PlatformConfig) -> String {
    let raw = raw.trim();
    let absolute = match raw.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => raw.to_string(),
    };
    let lang = format!("lang={}", config.lang_code);
    absolute
        .replace("lang=en_us", &lang)
        .replace("lang=zh_cn", &lang)
}

/// Play page for one episode of a series
pub fn episode_play_url(play_loc_suffix: &str, config: &PlatformConfig) -> String {
    format!(
        "{}/{}",
        config.play_base_url.trim_end_matches('/'),
        play_loc_suffix.trim_start_matches('/')
    )
}

/// Absolute subtitle URL from a manifest path
pub fn subtitle_url(path: &str, config: &PlatformConfig) -> String {
    format!("{}{}", config.meta_host, path.replace("\\/", "/"))
}

/// Fill the episode listing template
pub fn episode_list_url(album_id: &str, start_order: u32, end_order: u32, config: &PlatformConfig) -> String {
    config
        .episode_list_api
        .replace("{album_id}", album_id)
        .replace("{total}", &end_order.to_string())
        .replace("{start_order}", &start_order.to_string())
}

/// Pull the `{"props": ...}` state blob out of an album page.
///
/// Prefers the `__NEXT_DATA__` script element, then falls back to a raw text match.
pub fn extract_page_state(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    if let Ok(selector) = Selector::parse("script#__NEXT_DATA__") {
        if let Some(script) = document.select(&selector).next() {
            let text: String = script.text().collect();
            if text.trim_start().starts_with("{\"props\"") {
                return Ok(text.trim().to_string());
            }
        }
    }

    props_pattern()
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SubtitleError::MetadataParse("no embedded page state found".to_string()))
}

/// Decode the album record from a page state blob; `None` when the page has no album
pub fn parse_album(state_json: &str) -> Result<Option<ContentRecord>> {
    let data: PageData = serde_json::from_str(state_json)
        .map_err(|e| SubtitleError::MetadataParse(format!("page state: {}", e)))?;

    let info = data
        .props
        .initial_state
        .and_then(|state| state.album)
        .and_then(|album| album.video_album_info);

    match info {
        Some(raw) => Ok(Some(ContentRecord::try_from(raw)?)),
        None => Ok(None),
    }
}

/// HTTP client for the platform's album pages and private APIs
#[derive(Clone)]
pub struct IqiyiClient {
    client: Client,
    config: PlatformConfig,
}

impl IqiyiClient {
    /// Create a new client instance
    pub fn new(config: PlatformConfig, timeout_seconds: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl MetadataApi for IqiyiClient {
    async fn fetch_album(&self, album_url: &str) -> Result<Option<ContentRecord>> {
        info!("📄 Fetching album page: {}", album_url);

        let html = self.get_text(album_url).await?;
        debug!("📄 Downloaded {} characters of HTML content", html.len());

        let state = extract_page_state(&html)?;
        let record = parse_album(&state)?;
        if let Some(record) = &record {
            debug!("Album record: {:?}", record);
        }
        Ok(record)
    }

    async fn fetch_episodes(&self, album_id: &str, start_order: u32, end_order: u32) -> Result<Vec<EpisodeRef>> {
        let url = episode_list_url(album_id, start_order, end_order, &self.config);
        let body = self.get_text(&url).await?;
        let listing: EpisodeListResponse = serde_json::from_str(&body)
            .map_err(|e| SubtitleError::MetadataParse(format!("episode listing: {}", e)))?;

        debug!("Episode listing returned {} entries", listing.data.epg.len());
        Ok(listing.data.epg)
    }

    async fn fetch_manifest(&self, manifest_url: &str) -> Result<ManifestContent> {
        let body = self.get_text(manifest_url).await?;
        let manifest: ManifestResponse = serde_json::from_str(&body)
            .map_err(|e| SubtitleError::MetadataParse(format!("playback manifest: {}", e)))?;
        Ok(manifest.into())
    }
}
