//! Region gate and IP geolocation lookup
use crate::error::{Result, SubtitleError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Outcome of comparing the caller's country with an album allow-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionDecision {
    Allow,
    Deny,
}

/// Split the platform's comma separated `regionsAllowed` field
pub fn parse_allowed_regions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|region| region.trim().to_lowercase())
        .filter(|region| !region.is_empty())
        .collect()
}

/// Check the caller's country against the allow-list (case-insensitive)
pub fn check_region(allowed_regions: &[String], caller_country: &str) -> RegionDecision {
    let country = caller_country.trim().to_lowercase();
    if allowed_regions.iter().any(|region| region.eq_ignore_ascii_case(&country)) {
        RegionDecision::Allow
    } else {
        RegionDecision::Deny
    }
}

/// Source of the caller's network-inferred country code
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn country(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    country: Option<String>,
}

/// Geolocation through an ipinfo-style JSON endpoint
#[derive(Clone)]
pub struct IpInfoLocator {
    client: Client,
    endpoint: String,
}

impl IpInfoLocator {
    pub fn new(endpoint: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Geolocator for IpInfoLocator {
    async fn country(&self) -> Result<String> {
        debug!("Looking up caller location at {}", self.endpoint);

        let response = self.client.get(&self.endpoint).send().await?.error_for_status()?;
        let body: IpInfoResponse = response.json().await?;

        body.country
            .map(|country| country.to_lowercase())
            .ok_or_else(|| SubtitleError::MetadataParse("geolocation response has no country".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_regions() {
        assert_eq!(parse_allowed_regions("tw, HK,,sg"), vec!["tw", "hk", "sg"]);
        assert!(parse_allowed_regions("").is_empty());
    }

    #[test]
    fn test_region_decision() {
        let allowed = vec!["tw".to_string()];
        assert_eq!(check_region(&allowed, "us"), RegionDecision::Deny);
        assert_eq!(check_region(&allowed, "TW"), RegionDecision::Allow);
        assert_eq!(check_region(&[], "tw"), RegionDecision::Deny);
    }
}
