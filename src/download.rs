//! Batch subtitle downloads

use crate::collector::DownloadItem;
use crate::error::{Result, SubtitleError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetches a whole plan; succeeds only if every file landed
#[async_trait]
pub trait BatchDownloader: Send + Sync {
    async fn download(&self, items: &[DownloadItem]) -> Result<()>;
}

/// Concurrent HTTP downloader
#[derive(Clone)]
pub struct HttpBatchDownloader {
    client: Client,
    concurrency: usize,
}

impl HttpBatchDownloader {
    pub fn new(concurrency: usize, timeout_seconds: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            concurrency: concurrency.max(1),
        })
    }

    async fn download_one(&self, item: &DownloadItem) -> Result<()> {
        let response = self.client.get(&item.remote_url).send().await?;

        if !response.status().is_success() {
            return Err(SubtitleError::Download {
                file: item.file_name.clone(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await?;
        tokio::fs::create_dir_all(&item.local_dir).await?;
        tokio::fs::write(item.local_path(), &bytes).await?;

        debug!("Saved {} ({} bytes)", item.local_path().display(), bytes.len());
        Ok(())
    }
}

#[async_trait]
impl BatchDownloader for HttpBatchDownloader {
    async fn download(&self, items: &[DownloadItem]) -> Result<()> {
        info!("⬇️ Downloading {} subtitle file(s)", items.len());

        // Each future owns its item and a client handle
        let results: Vec<(String, Result<()>)> = stream::iter(items.to_vec())
            .map(|item| {
                let downloader = self.clone();
                async move {
                    let result = downloader.download_one(&item).await;
                    (item.file_name, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut failures = Vec::new();
        for (file_name, result) in results {
            if let Err(e) = result {
                warn!("❌ {}: {}", file_name, e);
                failures.push(file_name);
            }
        }

        if !failures.is_empty() {
            return Err(SubtitleError::Download {
                file: failures.join(", "),
                reason: format!("{} of {} downloads failed", failures.len(), items.len()),
            });
        }

        info!("✅ Downloaded {} subtitle file(s)", items.len());
        Ok(())
    }
}
