//! Content-item orchestration: album lookup, region gate, movie and series flows,
//! one batch download and the conversion passes.
use crate::browser::{BrowserLauncher, BrowserSession, ManifestResolver, WebDriverLauncher};
use crate::collector::{build_plan, subtitle_tracks, DirectoryLayout, SubtitlePlan};
use crate::config::{Config, PlatformConfig};
use crate::download::{BatchDownloader, HttpBatchDownloader};
use crate::episodes::{filter_released, select_episode_window, ResumeMode, SeriesWindow};
use crate::error::{HaltReason, Result, SubtitleError};
use crate::filename::fix_filename;
use crate::language::{available_tags, compute_language_set, LanguageRequest};
use crate::platform::client::{album_url, episode_play_url, normalize_play_url};
use crate::platform::{ContentKind, ContentRecord, IqiyiClient, ManifestContent, MetadataApi};
use crate::region::{check_region, Geolocator, IpInfoLocator, RegionDecision};
use crate::subtitles::{SrtConverter, SubtitleConverter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-run options supplied by the caller
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    pub languages: LanguageRequest,
    pub resume_mode: ResumeMode,
    pub locale: String,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.download.output_dir.clone(),
            languages: LanguageRequest::parse(&config.output.subtitle_language),
            resume_mode: ResumeMode::All,
            locale: config.output.locale.clone(),
        }
    }
}

/// How a content item ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Files were downloaded and converted
    Completed { files: usize, dirs: usize },
    /// An expected, user-facing stop; not a fault
    Halted(HaltReason),
}

/// Result of processing one movie or episode page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeStep {
    Planned(SubtitlePlan),
    /// Manifest not observed, or the manifest has no program
    Skipped,
    Halted(HaltReason),
}

/// External services the pipeline drives
#[derive(Clone)]
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataApi>,
    pub geolocator: Arc<dyn Geolocator>,
    pub browser: Arc<dyn BrowserLauncher>,
    pub downloader: Arc<dyn BatchDownloader>,
    pub converter: Arc<dyn SubtitleConverter>,
}

/// Resolves one content URL into converted subtitle files
pub struct SubtitlePipeline {
    collaborators: Collaborators,
    platform: PlatformConfig,
    resolver: ManifestResolver,
    options: PipelineOptions,
}

impl SubtitlePipeline {
    pub fn new(
        collaborators: Collaborators,
        platform: PlatformConfig,
        resolver: ManifestResolver,
        options: PipelineOptions,
    ) -> Self {
        Self {
            collaborators,
            platform,
            resolver,
            options,
        }
    }

    /// Wire up the real HTTP, WebDriver and converter implementations.
    ///
    /// Expects a validated `Config`.
    pub fn from_config(config: &Config, options: PipelineOptions) -> Result<Self> {
        let download = &config.download;
        let metadata = IqiyiClient::new(
            config.platform.clone(),
            download.request_timeout_seconds,
            &download.user_agent,
        )?;
        let geolocator = IpInfoLocator::new(&download.geolocation_endpoint, download.request_timeout_seconds)?;
        let browser = WebDriverLauncher::new(config.browser.clone())?;
        let downloader = HttpBatchDownloader::new(
            download.concurrency,
            download.request_timeout_seconds,
            &download.user_agent,
        )?;
        let resolver = ManifestResolver::new(
            &config.platform.manifest_pattern,
            Duration::from_secs(config.browser.manifest_timeout_seconds),
        )?;

        let collaborators = Collaborators {
            metadata: Arc::new(metadata),
            geolocator: Arc::new(geolocator),
            browser: Arc::new(browser),
            downloader: Arc::new(downloader),
            converter: Arc::new(SrtConverter::new()),
        };

        Ok(Self::new(collaborators, config.platform.clone(), resolver, options))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Entry point: resolve `url` (play or album page) and fetch its subtitles
    pub async fn download_subtitle(&self, url: &str) -> Result<PipelineOutcome> {
        let album = album_url(url, &self.platform)?;
        debug!("Album URL: {}", album);

        let record = match self.collaborators.metadata.fetch_album(&album).await? {
            Some(record) => record,
            None => {
                warn!("⚠️ No album information on {}", album);
                return Ok(PipelineOutcome::Halted(HaltReason::NothingToDownload));
            }
        };

        let country = self.collaborators.geolocator.country().await?;
        if check_region(&record.regions_allowed, &country) == RegionDecision::Deny {
            return Ok(PipelineOutcome::Halted(HaltReason::RegionDenied {
                allowed: record.regions_allowed.clone(),
            }));
        }

        match record.kind {
            ContentKind::Movie => self.movie_subtitle(&record).await,
            ContentKind::Series => self.series_subtitle(&record).await,
        }
    }

    /// Single-video flow
    pub async fn movie_subtitle(&self, record: &ContentRecord) -> Result<PipelineOutcome> {
        let raw_title = record.name.trim();
        info!("🎬 {}", raw_title);
        let title = fix_filename(raw_title);

        let play_url = record
            .play_url
            .as_deref()
            .map(|url| normalize_play_url(url, &self.platform))
            .ok_or_else(|| SubtitleError::MetadataParse(format!("album {} has no play URL", record.id)))?;
        debug!("Play URL: {}", play_url);

        let folder = self.options.output_dir.join(&title);
        Self::reset_folder(&folder).await?;

        let file_stem = match &record.year {
            Some(year) => format!("{}.{}.WEB-DL.{}", title, year, self.platform.tag),
            None => format!("{}.WEB-DL.{}", title, self.platform.tag),
        };
        info!("⬇️ Download: {}", file_stem);

        let mut layout = DirectoryLayout::for_request(&self.options.languages);
        let mut session = self.collaborators.browser.launch().await?;
        let step = self
            .episode_step(session.as_mut(), &play_url, &folder, &file_stem, &mut layout)
            .await;
        Self::release(session.as_mut()).await;

        let plan = match step? {
            EpisodeStep::Planned(plan) => plan,
            EpisodeStep::Skipped => SubtitlePlan::default(),
            EpisodeStep::Halted(reason) => return Ok(PipelineOutcome::Halted(reason)),
        };

        self.finish(plan, &folder).await
    }

    /// Multi-episode flow; episodes run sequentially through one browser session
    pub async fn series_subtitle(&self, record: &ContentRecord) -> Result<PipelineOutcome> {
        let series = SeriesWindow::from_record(record);
        info!("🎬 {}", series.title);
        let title = fix_filename(&series.title);

        let window = select_episode_window(&series, self.options.resume_mode);
        if window.is_empty() {
            return Ok(PipelineOutcome::Halted(HaltReason::NoEpisodes));
        }

        let listing = self
            .collaborators
            .metadata
            .fetch_episodes(&series.album_id, window.start_order, window.end_order)
            .await?;
        let episodes = filter_released(window.select(listing));
        if episodes.is_empty() {
            return Ok(PipelineOutcome::Halted(HaltReason::NoEpisodes));
        }

        let folder = self
            .options
            .output_dir
            .join(format!("{}.S{}", title, series.season_label));
        Self::reset_folder(&folder).await?;

        let mut layout = DirectoryLayout::for_request(&self.options.languages);
        let mut session = self.collaborators.browser.launch().await?;
        let mut plan = SubtitlePlan::default();
        let mut halted = None;
        let mut failure = None;

        for (position, episode) in episodes.iter().enumerate() {
            let Some(suffix) = episode.play_loc_suffix.as_deref() else {
                debug!("Episode entry without play location: {:?}", episode);
                continue;
            };

            let order = episode.order.unwrap_or(window.start_order + position as u32);
            let file_stem = format!(
                "{}.S{}E{:02}.WEB-DL.{}",
                title, series.season_label, order, self.platform.tag
            );
            info!("🔍 Finding {} ...", file_stem);

            let page_url = episode_play_url(suffix, &self.platform);
            let step = self
                .episode_step(session.as_mut(), &page_url, &folder, &file_stem, &mut layout)
                .await;
            match step {
                Ok(EpisodeStep::Planned(step)) => plan = plan.accumulate(step),
                Ok(EpisodeStep::Skipped) => {}
                Ok(EpisodeStep::Halted(reason)) => {
                    halted = Some(reason);
                    break;
                }
                // Malformed upstream data is not recoverable for this item
                Err(e @ SubtitleError::MetadataParse(_)) => {
                    failure = Some(e);
                    break;
                }
                Err(e) => warn!("⚠️ Skipping {}: {}", file_stem, e),
            }
        }

        Self::release(session.as_mut()).await;

        if let Some(e) = failure {
            return Err(e);
        }
        if let Some(reason) = halted {
            return Ok(PipelineOutcome::Halted(reason));
        }

        self.finish(plan, &folder).await
    }

    /// Resolve one play page into its slice of the download plan.
    ///
    /// `layout` is shared across the item; when unset (an `all` request) the
    /// first resolved language set fixes it for the remaining episodes.
    pub async fn episode_step(
        &self,
        session: &mut dyn BrowserSession,
        page_url: &str,
        folder: &Path,
        file_stem: &str,
        layout: &mut Option<DirectoryLayout>,
    ) -> Result<EpisodeStep> {
        debug!("Play page: {}", page_url);

        let manifest_url = match self.resolver.resolve(session, page_url).await {
            Ok(url) => url,
            Err(e @ SubtitleError::ManifestNotFound { .. }) => {
                warn!("⚠️ Skipping {}: {}", file_stem, e);
                return Ok(EpisodeStep::Skipped);
            }
            Err(e) => return Err(e),
        };

        let raw = match self.collaborators.metadata.fetch_manifest(&manifest_url).await? {
            ManifestContent::NoProgram => {
                debug!("Manifest for {} has no program", file_stem);
                return Ok(EpisodeStep::Skipped);
            }
            ManifestContent::NoSubtitles => return Ok(EpisodeStep::Halted(HaltReason::NoEmbeddedSubtitles)),
            ManifestContent::Subtitles(raw) => raw,
        };

        let available = available_tags(raw.iter().map(|sub| sub.name.as_str()));
        let languages = match compute_language_set(&self.options.languages, &available) {
            Ok(languages) => languages,
            Err(reason) => return Ok(EpisodeStep::Halted(reason)),
        };

        let layout = *layout.get_or_insert_with(|| DirectoryLayout::for_languages(&languages));
        let tracks = subtitle_tracks(&raw, &self.platform);
        let plan = build_plan(&tracks, &languages, layout, folder, file_stem)?;
        Ok(EpisodeStep::Planned(plan))
    }

    /// One batch download, then per-directory conversion and a final platform-tagged pass
    async fn finish(&self, plan: SubtitlePlan, folder: &Path) -> Result<PipelineOutcome> {
        if plan.is_empty() {
            return Ok(PipelineOutcome::Halted(HaltReason::NothingToDownload));
        }

        self.collaborators.downloader.download(&plan.items).await?;

        let locale = self.options.locale.as_str();
        for dir in &plan.touched_dirs {
            self.collaborators.converter.convert(dir, None, locale).await?;
        }
        self.collaborators
            .converter
            .convert(folder, Some(&self.platform.tag), locale)
            .await?;

        info!(
            "✅ {} subtitle file(s) saved under {}",
            plan.len(),
            folder.display()
        );

        Ok(PipelineOutcome::Completed {
            files: plan.len(),
            dirs: plan.touched_dirs.len(),
        })
    }

    /// Remove output from an earlier run so every run starts fresh
    async fn reset_folder(folder: &Path) -> Result<()> {
        if tokio::fs::try_exists(folder).await? {
            debug!("Removing existing folder {}", folder.display());
            tokio::fs::remove_dir_all(folder).await?;
        }
        Ok(())
    }

    async fn release(session: &mut dyn BrowserSession) {
        if let Err(e) = session.close().await {
            warn!("⚠️ Failed to close browser session: {}", e);
        }
    }
}
