use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the iQIYI subtitle downloader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Platform endpoints and URL patterns
    pub platform: PlatformConfig,

    /// Browser automation settings
    pub browser: BrowserConfig,

    /// Download and network settings
    pub download: DownloadConfig,

    /// Output and logging settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Platform tag used in file names (e.g. `iQIYI`)
    pub tag: String,

    /// Base URL of album pages
    pub album_base_url: String,

    /// Base URL of episode play pages
    pub play_base_url: String,

    /// Episode listing API template with `{album_id}`, `{total}` and `{start_order}`
    pub episode_list_api: String,

    /// Host prepended to relative subtitle paths
    pub meta_host: String,

    /// Regex matching the subtitle manifest request emitted by the player
    pub manifest_pattern: String,

    /// Language code forced onto album and play URLs
    pub lang_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver)
    pub webdriver_url: String,

    /// Browser name requested from WebDriver
    pub browser_name: String,

    /// Run the browser without a window
    pub headless: bool,

    /// Extra command line arguments for the browser
    pub args: Vec<String>,

    /// How long to wait for the manifest request (seconds)
    pub manifest_timeout_seconds: u64,

    /// Delay between network log polls (milliseconds)
    pub poll_interval_millis: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Base output directory
    pub output_dir: PathBuf,

    /// Maximum concurrent subtitle downloads
    pub concurrency: usize,

    /// Timeout for HTTP requests (seconds)
    pub request_timeout_seconds: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// IP geolocation endpoint returning `{"country": ".."}`
    pub geolocation_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Log level
    pub log_level: String,

    /// Locale handed to the subtitle converter
    pub locale: String,

    /// Default subtitle languages when none are given on the command line
    pub subtitle_language: String,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let home_config = std::env::var("HOME")
            .map(|home| format!("{}/.config/iqiyi-subtitle/config.toml", home))
            .unwrap_or_default();

        // Try to load from various locations
        let config_paths = [
            "iqiyi-subtitle.toml".to_string(),
            "config/iqiyi-subtitle.toml".to_string(),
            home_config,
            "/etc/iqiyi-subtitle/config.toml".to_string(),
        ];

        for path in config_paths.iter().filter(|p| !p.is_empty()) {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config.with_env_overrides());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        // Try environment variables
        if let Ok(config) = Self::from_env() {
            return Ok(config);
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from an explicit path
    pub fn from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path, e))?;
        let config: Config = toml::from_str(&config_str)?;
        tracing::info!("📄 Loaded configuration from: {}", path);
        Ok(config.with_env_overrides())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(output_dir) = std::env::var("IQIYI_SUBTITLE_OUTPUT_DIR") {
            self.download.output_dir = PathBuf::from(output_dir);
        }

        if let Ok(webdriver_url) = std::env::var("IQIYI_SUBTITLE_WEBDRIVER_URL") {
            self.browser.webdriver_url = webdriver_url;
        }

        if let Ok(log_level) = std::env::var("IQIYI_SUBTITLE_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        if let Ok(concurrency) = std::env::var("IQIYI_SUBTITLE_CONCURRENCY") {
            self.download.concurrency = concurrency.parse().unwrap_or(self.download.concurrency);
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.download.concurrency == 0 {
            return Err(anyhow!("concurrency must be greater than 0"));
        }

        if self.browser.manifest_timeout_seconds == 0 {
            return Err(anyhow!("manifest_timeout_seconds must be greater than 0"));
        }

        if Regex::new(&self.platform.manifest_pattern).is_err() {
            return Err(anyhow!(
                "manifest_pattern is not a valid regex: {}",
                self.platform.manifest_pattern
            ));
        }

        for placeholder in ["{album_id}", "{total}", "{start_order}"] {
            if !self.platform.episode_list_api.contains(placeholder) {
                return Err(anyhow!("episode_list_api is missing {}", placeholder));
            }
        }

        if !self.download.output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&self.download.output_dir) {
                return Err(anyhow!("Cannot create output directory: {}", e));
            }
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "iQIYI Subtitle Configuration:\n\
            - Platform: {}\n\
            - WebDriver: {}\n\
            - Manifest Timeout: {}s\n\
            - Output Directory: {}\n\
            - Download Concurrency: {}\n\
            - Locale: {}",
            self.platform.tag,
            self.browser.webdriver_url,
            self.browser.manifest_timeout_seconds,
            self.download.output_dir.display(),
            self.download.concurrency,
            self.output.locale
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: PlatformConfig {
                tag: "iQIYI".to_string(),
                album_base_url: "https://www.iq.com/album".to_string(),
                play_base_url: "https://www.iq.com/play".to_string(),
                episode_list_api: "https://pcw-api.iq.com/api/episodeListSource/{album_id}?platformId=3&modeCode=id&langCode=zh_tw&deviceId=21fcb553c8e206bb515b497bb6376aa4&endOrder={total}&startOrder={start_order}".to_string(),
                meta_host: "https://meta.video.iqiyi.com".to_string(),
                manifest_pattern: r"https:\/\/cache-video\.iq\.com\/dash\?".to_string(),
                lang_code: "zh_tw".to_string(),
            },
            browser: BrowserConfig {
                webdriver_url: "http://localhost:9515".to_string(),
                browser_name: "chrome".to_string(),
                headless: true,
                args: vec![
                    "--mute-audio".to_string(),
                    "--disable-gpu".to_string(),
                    "--no-sandbox".to_string(),
                ],
                manifest_timeout_seconds: 30,
                poll_interval_millis: 500,
            },
            download: DownloadConfig {
                output_dir: PathBuf::from("./output"),
                concurrency: num_cpus::get().min(8), // Use available cores, max 8
                request_timeout_seconds: 30,
                user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                geolocation_endpoint: "https://ipinfo.io/json".to_string(),
            },
            output: OutputConfig {
                log_level: "info".to_string(),
                locale: "zh-Hant".to_string(),
                subtitle_language: "zh-Hant".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.download.output_dir = dir;
        self
    }

    pub fn with_webdriver_url(mut self, url: String) -> Self {
        self.config.browser.webdriver_url = url;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.download.concurrency = concurrency;
        self
    }

    pub fn with_manifest_timeout(mut self, seconds: u64) -> Self {
        self.config.browser.manifest_timeout_seconds = seconds;
        self
    }

    pub fn with_locale(mut self, locale: String) -> Self {
        self.config.output.locale = locale;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.browser.headless = headless;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
