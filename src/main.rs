use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use iqiyi_subtitle_rust::episodes::ResumeMode;
use iqiyi_subtitle_rust::{Config, PipelineOptions, PipelineOutcome, SubtitlePipeline};

fn cli() -> Command {
    Command::new("iQIYI Subtitle Downloader (Rust)")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Download subtitles for iQIYI movies and series")
        .arg(
            Arg::new("url")
                .value_name("URL")
                .help("iQIYI play or album page")
                .required(true),
        )
        .arg(
            Arg::new("subtitle-language")
                .short('l')
                .long("subtitle-language")
                .value_name("LANGS")
                .help("Comma separated language tags, or 'all' [default: zh-Hant]"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for subtitles"),
        )
        .arg(
            Arg::new("last-episode")
                .long("last-episode")
                .help("Only download the latest episode of a series")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("locale")
                .long("locale")
                .value_name("LOCALE")
                .help("Interface locale"),
        )
        .arg(
            Arg::new("webdriver")
                .long("webdriver")
                .value_name("URL")
                .help("WebDriver endpoint (e.g. http://localhost:9515)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");

    // Load configuration before logging so the configured level applies
    let (mut config, load_error) = match matches.get_one::<String>("config") {
        Some(path) => (Config::from_file(path)?, None),
        None => match Config::load() {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    let level = if verbose { "debug" } else { config.output.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(verbose)
        .init();

    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {}", e);
    }

    if let Some(output) = matches.get_one::<String>("output") {
        config.download.output_dir = PathBuf::from(output);
    }
    if let Some(webdriver) = matches.get_one::<String>("webdriver") {
        config.browser.webdriver_url = webdriver.clone();
    }
    if let Some(locale) = matches.get_one::<String>("locale") {
        config.output.locale = locale.clone();
    }
    if let Some(languages) = matches.get_one::<String>("subtitle-language") {
        config.output.subtitle_language = languages.clone();
    }

    config.validate()?;
    debug!("{}", config.summary());

    let mut options = PipelineOptions::from_config(&config);
    if matches.get_flag("last-episode") {
        options.resume_mode = ResumeMode::LastOnly;
    }

    let url = matches
        .get_one::<String>("url")
        .ok_or_else(|| anyhow::anyhow!("missing content URL"))?;

    info!("🚀 iQIYI Subtitle Downloader starting...");
    info!("📂 Output directory: {}", config.download.output_dir.display());

    let pipeline = SubtitlePipeline::from_config(&config, options)?;
    let start_time = std::time::Instant::now();

    match pipeline.download_subtitle(url).await? {
        PipelineOutcome::Completed { files, dirs } => {
            info!(
                "🎉 Completed in {:.2}s: {} file(s) across {} folder(s)",
                start_time.elapsed().as_secs_f64(),
                files,
                dirs
            );
        }
        PipelineOutcome::Halted(reason) => {
            // Expected stop for this item; still a clean exit
            warn!("🛑 {}", reason);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_all_options() {
        let matches = cli()
            .try_get_matches_from([
                "iqiyi-subtitle",
                "https://www.iq.com/album/abc?lang=zh_tw",
                "-l",
                "en,zh-Hant",
                "-o",
                "/tmp/subs",
                "--last-episode",
                "--webdriver",
                "http://localhost:4444",
                "-v",
            ])
            .unwrap();

        assert_eq!(
            matches.get_one::<String>("url").map(String::as_str),
            Some("https://www.iq.com/album/abc?lang=zh_tw")
        );
        assert_eq!(
            matches.get_one::<String>("subtitle-language").map(String::as_str),
            Some("en,zh-Hant")
        );
        assert!(matches.get_flag("last-episode"));
        assert!(matches.get_flag("verbose"));
    }

    #[test]
    fn test_cli_requires_url() {
        assert!(cli().try_get_matches_from(["iqiyi-subtitle"]).is_err());
    }
}
