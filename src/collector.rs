//! Subtitle collection: turns manifest subtitle listings into a download plan
use crate::config::PlatformConfig;
use crate::error::Result;
use crate::language::{resolve_tag, LanguageRequest, LanguageSet};
use crate::platform::client::subtitle_url;
use crate::platform::RawSubtitle;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Remote subtitle format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    WebVtt,
    Xml,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::WebVtt => "vtt",
            SubtitleFormat::Xml => "xml",
        }
    }
}

/// One subtitle language offered for a movie or episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    /// Label as shown by the platform
    pub language_label: String,
    /// Canonical language tag
    pub language_tag: String,
    pub format: SubtitleFormat,
    pub remote_url: String,
}

/// A single file handed to the batch downloader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub file_name: String,
    pub local_dir: PathBuf,
    pub remote_url: String,
}

impl DownloadItem {
    pub fn local_path(&self) -> PathBuf {
        self.local_dir.join(&self.file_name)
    }
}

/// Where an item's files land, fixed once per movie or series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryLayout {
    /// One subdirectory per language tag
    PerLanguage,
    /// Directly in the item folder
    Flat,
}

impl DirectoryLayout {
    /// Layout implied by the request alone; `None` for `all`
    pub fn for_request(request: &LanguageRequest) -> Option<Self> {
        request.is_multi().map(Self::from_multi)
    }

    /// Layout for a resolved language set
    pub fn for_languages(languages: &LanguageSet) -> Self {
        Self::from_multi(languages.is_multi())
    }

    fn from_multi(multi: bool) -> Self {
        if multi {
            DirectoryLayout::PerLanguage
        } else {
            DirectoryLayout::Flat
        }
    }
}

/// Files to download plus the directories that need conversion afterwards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitlePlan {
    pub items: Vec<DownloadItem>,
    pub touched_dirs: BTreeSet<PathBuf>,
}

impl SubtitlePlan {
    /// Fold one episode's plan into the running plan
    pub fn accumulate(mut self, step: SubtitlePlan) -> Self {
        self.items.extend(step.items);
        self.touched_dirs.extend(step.touched_dirs);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Tracks for the known languages of a manifest listing.
///
/// WebVTT is preferred over XML; entries with neither, or with an unknown label, are dropped.
pub fn subtitle_tracks(raw: &[RawSubtitle], platform: &PlatformConfig) -> Vec<SubtitleTrack> {
    raw.iter()
        .filter_map(|sub| {
            let tag = resolve_tag(&sub.name)?;
            let (format, path) = match (&sub.webvtt, &sub.xml) {
                (Some(vtt), _) => (SubtitleFormat::WebVtt, vtt),
                (None, Some(xml)) => (SubtitleFormat::Xml, xml),
                (None, None) => {
                    debug!("Subtitle '{}' has no downloadable link", sub.name);
                    return None;
                }
            };

            Some(SubtitleTrack {
                language_label: sub.name.clone(),
                language_tag: tag.to_string(),
                format,
                remote_url: subtitle_url(path, platform),
            })
        })
        .collect()
}

/// Plan downloads for the tracks whose language is in `languages`.
///
/// `PerLanguage` puts each language in its own subdirectory under `folder_path`;
/// `Flat` puts files in `folder_path` directly. Directories are created
/// if missing. Files are named `<file_stem>.<tag>.<vtt|xml>`.
pub fn build_plan(
    tracks: &[SubtitleTrack],
    languages: &LanguageSet,
    layout: DirectoryLayout,
    folder_path: &Path,
    file_stem: &str,
) -> Result<SubtitlePlan> {
    let mut plan = SubtitlePlan::default();

    for track in tracks.iter().filter(|t| languages.contains(&t.language_tag)) {
        let local_dir = match layout {
            DirectoryLayout::PerLanguage => folder_path.join(&track.language_tag),
            DirectoryLayout::Flat => folder_path.to_path_buf(),
        };

        std::fs::create_dir_all(&local_dir)?;

        let file_name = format!("{}.{}.{}", file_stem, track.language_tag, track.format.extension());
        debug!("Planned {} <- {}", file_name, track.remote_url);

        plan.touched_dirs.insert(local_dir.clone());
        plan.items.push(DownloadItem {
            file_name,
            local_dir,
            remote_url: track.remote_url.clone(),
        });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::language::{compute_language_set, LanguageRequest};
    use tempfile::TempDir;

    fn raw(name: &str, webvtt: Option<&str>, xml: Option<&str>) -> RawSubtitle {
        RawSubtitle {
            name: name.to_string(),
            webvtt: webvtt.map(|s| s.to_string()),
            xml: xml.map(|s| s.to_string()),
        }
    }

    fn languages(request: &str, available: &[&str]) -> LanguageSet {
        let available: Vec<String> = available.iter().map(|s| s.to_string()).collect();
        compute_language_set(&LanguageRequest::parse(request), &available).unwrap()
    }

    #[test]
    fn test_tracks_prefer_webvtt() {
        let platform = Config::default().platform;
        let tracks = subtitle_tracks(
            &[
                raw("英語", Some("/en.vtt"), Some("/en.xml")),
                raw("繁體中文", None, Some("/tw.xml")),
                raw("日語", Some("/ja.vtt"), None),
                raw("泰語", None, None),
            ],
            &platform,
        );

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].format, SubtitleFormat::WebVtt);
        assert_eq!(tracks[0].remote_url, "https://meta.video.iqiyi.com/en.vtt");
        assert_eq!(tracks[1].language_tag, "zh-Hant");
        assert_eq!(tracks[1].format, SubtitleFormat::Xml);
    }

    #[test]
    fn test_two_languages_use_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let platform = Config::default().platform;
        let tracks = subtitle_tracks(
            &[raw("英語", Some("/en.vtt"), None), raw("繁體中文", Some("/tw.vtt"), None)],
            &platform,
        );
        let set = languages("en,zh-Hant", &["en", "zh-Hant"]);

        let layout = DirectoryLayout::for_languages(&set);
        let plan = build_plan(&tracks, &set, layout, temp_dir.path(), "Show.S01E01.WEB-DL.iQIYI").unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.touched_dirs.len(), 2);
        assert!(temp_dir.path().join("en").is_dir());
        assert!(temp_dir.path().join("zh-Hant").is_dir());
        assert_eq!(plan.items[0].file_name, "Show.S01E01.WEB-DL.iQIYI.en.vtt");
    }

    #[test]
    fn test_single_language_uses_folder_directly() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("Film");
        let platform = Config::default().platform;
        let tracks = subtitle_tracks(
            &[raw("英語", Some("/en.vtt"), None), raw("繁體中文", None, Some("/tw.xml"))],
            &platform,
        );
        let set = languages("zh-Hant", &["en", "zh-Hant"]);

        let plan = build_plan(&tracks, &set, DirectoryLayout::Flat, &folder, "Film.2022.WEB-DL.iQIYI").unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.touched_dirs.iter().collect::<Vec<_>>(), vec![&folder]);
        assert_eq!(plan.items[0].file_name, "Film.2022.WEB-DL.iQIYI.zh-Hant.xml");
        assert!(folder.is_dir());
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);
    }

    #[test]
    fn test_layout_follows_request_not_offer() {
        let temp_dir = TempDir::new().unwrap();
        let platform = Config::default().platform;
        let tracks = subtitle_tracks(&[raw("英語", Some("/en.vtt"), None)], &platform);

        let request = LanguageRequest::parse("en,zh-Hant");
        let set = compute_language_set(&request, &["en".to_string()]).unwrap();
        assert!(!set.is_multi());

        let layout = DirectoryLayout::for_request(&request).unwrap();
        assert_eq!(layout, DirectoryLayout::PerLanguage);

        let plan = build_plan(&tracks, &set, layout, temp_dir.path(), "Show.S01E03.WEB-DL.iQIYI").unwrap();
        assert_eq!(plan.items[0].local_dir, temp_dir.path().join("en"));
    }

    #[test]
    fn test_layout_for_request() {
        assert_eq!(
            DirectoryLayout::for_request(&LanguageRequest::parse("zh-Hant")),
            Some(DirectoryLayout::Flat)
        );
        assert_eq!(
            DirectoryLayout::for_request(&LanguageRequest::parse("")),
            Some(DirectoryLayout::Flat)
        );
        assert_eq!(DirectoryLayout::for_request(&LanguageRequest::All), None);
    }

    #[test]
    fn test_accumulate_unions_directories() {
        let dir = PathBuf::from("/tmp/show/en");
        let step = |name: &str| SubtitlePlan {
            items: vec![DownloadItem {
                file_name: name.to_string(),
                local_dir: dir.clone(),
                remote_url: format!("https://example.com/{}", name),
            }],
            touched_dirs: [dir.clone()].into_iter().collect(),
        };

        let plan = SubtitlePlan::default().accumulate(step("a")).accumulate(step("b"));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.touched_dirs.len(), 1);
    }
}
