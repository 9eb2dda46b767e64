//! WebVTT and platform XML to SRT conversion

use super::srt::{parse_cue_timestamp, SRTEntry, SRTFormatter, SRTGenerator};
use super::SubtitleConverter;
use crate::error::{Result, SubtitleError};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Parse WebVTT content into SRT entries.
///
/// Cue identifiers, `NOTE`/`STYLE`/`REGION` blocks and cue settings are ignored.
pub fn parse_webvtt(content: &str) -> Result<SRTGenerator> {
    let mut generator = SRTGenerator::new();
    let normalized = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");

    for block in normalized.split("\n\n") {
        let lines = block.lines().skip_while(|line| line.trim().is_empty());
        let mut timing = None;
        let mut text_lines = Vec::new();

        for line in lines {
            if timing.is_none() {
                if let Some((start, rest)) = line.split_once("-->") {
                    // "00:00:01.000 --> 00:00:02.000 line:90%" keeps only the end timestamp
                    let end = rest.split_whitespace().next().unwrap_or_default();
                    timing = Some((parse_cue_timestamp(start)?, parse_cue_timestamp(end)?));
                }
                continue;
            }
            text_lines.push(line);
        }

        if let Some((start, end)) = timing {
            let text = SRTFormatter::clean_text(&text_lines.join("\n"));
            generator.add_entry(SRTEntry::new(generator.len() as u32 + 1, start, end, text));
        }
    }

    generator.sort_entries();
    generator.dedup();
    Ok(generator)
}

/// Element of a `<dia>` record whose text is being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DialogueField {
    Start,
    End,
    Text,
}

fn xml_error(e: impl fmt::Display) -> SubtitleError {
    SubtitleError::Conversion(format!("invalid subtitle XML: {}", e))
}

fn parse_millis(value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| SubtitleError::Conversion(format!("invalid cue time: {}", value)))
}

/// Parse platform XML (`<dia><st>ms</st><et>ms</et><sub>text</sub></dia>`) into SRT entries.
///
/// Attributes on any element are ignored. `<br/>` inside `<sub>` becomes a line break,
/// and records missing either time are dropped.
pub fn parse_xml(content: &str) -> Result<SRTGenerator> {
    let mut generator = SRTGenerator::new();
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut field = None;
    let mut start = None;
    let mut end = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.name().as_ref() {
                b"dia" => {
                    field = None;
                    start = None;
                    end = None;
                    text.clear();
                }
                b"st" => field = Some(DialogueField::Start),
                b"et" => field = Some(DialogueField::End),
                b"sub" => field = Some(DialogueField::Text),
                _ => {}
            },
            Event::Empty(e) if field == Some(DialogueField::Text) && e.name().as_ref() == b"br" => {
                text.push('\n');
            }
            Event::Text(e) => {
                let value = e.unescape().map_err(xml_error)?;
                match field {
                    Some(DialogueField::Start) => start = Some(parse_millis(&value)?),
                    Some(DialogueField::End) => end = Some(parse_millis(&value)?),
                    Some(DialogueField::Text) => text.push_str(&value),
                    None => {}
                }
            }
            Event::CData(e) if field == Some(DialogueField::Text) => {
                // Raw markup; entities and tags are handled by the text cleanup
                let raw = String::from_utf8_lossy(&e.into_inner()).into_owned();
                text.push_str(&raw.replace("<br/>", "\n").replace("<br>", "\n"));
            }
            Event::End(e) => match e.name().as_ref() {
                b"st" | b"et" | b"sub" => field = None,
                b"dia" => {
                    if let (Some(start), Some(end)) = (start.take(), end.take()) {
                        let cue = SRTFormatter::clean_text(&text);
                        generator.add_entry(SRTEntry::new(generator.len() as u32 + 1, start, end, cue));
                    }
                    text.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    generator.sort_entries();
    generator.dedup();
    Ok(generator)
}

/// Converts downloaded subtitles in place to SRT
#[derive(Debug, Clone, Default)]
pub struct SrtConverter;

impl SrtConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert one `.vtt`/`.xml` file to a sibling `.srt` and remove the source
    pub async fn convert_file(&self, source: &Path) -> Result<PathBuf> {
        let content = tokio::fs::read_to_string(source).await?;

        let generator = match source.extension().and_then(|ext| ext.to_str()) {
            Some("vtt") => parse_webvtt(&content)?,
            Some("xml") => parse_xml(&content)?,
            _ => {
                return Err(SubtitleError::Conversion(format!(
                    "unsupported subtitle format: {}",
                    source.display()
                )))
            }
        };

        for issue in generator.validate() {
            warn!("⚠️ {}: {}", source.display(), issue);
        }

        let target = source.with_extension("srt");
        generator.save_to_file(&target).await?;
        tokio::fs::remove_file(source).await?;

        debug!("Converted {} ({} cues)", target.display(), generator.len());
        Ok(target)
    }

    async fn convertible_files(folder: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(folder).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let convertible = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == "vtt" || ext == "xml")
                .unwrap_or(false);
            if convertible && path.is_file() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Count `.srt` files below `folder`, recursively
    pub fn count_srt_files(folder: &Path) -> usize {
        WalkDir::new(folder)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("srt"))
            .count()
    }
}

#[async_trait]
impl SubtitleConverter for SrtConverter {
    async fn convert(&self, folder: &Path, platform: Option<&str>, locale: &str) -> Result<()> {
        if !folder.is_dir() {
            return Err(SubtitleError::Conversion(format!(
                "not a directory: {}",
                folder.display()
            )));
        }

        let files = Self::convertible_files(folder).await?;
        for file in &files {
            self.convert_file(file).await?;
        }
        debug!("Converted {} file(s) in {} [{}]", files.len(), folder.display(), locale);

        if let Some(platform) = platform {
            let total = Self::count_srt_files(folder);
            info!("🎞️ {}: {} subtitle(s) ready in {}", platform, total, folder.display());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VTT: &str = "WEBVTT\n\nNOTE generated\n\n1\n00:00:01.000 --> 00:00:02.500 line:90%\n<c.white>你好</c>\n\n00:03.000 --> 00:04.000\nSecond\nline\n";

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xml><dia><st>1000</st><et>2500</et><sub><![CDATA[Hello &amp; welcome]]></sub></dia>
<dia><st>3000</st><et>4000</et><sub>Bye</sub></dia></xml>"#;

    #[test]
    fn test_parse_webvtt() {
        let generator = parse_webvtt(VTT).unwrap();
        let entries = generator.get_entries();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "你好");
        assert_eq!(entries[0].end, Duration::from_millis(2500));
        assert_eq!(entries[1].start, Duration::from_secs(3));
        assert_eq!(entries[1].text, "Second\nline");
    }

    #[test]
    fn test_parse_xml() {
        let generator = parse_xml(XML).unwrap();
        let entries = generator.get_entries();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "Hello & welcome");
        assert_eq!(entries[0].start, Duration::from_secs(1));
        assert_eq!(entries[1].text, "Bye");
    }

    #[test]
    fn test_parse_xml_decodes_references_and_attributes() {
        let xml = r#"<xml>
<dia id="1"><st>500</st><et>1500</et><sub>Tom &#38; Jerry &#x4F60;</sub></dia>
<dia id="2"><st>2000</st><et>3000</et><sub>first<br/>second</sub></dia>
</xml>"#;
        let generator = parse_xml(xml).unwrap();
        let entries = generator.get_entries();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "Tom & Jerry 你");
        assert_eq!(entries[0].start, Duration::from_millis(500));
        assert_eq!(entries[1].text, "first\nsecond");
        assert_eq!(entries[1].end, Duration::from_secs(3));
    }

    #[test]
    fn test_parse_xml_rejects_malformed_input() {
        let err = parse_xml("<xml><dia><st>1</st><et>2</et><sub>x</dia></xml>").unwrap_err();
        assert!(matches!(err, SubtitleError::Conversion(_)));

        let err = parse_xml("<xml><dia><st>soon</st><et>2</et><sub>x</sub></dia></xml>").unwrap_err();
        assert!(matches!(err, SubtitleError::Conversion(_)));
    }

    #[tokio::test]
    async fn test_convert_folder_replaces_sources() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("Show.S01E01.en.vtt"), VTT).unwrap();
        std::fs::write(temp_dir.path().join("Show.S01E02.en.xml"), XML).unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "keep").unwrap();

        SrtConverter::new().convert(temp_dir.path(), None, "en").await.unwrap();

        assert!(temp_dir.path().join("Show.S01E01.en.srt").exists());
        assert!(temp_dir.path().join("Show.S01E02.en.srt").exists());
        assert!(!temp_dir.path().join("Show.S01E01.en.vtt").exists());
        assert!(!temp_dir.path().join("Show.S01E02.en.xml").exists());
        assert!(temp_dir.path().join("notes.txt").exists());

        let srt = std::fs::read_to_string(temp_dir.path().join("Show.S01E02.en.srt")).unwrap();
        assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:02,500\nHello & welcome\n"));
    }

    #[tokio::test]
    async fn test_platform_pass_counts_nested_files() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("en");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("a.en.vtt"), VTT).unwrap();

        let converter = SrtConverter::new();
        converter.convert(&nested, None, "en").await.unwrap();
        converter.convert(temp_dir.path(), Some("iQIYI"), "en").await.unwrap();

        assert_eq!(SrtConverter::count_srt_files(temp_dir.path()), 1);
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let err = SrtConverter::new().convert(&missing, None, "en").await.unwrap_err();
        assert!(matches!(err, SubtitleError::Conversion(_)));
    }
}
