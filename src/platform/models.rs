//! Album, episode and manifest records returned by the platform's private APIs
use crate::error::{Result, SubtitleError};
use crate::region::parse_allowed_regions;
use serde::Deserialize;
use serde_json::Value;

/// Whether a content page is a single video or a multi-episode series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Movie,
    Series,
}

/// Album metadata for one content page, fetched once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub id: String,
    pub name: String,
    pub kind: ContentKind,
    pub year: Option<String>,
    pub play_url: Option<String>,
    pub regions_allowed: Vec<String>,
    pub video_type: String,
    pub start_order: u32,
    pub original_total: u32,
    pub max_order: Option<u32>,
}

/// One entry of the paginated episode listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EpisodeRef {
    pub order: Option<u32>,
    #[serde(rename = "playLocSuffix")]
    pub play_loc_suffix: Option<String>,
    #[serde(rename = "payMarkFont")]
    pub pay_mark_font: Option<String>,
}

impl EpisodeRef {
    /// Preview-gated entries are not downloadable yet
    pub fn is_preview(&self) -> bool {
        self.pay_mark_font.as_deref() == Some("Preview")
    }
}

/// One subtitle language as listed in the playback manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawSubtitle {
    #[serde(rename = "_name")]
    pub name: String,
    pub webvtt: Option<String>,
    pub xml: Option<String>,
}

/// What a playback manifest says about subtitles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestContent {
    /// No program block; the episode is skipped
    NoProgram,
    /// Program present but no subtitle listing
    NoSubtitles,
    Subtitles(Vec<RawSubtitle>),
}

/// Embedded page state blob `{"props": {...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct PageData {
    pub props: PageProps,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageProps {
    #[serde(rename = "initialState")]
    pub initial_state: Option<InitialState>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InitialState {
    pub album: Option<AlbumState>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumState {
    #[serde(rename = "videoAlbumInfo")]
    pub video_album_info: Option<RawAlbumInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAlbumInfo {
    pub name: String,
    #[serde(rename = "albumId")]
    pub album_id: Value,
    #[serde(default)]
    pub year: Value,
    #[serde(rename = "playUrl")]
    pub play_url: Option<String>,
    #[serde(rename = "regionsAllowed", default)]
    pub regions_allowed: String,
    #[serde(rename = "videoType")]
    pub video_type: String,
    pub from: Option<u32>,
    #[serde(rename = "originalTotal")]
    pub original_total: Option<u32>,
    #[serde(rename = "maxOrder")]
    pub max_order: Option<u32>,
}

/// Render an id-like JSON value that may arrive as a string or a number
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl TryFrom<RawAlbumInfo> for ContentRecord {
    type Error = SubtitleError;

    fn try_from(raw: RawAlbumInfo) -> Result<Self> {
        let id = value_to_string(&raw.album_id)
            .ok_or_else(|| SubtitleError::MetadataParse("album has no albumId".to_string()))?;

        let kind = if raw.video_type == "singleVideo" {
            ContentKind::Movie
        } else {
            ContentKind::Series
        };

        let original_total = raw.original_total.unwrap_or(0);

        Ok(ContentRecord {
            id,
            name: raw.name.trim().to_string(),
            kind,
            year: value_to_string(&raw.year),
            play_url: raw.play_url,
            regions_allowed: parse_allowed_regions(&raw.regions_allowed),
            video_type: raw.video_type,
            start_order: raw.from.unwrap_or(1),
            original_total,
            max_order: raw.max_order,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EpisodeListResponse {
    pub data: EpisodeListData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EpisodeListData {
    #[serde(default)]
    pub epg: Vec<EpisodeRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ManifestResponse {
    pub data: ManifestData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ManifestData {
    pub program: Option<ManifestProgram>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ManifestProgram {
    pub stl: Option<Vec<RawSubtitle>>,
}

impl From<ManifestResponse> for ManifestContent {
    fn from(response: ManifestResponse) -> Self {
        match response.data.program {
            None => ManifestContent::NoProgram,
            Some(ManifestProgram { stl: None }) => ManifestContent::NoSubtitles,
            Some(ManifestProgram { stl: Some(subtitles) }) => ManifestContent::Subtitles(subtitles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_info_into_record() {
        let raw: RawAlbumInfo = serde_json::from_str(
            r#"{"name":" 夢華錄 ","albumId":5328486914190101,"year":2022,"playUrl":"//www.iq.com/play/x","regionsAllowed":"tw,hk","videoType":"series","from":1,"originalTotal":40,"maxOrder":12}"#,
        )
        .unwrap();
        let record = ContentRecord::try_from(raw).unwrap();

        assert_eq!(record.id, "5328486914190101");
        assert_eq!(record.name, "夢華錄");
        assert_eq!(record.kind, ContentKind::Series);
        assert_eq!(record.year.as_deref(), Some("2022"));
        assert_eq!(record.regions_allowed, vec!["tw", "hk"]);
        assert_eq!(record.max_order, Some(12));
    }

    #[test]
    fn test_single_video_is_movie() {
        let raw: RawAlbumInfo = serde_json::from_str(
            r#"{"name":"Film","albumId":"abc","year":"2021","regionsAllowed":"tw","videoType":"singleVideo"}"#,
        )
        .unwrap();
        let record = ContentRecord::try_from(raw).unwrap();
        assert_eq!(record.kind, ContentKind::Movie);
        assert_eq!(record.start_order, 1);
    }

    #[test]
    fn test_manifest_content_states() {
        let none: ManifestResponse = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        assert_eq!(ManifestContent::from(none), ManifestContent::NoProgram);

        let empty: ManifestResponse = serde_json::from_str(r#"{"data":{"program":{}}}"#).unwrap();
        assert_eq!(ManifestContent::from(empty), ManifestContent::NoSubtitles);

        let subs: ManifestResponse = serde_json::from_str(
            r#"{"data":{"program":{"stl":[{"_name":"英語","webvtt":"\/a.vtt"}]}}}"#,
        )
        .unwrap();
        match ManifestContent::from(subs) {
            ManifestContent::Subtitles(list) => {
                assert_eq!(list[0].name, "英語");
                assert_eq!(list[0].webvtt.as_deref(), Some("/a.vtt"));
            }
            other => panic!("unexpected manifest content: {:?}", other),
        }
    }

    #[test]
    fn test_preview_marker() {
        let episode: EpisodeRef =
            serde_json::from_str(r#"{"order":3,"playLocSuffix":"x","payMarkFont":"Preview"}"#).unwrap();
        assert!(episode.is_preview());
    }
}
