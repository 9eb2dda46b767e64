//! Season label parsing and episode window selection for series
use crate::platform::{ContentRecord, EpisodeRef};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Season label used when the title carries no season marker
pub const DEFAULT_SEASON: &str = "01";

/// Largest season that fits the two-digit label
const MAX_SEASON: u32 = 99;

fn season_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+)第(.+)季").expect("season pattern is valid"))
}

/// Split a series title into its base title and a two-digit season label.
///
/// `"Show 第二季"` becomes `("Show", "02")`; titles without a marker are season `"01"`.
pub fn parse_season_and_title(raw_title: &str) -> (String, String) {
    let title = raw_title.trim();

    if let Some(captures) = season_pattern().captures(title) {
        let base = captures.get(1).map(|m| m.as_str().trim()).unwrap_or(title);
        let numeral = captures.get(2).map(|m| m.as_str().trim()).unwrap_or("");

        match numeral_to_number(numeral) {
            Some(season) if (1..=MAX_SEASON).contains(&season) => {
                debug!("Parsed season {} from title: {}", season, title);
                return (base.to_string(), format!("{:02}", season));
            }
            _ => {
                warn!("⚠️ Unusable season numeral '{}', assuming season 1", numeral);
                return (base.to_string(), DEFAULT_SEASON.to_string());
            }
        }
    }

    (title.to_string(), DEFAULT_SEASON.to_string())
}

fn digit_value(c: char) -> Option<u32> {
    match c {
        '零' | '〇' => Some(0),
        '一' => Some(1),
        '二' | '兩' | '两' => Some(2),
        '三' => Some(3),
        '四' => Some(4),
        '五' => Some(5),
        '六' => Some(6),
        '七' => Some(7),
        '八' => Some(8),
        '九' => Some(9),
        '0'..='9' => c.to_digit(10),
        '０'..='９' => Some(c as u32 - '０' as u32),
        _ => None,
    }
}

/// Convert a textual numeral (一, 十二, 二十三, 12, １２) to a number
pub fn numeral_to_number(numeral: &str) -> Option<u32> {
    let numeral = numeral.trim();
    if numeral.is_empty() {
        return None;
    }

    // Plain positional digits, arabic or Chinese ("12", "一二")
    if !numeral.contains('十') && !numeral.contains('百') {
        return numeral.chars().try_fold(0u32, |acc, c| {
            acc.checked_mul(10)?.checked_add(digit_value(c)?)
        });
    }

    let mut total = 0u32;
    let mut pending: Option<u32> = None;
    for c in numeral.chars() {
        let unit = match c {
            '百' => 100,
            '十' => 10,
            _ => {
                pending = Some(digit_value(c)?);
                continue;
            }
        };
        total = total.checked_add(pending.take().unwrap_or(1).checked_mul(unit)?)?;
    }
    total.checked_add(pending.unwrap_or(0))
}

/// How much of a series to process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeMode {
    /// Every released episode from the album's first order
    #[default]
    All,
    /// Only the most recent episode
    LastOnly,
}

/// Series metadata derived from an album record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesWindow {
    pub album_id: String,
    pub title: String,
    pub start_order: u32,
    pub original_total: u32,
    pub max_order: Option<u32>,
    pub season_label: String,
}

impl SeriesWindow {
    pub fn from_record(record: &ContentRecord) -> Self {
        let (title, season_label) = parse_season_and_title(&record.name);
        Self {
            album_id: record.id.clone(),
            title,
            start_order: record.start_order,
            original_total: record.original_total,
            max_order: record.max_order,
            season_label,
        }
    }

    /// Latest released episode; falls back to the announced total
    pub fn current(&self) -> u32 {
        self.max_order.unwrap_or(self.original_total)
    }

    pub fn season_number(&self) -> u32 {
        self.season_label.parse().unwrap_or(1)
    }
}

/// Whether the series is complete or still airing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiringState {
    Complete,
    Updating,
}

/// Range of episode orders to request from the listing API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeWindow {
    pub start_order: u32,
    pub end_order: u32,
    pub mode: ResumeMode,
    pub state: AiringState,
}

impl EpisodeWindow {
    /// A start beyond the current episode yields nothing to fetch
    pub fn is_empty(&self) -> bool {
        self.start_order > self.end_order
    }

    /// Narrow a fetched listing to the episodes this window covers
    pub fn select(&self, listing: Vec<EpisodeRef>) -> Vec<EpisodeRef> {
        match self.mode {
            ResumeMode::LastOnly => listing.into_iter().last().into_iter().collect(),
            ResumeMode::All => listing,
        }
    }
}

/// Decide which episodes to process for a series
pub fn select_episode_window(series: &SeriesWindow, mode: ResumeMode) -> EpisodeWindow {
    let current = series.current();
    let state = if current < series.original_total {
        AiringState::Updating
    } else {
        AiringState::Complete
    };

    let window = EpisodeWindow {
        start_order: series.start_order,
        end_order: current,
        mode,
        state,
    };

    let season = series.season_number();
    if window.is_empty() {
        warn!(
            "⚠️ Season {} starts at episode {} but only {} released",
            season, series.start_order, current
        );
    } else if mode == ResumeMode::LastOnly {
        info!(
            "📺 Season {} total: {} episode(s)\tdownload season {} last episode",
            season, current, season
        );
    } else if state == AiringState::Updating {
        info!(
            "📺 Season {} total: {} episode(s)\tupdate to episode {}\tdownload all episodes",
            season, series.original_total, current
        );
    } else {
        info!(
            "📺 Season {} total: {} episode(s)\tdownload all episodes",
            season, series.original_total
        );
    }

    window
}

/// Keep episodes up to, but excluding, the first preview-gated entry.
///
/// The listing is ordered, so everything after a preview is unreleased as well.
pub fn filter_released(episodes: Vec<EpisodeRef>) -> Vec<EpisodeRef> {
    let total = episodes.len();
    let released: Vec<EpisodeRef> = episodes
        .into_iter()
        .take_while(|episode| !episode.is_preview())
        .collect();

    if released.len() < total {
        info!(
            "⏭️ Stopping at preview episode: {} of {} listed episode(s) released",
            released.len(),
            total
        );
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ContentKind;

    fn episode(order: u32, preview: bool) -> EpisodeRef {
        EpisodeRef {
            order: Some(order),
            play_loc_suffix: Some(format!("episode-{}", order)),
            pay_mark_font: if preview { Some("Preview".to_string()) } else { None },
        }
    }

    fn series(start: u32, total: u32, max: Option<u32>) -> SeriesWindow {
        SeriesWindow {
            album_id: "a1".to_string(),
            title: "Show".to_string(),
            start_order: start,
            original_total: total,
            max_order: max,
            season_label: "01".to_string(),
        }
    }

    #[test]
    fn test_season_parsing() {
        assert_eq!(
            parse_season_and_title("Show 第二季"),
            ("Show".to_string(), "02".to_string())
        );
        assert_eq!(parse_season_and_title("Show"), ("Show".to_string(), "01".to_string()));
        assert_eq!(
            parse_season_and_title("夢華錄第十二季"),
            ("夢華錄".to_string(), "12".to_string())
        );
    }

    #[test]
    fn test_numeral_conversion() {
        assert_eq!(numeral_to_number("一"), Some(1));
        assert_eq!(numeral_to_number("十"), Some(10));
        assert_eq!(numeral_to_number("十五"), Some(15));
        assert_eq!(numeral_to_number("二十"), Some(20));
        assert_eq!(numeral_to_number("二十三"), Some(23));
        assert_eq!(numeral_to_number("3"), Some(3));
        assert_eq!(numeral_to_number("１２"), Some(12));
        assert_eq!(numeral_to_number("新"), None);
        assert_eq!(numeral_to_number("一百零五"), Some(105));
    }

    #[test]
    fn test_numeral_overflow_is_unreadable() {
        assert_eq!(numeral_to_number("99999999999"), None);
        assert_eq!(numeral_to_number("九九九九九九九九九九九"), None);
        assert_eq!(
            parse_season_and_title("X 第99999999999季"),
            ("X".to_string(), DEFAULT_SEASON.to_string())
        );
    }

    #[test]
    fn test_season_label_stays_two_digits() {
        let (title, label) = parse_season_and_title("Show 第一百季");
        assert_eq!(title, "Show");
        assert_eq!(label, DEFAULT_SEASON);

        let (_, label) = parse_season_and_title("Show 第九十九季");
        assert_eq!(label, "99");
    }

    #[test]
    fn test_filter_stops_at_preview() {
        let listing = vec![episode(1, false), episode(2, false), episode(3, true), episode(4, false)];
        let released = filter_released(listing);
        let orders: Vec<u32> = released.iter().filter_map(|e| e.order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn test_window_for_airing_series() {
        let window = select_episode_window(&series(1, 24, Some(10)), ResumeMode::All);
        assert_eq!(window.start_order, 1);
        assert_eq!(window.end_order, 10);
        assert_eq!(window.state, AiringState::Updating);
        assert!(!window.is_empty());
    }

    #[test]
    fn test_window_start_past_current_is_empty() {
        let window = select_episode_window(&series(13, 24, Some(12)), ResumeMode::All);
        assert!(window.is_empty());
    }

    #[test]
    fn test_last_only_selects_most_recent() {
        let window = select_episode_window(&series(1, 3, None), ResumeMode::LastOnly);
        let selected = window.select(vec![episode(1, false), episode(2, false), episode(3, false)]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].order, Some(3));
    }

    #[test]
    fn test_series_window_from_record() {
        let record = ContentRecord {
            id: "a9".to_string(),
            name: " 某劇 第三季 ".to_string(),
            kind: ContentKind::Series,
            year: None,
            play_url: None,
            regions_allowed: vec!["tw".to_string()],
            video_type: "series".to_string(),
            start_order: 1,
            original_total: 20,
            max_order: None,
        };
        let window = SeriesWindow::from_record(&record);
        assert_eq!(window.title, "某劇");
        assert_eq!(window.season_label, "03");
        assert_eq!(window.current(), 20);
    }
}
