use crate::error::{Result, SubtitleError};
use quick_xml::escape::unescape_with;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// SRT (SubRip Subtitle) entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SRTEntry {
    /// Sequential number
    pub index: u32,
    /// Start timestamp
    pub start: Duration,
    /// End timestamp
    pub end: Duration,
    /// Subtitle text, lines separated by `\n`
    pub text: String,
}

impl SRTEntry {
    /// Create a new SRT entry
    pub fn new(index: u32, start: Duration, end: Duration, text: String) -> Self {
        Self {
            index,
            start,
            end,
            text: text.trim().to_string(),
        }
    }
}

impl fmt::Display for SRTEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{} --> {}\n{}\n",
            self.index,
            format_duration(self.start),
            format_duration(self.end),
            self.text
        )
    }
}

/// SRT file generator
#[derive(Debug, Clone, Default)]
pub struct SRTGenerator {
    entries: Vec<SRTEntry>,
}

impl SRTGenerator {
    /// Create a new SRT generator
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an entry, skipping cues with no text
    pub fn add_entry(&mut self, entry: SRTEntry) {
        if !entry.text.is_empty() {
            self.entries.push(entry);
        }
    }

    /// Sort entries by start time
    pub fn sort_entries(&mut self) {
        self.entries.sort_by(|a, b| a.start.cmp(&b.start));

        // Re-index entries after sorting
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.index = (i + 1) as u32;
        }
    }

    /// Drop consecutive cues with identical timing and text, then re-index
    pub fn dedup(&mut self) {
        self.entries
            .dedup_by(|b, a| a.start == b.start && a.end == b.end && a.text == b.text);

        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.index = (i + 1) as u32;
        }
    }

    /// Generate SRT content as string
    pub fn generate(&self) -> String {
        let mut srt_content = String::new();

        for entry in &self.entries {
            srt_content.push_str(&entry.to_string());
            srt_content.push('\n');
        }

        srt_content
    }

    /// Save SRT to file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.generate();
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get all entries
    pub fn get_entries(&self) -> &[SRTEntry] {
        &self.entries
    }

    /// Validate SRT entries for common issues
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (i, entry) in self.entries.iter().enumerate() {
            if entry.end <= entry.start {
                issues.push(format!("Entry {}: End time is not after start time", i + 1));
            }

            if entry.text.trim().is_empty() {
                issues.push(format!("Entry {}: Empty text", i + 1));
            }
        }

        issues
    }
}

/// SRT formatting utilities
pub struct SRTFormatter;

impl SRTFormatter {
    /// Clean cue text: strip markup tags, decode common entities, trim each line
    pub fn clean_text(text: &str) -> String {
        let mut stripped = String::with_capacity(text.len());
        let mut in_tag = false;
        for c in text.chars() {
            match c {
                '<' => in_tag = true,
                '>' if in_tag => in_tag = false,
                _ if !in_tag => stripped.push(c),
                _ => {}
            }
        }

        // A stray `&` leaves the cue undecoded rather than failing it
        let decoded = unescape_with(&stripped, html_entity)
            .map(|text| text.into_owned())
            .unwrap_or_else(|_| stripped.clone());

        decoded
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some(" "),
        _ => None,
    }
}

/// Format duration as SRT timestamp (HH:MM:SS,mmm)
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let milliseconds = duration.subsec_millis();

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, milliseconds)
}

/// Parse a cue timestamp: `HH:MM:SS.mmm`, `MM:SS.mmm`, or with a `,` separator
pub fn parse_cue_timestamp(timestamp: &str) -> Result<Duration> {
    let invalid = || SubtitleError::Conversion(format!("invalid timestamp: {}", timestamp));

    let normalized = timestamp.trim().replace(',', ".");
    let (clock, millis) = match normalized.split_once('.') {
        Some((clock, fraction)) => {
            // Pad or cut the fraction to milliseconds
            let digits: String = fraction.chars().chain("000".chars()).take(3).collect();
            (clock.to_string(), digits.parse::<u64>().map_err(|_| invalid())?)
        }
        None => (normalized.clone(), 0),
    };

    let parts: Vec<u64> = clock
        .split(':')
        .map(|part| part.parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| invalid())?;

    let seconds = match parts.as_slice() {
        [h, m, s] => h * 3600 + m * 60 + s,
        [m, s] => m * 60 + s,
        _ => return Err(invalid()),
    };

    Ok(Duration::from_millis(seconds * 1000 + millis))
}
