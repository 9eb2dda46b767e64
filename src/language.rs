//! Language label resolution and requested/available language intersection

use crate::error::HaltReason;
use tracing::debug;

/// Tag used when the caller does not ask for anything specific
pub const DEFAULT_LANGUAGE: &str = "zh-Hant";

/// Sentinel selecting every available language
pub const ALL_LANGUAGES: &str = "all";

/// Platform-native subtitle labels and their canonical tags
const LANGUAGE_LABELS: [(&str, &str); 11] = [
    ("英語", "en"),
    ("繁體中文", "zh-Hant"),
    ("簡體中文", "zh-Hans"),
    ("韓語", "ko"),
    ("馬來語", "ms"),
    ("越南語", "vi"),
    ("泰語", "th"),
    ("印尼語", "id"),
    ("阿拉伯語", "ar"),
    ("西班牙語", "es"),
    ("葡萄牙語", "pt"),
];

/// Map a platform subtitle label to its canonical language tag
pub fn resolve_tag(raw_label: &str) -> Option<&'static str> {
    let label = raw_label.trim();
    LANGUAGE_LABELS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, tag)| *tag)
}

/// What the caller asked for on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageRequest {
    /// Every language the title offers
    All,
    /// An explicit list of canonical tags
    Tags(Vec<String>),
}

impl LanguageRequest {
    /// Parse a comma separated option value such as `en,zh-Hant` or `all`
    pub fn parse(value: &str) -> Self {
        let tags: Vec<String> = value
            .split(',')
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(|tag| tag.to_string())
            .collect();

        if tags.iter().any(|tag| tag.eq_ignore_ascii_case(ALL_LANGUAGES)) {
            LanguageRequest::All
        } else {
            LanguageRequest::Tags(tags)
        }
    }

    /// Whether more than one language was asked for; unknown for `All` until resolved
    pub fn is_multi(&self) -> Option<bool> {
        match self {
            LanguageRequest::All => None,
            LanguageRequest::Tags(_) => Some(self.requested_tags().len() > 1),
        }
    }

    /// Tags to intersect with, applying the default when nothing was requested
    fn requested_tags(&self) -> Vec<String> {
        match self {
            LanguageRequest::All => Vec::new(),
            LanguageRequest::Tags(tags) if tags.is_empty() => vec![DEFAULT_LANGUAGE.to_string()],
            LanguageRequest::Tags(tags) => tags.clone(),
        }
    }
}

impl Default for LanguageRequest {
    fn default() -> Self {
        LanguageRequest::Tags(vec![DEFAULT_LANGUAGE.to_string()])
    }
}

/// Non-empty set of language tags that will actually be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSet {
    tags: Vec<String>,
}

impl LanguageSet {
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// More than one language means files go into per-language subdirectories
    pub fn is_multi(&self) -> bool {
        self.tags.len() > 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.as_str())
    }
}

/// Canonical tags for the given raw labels, unknown labels dropped, order kept
pub fn available_tags<'a, I>(raw_labels: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tags: Vec<String> = Vec::new();
    for label in raw_labels {
        match resolve_tag(label) {
            Some(tag) if !tags.iter().any(|t| t == tag) => tags.push(tag.to_string()),
            Some(_) => {}
            None => debug!("Ignoring unknown subtitle label: {}", label),
        }
    }
    tags
}

/// Intersect the caller's request with what the title offers.
///
/// An empty result halts the current content item.
pub fn compute_language_set(
    request: &LanguageRequest,
    available: &[String],
) -> std::result::Result<LanguageSet, HaltReason> {
    let tags: Vec<String> = match request {
        LanguageRequest::All => available.to_vec(),
        LanguageRequest::Tags(_) => request
            .requested_tags()
            .into_iter()
            .filter(|tag| available.contains(tag))
            .fold(Vec::new(), |mut acc, tag| {
                if !acc.contains(&tag) {
                    acc.push(tag);
                }
                acc
            }),
    };

    if tags.is_empty() {
        return Err(HaltReason::NoMatchingLanguage {
            available: available.to_vec(),
        });
    }

    Ok(LanguageSet { tags })
}
