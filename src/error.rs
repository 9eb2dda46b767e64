//! Error and terminal-outcome types shared by the whole pipeline

use std::fmt;

/// Result type for subtitle pipeline operations
pub type Result<T> = std::result::Result<T, SubtitleError>;

/// Error types for subtitle pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum SubtitleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed metadata response: {0}")]
    MetadataParse(String),

    #[error("No request matching {pattern} observed within {timeout_secs}s")]
    ManifestNotFound { pattern: String, timeout_secs: u64 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Failed to download {file}: {reason}")]
    Download { file: String, reason: String },

    #[error("Subtitle conversion failed: {0}")]
    Conversion(String),

    #[error("Invalid content URL: {0}")]
    InvalidUrl(String),
}

/// Expected, user-facing reasons for abandoning a content item.
///
/// These terminate the current item cleanly; the binary exits 0 after logging them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// Caller's country is not in the album's allow-list
    RegionDenied { allowed: Vec<String> },
    /// The manifest carries no subtitle listing at all
    NoEmbeddedSubtitles,
    /// None of the requested languages is offered
    NoMatchingLanguage { available: Vec<String> },
    /// The episode window is empty
    NoEpisodes,
    /// Every episode was skipped, so there is nothing to fetch
    NothingToDownload,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::RegionDenied { allowed } => {
                write!(f, "This video is only allowed in: {}", allowed.join(", "))
            }
            HaltReason::NoEmbeddedSubtitles => {
                write!(f, "Sorry, there's no embedded subtitles in this video!")
            }
            HaltReason::NoMatchingLanguage { available } => {
                write!(f, "Subtitle available languages: {}", available.join(", "))
            }
            HaltReason::NoEpisodes => write!(f, "No released episodes to download"),
            HaltReason::NothingToDownload => write!(f, "No subtitles could be resolved"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halt_reason_messages() {
        let denied = HaltReason::RegionDenied {
            allowed: vec!["tw".to_string(), "hk".to_string()],
        };
        assert_eq!(denied.to_string(), "This video is only allowed in: tw, hk");

        let no_match = HaltReason::NoMatchingLanguage {
            available: vec!["en".to_string()],
        };
        assert!(no_match.to_string().contains("en"));
    }

    #[test]
    fn test_manifest_error_message() {
        let err = SubtitleError::ManifestNotFound {
            pattern: "cache-video".to_string(),
            timeout_secs: 30,
        };
        assert!(err.to_string().contains("30s"));
    }
}
