//! Video source URL parsing and player selection.
//!
//! YouTube links come in several shapes (`youtu.be/<id>`, `/embed/<id>`,
//! `watch?v=<id>`, `&v=<id>`); a valid ID is exactly 11 characters.
//! Google Drive links carry the file ID after `/file/d/`, `id=` or `/d/`,
//! tried in that order.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Length of a YouTube video ID.
pub const YOUTUBE_ID_LEN: usize = 11;

fn youtube_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^.*(youtu.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
            .expect("youtube pattern is valid")
    })
}

fn drive_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"/file/d/([a-zA-Z0-9_-]+)").expect("drive file pattern is valid"),
            Regex::new(r"id=([a-zA-Z0-9_-]+)").expect("drive id pattern is valid"),
            Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("drive short pattern is valid"),
        ]
    })
}

/// Extract the 11-character video ID from a YouTube URL.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    let captures = youtube_pattern().captures(url)?;
    let id = captures.get(2)?.as_str();
    (id.len() == YOUTUBE_ID_LEN).then(|| id.to_string())
}

/// Extract the file ID from a Google Drive sharing URL.
pub fn extract_drive_id(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    drive_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Thumbnail URL YouTube serves for a video ID.
pub fn youtube_thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/mqdefault.jpg", video_id)
}

/// True for thumbnails derived from a YouTube ID rather than uploaded.
pub fn is_derived_thumbnail(thumbnail: &str) -> bool {
    thumbnail.starts_with("https://img.youtube.com/vi/")
}

/// What the video modal should embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "player", rename_all = "lowercase")]
pub enum Player {
    /// YouTube iframe embed.
    #[serde(rename_all = "camelCase")]
    YouTube {
        /// Embed URL with related-video and branding suppression.
        embed_url: String,
    },
    /// Google Drive preview iframe.
    #[serde(rename_all = "camelCase")]
    Drive {
        /// Preview URL.
        preview_url: String,
    },
    /// Native video element.
    #[serde(rename_all = "camelCase")]
    File {
        /// Inline payload or URL.
        src: String,
        /// Whether the native download control stays enabled.
        allow_download: bool,
    },
    /// Placeholder shown instead of a broken embed.
    Unavailable {
        /// Message shown in the player area.
        message: String,
    },
}

impl Player {
    /// Player for a YouTube URL, or a placeholder when it does not parse.
    pub fn youtube(url: &str) -> Self {
        match extract_youtube_id(url) {
            Some(id) => Player::YouTube {
                embed_url: format!(
                    "https://www.youtube.com/embed/{}?rel=0&modestbranding=1&autoplay=1&cc_load_policy=0",
                    id
                ),
            },
            None => Player::Unavailable {
                message: "Invalid YouTube URL".to_string(),
            },
        }
    }

    /// Player for a Google Drive URL, or a placeholder when it does not parse.
    pub fn drive(url: &str) -> Self {
        match extract_drive_id(url) {
            Some(id) => Player::Drive {
                preview_url: format!("https://drive.google.com/file/d/{}/preview", id),
            },
            None => Player::Unavailable {
                message: "Invalid Google Drive URL".to_string(),
            },
        }
    }
}
