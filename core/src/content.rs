//! Content records: notes, tutorials and videos.
//!
//! All three share [`ContentBase`]. Tutorials add a `type` (new paper or
//! old paper); videos carry exactly one source (`youtube`, `gdrive` or
//! `file`) and an optional thumbnail.
//!
//! Records are stored flat, e.g. a video:
//!
//! ```json
//! { "title": "Lesson 1", "month": "2024-03", "access": "paid",
//!   "downloadable": false, "createdAt": 1709251200000,
//!   "source": "youtube", "youtube": "https://youtu.be/dQw4w9WgXcQ",
//!   "thumbnail": "https://img.youtube.com/vi/dQw4w9WgXcQ/mqdefault.jpg" }
//! ```

use crate::calendar;
use crate::error::{Error, Result};
use crate::lenient;
use crate::video;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum decoded size of an inline video upload (50 MiB).
pub const VIDEO_UPLOAD_LIMIT: usize = 50 * 1024 * 1024;

/// Access tier, shared by content records and student accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Visible to everyone.
    #[default]
    Free,
    /// Visible to paid students only.
    Paid,
}

impl Access {
    /// Badge label.
    pub fn label(self) -> &'static str {
        match self {
            Access::Free => "Free",
            Access::Paid => "Paid",
        }
    }

    /// Wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Free => "free",
            Access::Paid => "paid",
        }
    }
}

impl FromStr for Access {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "free" => Ok(Access::Free),
            "paid" => Ok(Access::Paid),
            other => Err(Error::InvalidFilter {
                filter: "access",
                value: other.to_string(),
            }),
        }
    }
}

/// A record is locked for a viewer iff it is paid and the viewer is not.
pub fn is_locked(item: Access, viewer: Access) -> bool {
    item == Access::Paid && viewer != Access::Paid
}

/// The three content collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// PDF notes.
    Notes,
    /// Tutorials ("tutes"), new and past papers.
    #[serde(rename = "tutes", alias = "tutorials")]
    Tutorials,
    /// Videos.
    Videos,
}

impl ContentKind {
    /// All kinds, in navigation order.
    pub const ALL: [ContentKind; 3] = [ContentKind::Notes, ContentKind::Tutorials, ContentKind::Videos];

    /// Store collection path.
    pub fn path(self) -> &'static str {
        match self {
            ContentKind::Notes => "notes",
            ContentKind::Tutorials => "tutes",
            ContentKind::Videos => "videos",
        }
    }

    /// Singular label for messages.
    pub fn label(self) -> &'static str {
        match self {
            ContentKind::Notes => "Note",
            ContentKind::Tutorials => "Tutorial",
            ContentKind::Videos => "Video",
        }
    }
}

impl FromStr for ContentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "notes" => Ok(ContentKind::Notes),
            "tutes" | "tutorials" => Ok(ContentKind::Tutorials),
            "videos" => Ok(ContentKind::Videos),
            other => Err(Error::UnknownContentKind {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Fields shared by every content record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentBase {
    /// Display title.
    #[serde(default)]
    pub title: String,

    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// `YYYY-MM` bucket, if any.
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub month: Option<String>,

    /// Access tier.
    #[serde(default)]
    pub access: Access,

    /// Whether students may download the file.
    #[serde(default, deserialize_with = "lenient::bool_or_string")]
    pub downloadable: bool,

    /// Creation time in epoch milliseconds, assigned once.
    #[serde(
        default,
        deserialize_with = "lenient::epoch_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<i64>,
}

impl ContentBase {
    /// Validate title and month.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::MissingField { field: "title" });
        }
        if let Some(month) = &self.month {
            calendar::validate_month(month)?;
        }
        Ok(())
    }
}

/// Tutorial paper type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TutorialType {
    /// Newly issued tutorial.
    #[default]
    New,
    /// Past paper.
    Old,
}

impl TutorialType {
    /// Badge label.
    pub fn label(self) -> &'static str {
        match self {
            TutorialType::New => "New",
            TutorialType::Old => "Old Paper",
        }
    }
}

impl FromStr for TutorialType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(TutorialType::New),
            "old" => Ok(TutorialType::Old),
            other => Err(Error::InvalidFilter {
                filter: "type",
                value: other.to_string(),
            }),
        }
    }
}

/// Where a video is played from. Exactly one source is active per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum VideoSource {
    /// YouTube URL.
    Youtube {
        /// Original URL as entered.
        #[serde(default)]
        youtube: String,
    },
    /// Google Drive sharing URL.
    Gdrive {
        /// Original URL as entered.
        #[serde(default)]
        gdrive: String,
    },
    /// Uploaded file (data URI) or direct URL.
    File {
        /// Payload; may be absent on edit submissions.
        #[serde(
            default,
            deserialize_with = "lenient::non_empty_string",
            skip_serializing_if = "Option::is_none"
        )]
        file: Option<String>,
    },
}

impl VideoSource {
    /// Badge label.
    pub fn label(&self) -> &'static str {
        match self {
            VideoSource::Youtube { .. } => "YouTube",
            VideoSource::Gdrive { .. } => "Google Drive",
            VideoSource::File { .. } => "Video",
        }
    }

    /// The URL or payload the player needs.
    pub fn media_ref(&self) -> Option<&str> {
        match self {
            VideoSource::Youtube { youtube } => Some(youtube.as_str()).filter(|s| !s.is_empty()),
            VideoSource::Gdrive { gdrive } => Some(gdrive.as_str()).filter(|s| !s.is_empty()),
            VideoSource::File { file } => file.as_deref(),
        }
    }
}

/// A PDF note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,

    /// Inline document payload or URL.
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub file: Option<String>,
}

/// A tutorial paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,

    /// New or old paper.
    #[serde(rename = "type", default)]
    pub tutorial_type: TutorialType,

    /// Inline document payload or URL.
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub file: Option<String>,
}

/// A video lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,

    /// Active source.
    #[serde(flatten)]
    pub source: VideoSource,

    /// Explicit or derived thumbnail.
    #[serde(
        default,
        deserialize_with = "lenient::non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail: Option<String>,
}

/// Behaviour common to the three record types.
pub trait Content: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection this type lives in.
    const KIND: ContentKind;

    /// Shared fields.
    fn base(&self) -> &ContentBase;

    /// Shared fields, mutably.
    fn base_mut(&mut self) -> &mut ContentBase;

    /// Tutorial type, for the tutorials-only type filter.
    fn tutorial_type(&self) -> Option<TutorialType> {
        None
    }

    /// File or URL a viewer opens. Withheld from locked viewers.
    fn media_ref(&self) -> Option<&str>;

    /// Thumbnail shown on the card, if any.
    fn thumbnail(&self) -> Option<String> {
        None
    }

    /// Extra badge after the access badge (tutorial type, video source).
    fn kind_badge(&self) -> Option<&'static str> {
        None
    }

    /// Check required fields. `creating` is false for edits, where a
    /// missing file is filled from the stored record.
    fn validate(&self, creating: bool) -> Result<()>;

    /// Carry file (and thumbnail) over from the stored record when the
    /// submission left them empty, and derive anything computed on save.
    fn prepare_update(&mut self, existing: &Self);

    /// Derive anything computed on save for a fresh record.
    fn prepare_create(&mut self) {}
}

impl Content for Note {
    const KIND: ContentKind = ContentKind::Notes;

    fn base(&self) -> &ContentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ContentBase {
        &mut self.base
    }

    fn media_ref(&self) -> Option<&str> {
        self.file.as_deref()
    }

    fn validate(&self, creating: bool) -> Result<()> {
        self.base.validate()?;
        if creating && self.file.is_none() {
            return Err(Error::MissingFile);
        }
        Ok(())
    }

    fn prepare_update(&mut self, existing: &Self) {
        if self.file.is_none() {
            self.file = existing.file.clone();
        }
    }
}

impl Content for Tutorial {
    const KIND: ContentKind = ContentKind::Tutorials;

    fn base(&self) -> &ContentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ContentBase {
        &mut self.base
    }

    fn tutorial_type(&self) -> Option<TutorialType> {
        Some(self.tutorial_type)
    }

    fn media_ref(&self) -> Option<&str> {
        self.file.as_deref()
    }

    fn kind_badge(&self) -> Option<&'static str> {
        Some(self.tutorial_type.label())
    }

    fn validate(&self, creating: bool) -> Result<()> {
        self.base.validate()?;
        if creating && self.file.is_none() {
            return Err(Error::MissingFile);
        }
        Ok(())
    }

    fn prepare_update(&mut self, existing: &Self) {
        if self.file.is_none() {
            self.file = existing.file.clone();
        }
    }
}

impl Video {
    fn derived_thumbnail(&self) -> Option<String> {
        match &self.source {
            VideoSource::Youtube { youtube } => {
                video::extract_youtube_id(youtube).map(|id| video::youtube_thumbnail_url(&id))
            }
            _ => None,
        }
    }

    /// Player model for this record.
    pub fn player(&self) -> video::Player {
        match &self.source {
            VideoSource::Youtube { youtube } => video::Player::youtube(youtube),
            VideoSource::Gdrive { gdrive } => video::Player::drive(gdrive),
            VideoSource::File { file: Some(file) } => video::Player::File {
                src: file.clone(),
                allow_download: self.base.downloadable,
            },
            VideoSource::File { file: None } => video::Player::Unavailable {
                message: "Video unavailable".to_string(),
            },
        }
    }
}

impl Content for Video {
    const KIND: ContentKind = ContentKind::Videos;

    fn base(&self) -> &ContentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ContentBase {
        &mut self.base
    }

    fn media_ref(&self) -> Option<&str> {
        self.source.media_ref()
    }

    fn thumbnail(&self) -> Option<String> {
        self.thumbnail.clone().or_else(|| self.derived_thumbnail())
    }

    fn kind_badge(&self) -> Option<&'static str> {
        Some(self.source.label())
    }

    fn validate(&self, creating: bool) -> Result<()> {
        self.base.validate()?;
        match &self.source {
            VideoSource::Youtube { youtube } if youtube.trim().is_empty() => {
                Err(Error::MissingVideoUrl {
                    source_label: "YouTube",
                })
            }
            VideoSource::Gdrive { gdrive } if gdrive.trim().is_empty() => {
                Err(Error::MissingVideoUrl {
                    source_label: "Google Drive",
                })
            }
            VideoSource::File { file: None } if creating => Err(Error::MissingFile),
            VideoSource::File { file: Some(file) } => check_inline_size(file, VIDEO_UPLOAD_LIMIT),
            _ => Ok(()),
        }
    }

    fn prepare_update(&mut self, existing: &Self) {
        if let (VideoSource::File { file }, VideoSource::File { file: kept }) =
            (&mut self.source, &existing.source)
        {
            if file.is_none() {
                *file = kept.clone();
            }
        }

        // Uploaded thumbnails survive edits; derived ones follow the URL.
        if self.thumbnail.is_none() {
            self.thumbnail = existing
                .thumbnail
                .clone()
                .filter(|t| !video::is_derived_thumbnail(t));
        }
        self.prepare_create();
        if self.thumbnail.is_none() {
            self.thumbnail = existing.thumbnail.clone();
        }
    }

    fn prepare_create(&mut self) {
        if self.thumbnail.is_none() {
            self.thumbnail = self.derived_thumbnail();
        }
    }
}

/// Reject inline `data:` payloads whose decoded size exceeds `max`.
pub fn check_inline_size(payload: &str, max: usize) -> Result<()> {
    let Some((_, encoded)) = payload
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    else {
        return Ok(());
    };
    let size = encoded.len() / 4 * 3;
    if size > max {
        return Err(Error::PayloadTooLarge { size, max });
    }
    Ok(())
}

/// A record together with its collection ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    /// Collection-unique ID.
    pub id: String,
    /// The record body.
    #[serde(flatten)]
    pub item: T,
}

impl<T> Record<T> {
    /// Pair an ID with a record.
    pub fn new(id: impl Into<String>, item: T) -> Self {
        Self {
            id: id.into(),
            item,
        }
    }
}
