//! Normalized message records.
//!
//! [`MessageRecord`] is the unit of output. The normalizer builds one from a
//! raw API message; nothing mutates it afterwards.
//!
//! # Serialization
//!
//! ```
//! use chanpack::record::{MessageRecord, MediaKind};
//! use chrono::{TimeZone, Utc};
//!
//! let ts = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
//! let record = MessageRecord::new(42, ts, "Rust News", "Release day!");
//! let json = serde_json::to_string(&record)?;
//!
//! assert!(json.contains("\"media_kind\":\"none\""));
//! assert!(!json.contains("reply_to_id"));
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of attachment carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    None,
    Photo,
    Video,
    Audio,
    Voice,
    Document,
    Animation,
    Sticker,
    Location,
    Contact,
    Poll,
    Unknown,
}

impl MediaKind {
    /// Placeholder shown in place of an empty body.
    pub fn placeholder(self) -> &'static str {
        match self {
            MediaKind::None => "[Empty message]",
            MediaKind::Photo => "[Photo]",
            MediaKind::Video => "[Video]",
            MediaKind::Audio => "[Audio]",
            MediaKind::Voice => "[Voice message]",
            MediaKind::Document => "[Document]",
            MediaKind::Animation => "[Animation]",
            MediaKind::Sticker => "[Sticker]",
            MediaKind::Location => "[Location]",
            MediaKind::Contact => "[Contact]",
            MediaKind::Poll => "[Poll]",
            MediaKind::Unknown => "[Unsupported media]",
        }
    }

    /// Returns `true` for anything but [`MediaKind::None`].
    pub fn is_media(self) -> bool {
        self != MediaKind::None
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::None => "None",
            MediaKind::Photo => "Photo",
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
            MediaKind::Voice => "Voice",
            MediaKind::Document => "Document",
            MediaKind::Animation => "Animation",
            MediaKind::Sticker => "Sticker",
            MediaKind::Location => "Location",
            MediaKind::Contact => "Contact",
            MediaKind::Poll => "Poll",
            MediaKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Attachment metadata. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMeta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_name: Option<String>,
    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub caption: Option<String>,
}

impl MediaMeta {
    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &MediaMeta::default()
    }
}

/// Where a forwarded message originally came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardOrigin {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub original_id: Option<i64>,
}

/// A normalized channel message.
///
/// `id` is unique within its channel and grows with send order. Entity sets
/// are ordered sets so that rendering is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sender_id: Option<i64>,
    pub sender_display: String,
    pub raw_text: String,
    pub media_kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub media_meta: Option<MediaMeta>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub links: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub mentions: BTreeSet<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub hashtags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reply_to_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub forward_origin: Option<ForwardOrigin>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub edited_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    /// Creates a plain text record with no media, entities or linkage.
    pub fn new(
        id: i64,
        timestamp: DateTime<Utc>,
        sender_display: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            sender_id: None,
            sender_display: sender_display.into(),
            raw_text: raw_text.into(),
            media_kind: MediaKind::None,
            media_meta: None,
            links: BTreeSet::new(),
            mentions: BTreeSet::new(),
            hashtags: BTreeSet::new(),
            reply_to_id: None,
            forward_origin: None,
            view_count: None,
            is_edited: false,
            edited_at: None,
        }
    }

    /// Returns `true` if the body contains non-whitespace text.
    pub fn has_text(&self) -> bool {
        !self.raw_text.trim().is_empty()
    }

    /// Returns `true` if any link, mention or hashtag was extracted.
    pub fn has_entities(&self) -> bool {
        !(self.links.is_empty() && self.mentions.is_empty() && self.hashtags.is_empty())
    }
}
