//! Raw message normalization.
//!
//! Turns a [`RawRecord`] into a [`MessageRecord`]: classifies the attachment,
//! flattens formatted text, and pulls links, mentions and hashtags out of the
//! body. Normalization is a pure function of its input, so normalizing the
//! same raw record twice yields identical records.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::api::{RawForward, RawMedia, RawMessage, RawRecord, UnixSeconds};
use crate::record::{ForwardOrigin, MediaKind, MediaMeta, MessageRecord};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url pattern is valid"));
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\w+)").expect("mention pattern is valid"));
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("hashtag pattern is valid"));

/// Why a raw record could not become a [`MessageRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("message id {0} is not positive")]
    InvalidId(i64),

    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

/// Links, mentions and hashtags found in a text body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    pub links: BTreeSet<String>,
    pub mentions: BTreeSet<String>,
    pub hashtags: BTreeSet<String>,
}

/// Normalizes one raw record.
///
/// Returns `Ok(None)` for records that are not user-facing messages (service
/// events and unknown types); the caller drops them from the output but still
/// counts their ids for pagination.
///
/// # Example
///
/// ```rust
/// use chanpack::api::RawRecord;
/// use chanpack::normalize::normalize;
/// use serde_json::json;
///
/// let raw = RawRecord::from_value(json!({
///     "type": "message",
///     "id": 7,
///     "date": 1705314600,
///     "text": "check https://a.b and @carol #news"
/// }));
/// let record = normalize(&raw)?.expect("user message");
/// assert!(record.links.contains("https://a.b"));
/// assert!(record.mentions.contains("carol"));
/// assert!(record.hashtags.contains("news"));
/// # Ok::<(), chanpack::normalize::NormalizeError>(())
/// ```
pub fn normalize(raw: &RawRecord) -> Result<Option<MessageRecord>, NormalizeError> {
    match raw {
        RawRecord::UserMessage(msg) => normalize_message(msg).map(Some),
        RawRecord::ServiceEvent(_) | RawRecord::Unknown { .. } => Ok(None),
        RawRecord::Malformed { reason, .. } => Err(NormalizeError::Malformed(reason.clone())),
    }
}

/// Normalizes a decoded user message.
pub fn normalize_message(msg: &RawMessage) -> Result<MessageRecord, NormalizeError> {
    if msg.id <= 0 {
        return Err(NormalizeError::InvalidId(msg.id));
    }
    let timestamp = to_datetime(msg.date).ok_or(NormalizeError::InvalidTimestamp(msg.date.0))?;

    let (raw_text, text_links) = msg
        .text
        .as_ref()
        .map(extract_text)
        .unwrap_or_default();

    let mut entities = if raw_text.trim().is_empty() {
        Entities::default()
    } else {
        extract_entities(&raw_text)
    };
    entities.links.extend(text_links);

    let (media_kind, media_meta) = match &msg.media {
        Some(media) => (classify_media(media), media_meta(media)),
        None => (MediaKind::None, None),
    };

    let sender_display = match (&msg.from, msg.from_id) {
        (Some(name), _) if !name.trim().is_empty() => name.clone(),
        (_, Some(id)) => format!("user#{id}"),
        _ => String::new(),
    };

    Ok(MessageRecord {
        id: msg.id,
        timestamp,
        sender_id: msg.from_id,
        sender_display,
        raw_text,
        media_kind,
        media_meta,
        links: entities.links,
        mentions: entities.mentions,
        hashtags: entities.hashtags,
        reply_to_id: msg.reply_to_message_id,
        forward_origin: msg.forwarded_from.as_ref().map(forward_origin),
        view_count: msg.views,
        is_edited: msg.edit_date.is_some(),
        edited_at: msg.edit_date.and_then(to_datetime),
    })
}

/// Runs the three entity passes over `text`.
///
/// Each pass is independent and de-duplicates into a set.
pub fn extract_entities(text: &str) -> Entities {
    Entities {
        links: URL_RE
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect(),
        mentions: MENTION_RE
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect(),
        hashtags: HASHTAG_RE
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect(),
    }
}

/// Flattens a message `text` value into plain text.
///
/// The value is either a string or an array of strings and
/// `{"type": ..., "text": ..., "href": ...}` fragments. Returns the
/// concatenated text and the targets of any `text_link` fragments, whose
/// URL is not part of the visible text.
pub fn extract_text(value: &Value) -> (String, Vec<String>) {
    match value {
        Value::String(s) => (s.clone(), Vec::new()),
        Value::Array(items) => {
            let mut text = String::new();
            let mut hrefs = Vec::new();
            for item in items {
                match item {
                    Value::String(s) => text.push_str(s),
                    Value::Object(obj) => {
                        if let Some(s) = obj.get("text").and_then(Value::as_str) {
                            text.push_str(s);
                        }
                        if obj.get("type").and_then(Value::as_str) == Some("text_link") {
                            if let Some(href) = obj.get("href").and_then(Value::as_str) {
                                hrefs.push(href.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
            (text, hrefs)
        }
        _ => (String::new(), Vec::new()),
    }
}

/// Classifies an attachment.
///
/// Attribute kinds that a MIME type cannot express (stickers, voice notes,
/// locations, contacts, polls, photos without a file) win first. Otherwise
/// the MIME type decides, and any other binary payload is a document.
pub fn classify_media(media: &RawMedia) -> MediaKind {
    let kind = media.kind.as_deref().map(str::to_ascii_lowercase);
    match kind.as_deref() {
        Some("sticker") => return MediaKind::Sticker,
        Some("voice" | "voice_message" | "round_video") => return MediaKind::Voice,
        Some("location" | "geo" | "venue" | "live_location") => return MediaKind::Location,
        Some("contact") => return MediaKind::Contact,
        Some("poll") => return MediaKind::Poll,
        Some("animation" | "gif") => return MediaKind::Animation,
        Some("photo") if media.mime_type.is_none() => return MediaKind::Photo,
        _ => {}
    }

    let Some(mime) = media.mime_type.as_deref() else {
        let has_payload = media.file_name.is_some()
            || media.size.is_some()
            || kind.as_deref() == Some("document");
        return if has_payload {
            MediaKind::Document
        } else {
            MediaKind::Unknown
        };
    };

    let mime = mime.trim().to_ascii_lowercase();
    if mime == "image/gif" {
        MediaKind::Animation
    } else if mime.starts_with("video/") && media.looped {
        MediaKind::Animation
    } else if mime.starts_with("image/") {
        MediaKind::Photo
    } else if mime.starts_with("video/") {
        MediaKind::Video
    } else if mime.starts_with("audio/") {
        MediaKind::Audio
    } else {
        MediaKind::Document
    }
}

fn media_meta(media: &RawMedia) -> Option<MediaMeta> {
    let meta = MediaMeta {
        file_name: media.file_name.clone(),
        size: media.size,
        mime: media.mime_type.clone(),
        width: media.width,
        height: media.height,
        duration_sec: media.duration,
        caption: media.caption.clone().filter(|c| !c.trim().is_empty()),
    };
    (!meta.is_empty()).then_some(meta)
}

fn forward_origin(forward: &RawForward) -> ForwardOrigin {
    ForwardOrigin {
        sender: forward.sender.clone(),
        channel: forward.channel.clone(),
        original_date: forward.date.and_then(to_datetime),
        original_id: forward.message_id,
    }
}

fn to_datetime(ts: UnixSeconds) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.0, 0)
}
