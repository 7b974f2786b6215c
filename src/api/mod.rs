//! Remote channel API seam.
//!
//! The archive pipeline only ever talks to the platform through the
//! [`ChannelApi`] trait: one call to resolve a handle and one call to fetch a
//! page of history. Authentication is the implementor's business; by the time
//! a `ChannelApi` reaches this crate it is expected to be ready to use.
//!
//! Page elements are decoded one at a time into the [`RawRecord`] sum type, so
//! a single broken element never poisons the rest of its page.
//!
//! With the `http` feature, [`HttpChannelApi`] implements the trait against a
//! JSON gateway.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpChannelApi;

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::channel::{ChannelDescriptor, ChannelRef};
use crate::handle::ChannelHandle;

/// Platform API used by the resolver and the download engine.
///
/// Implementations must be cheap to share; the engine holds one behind an
/// [`Arc`](std::sync::Arc).
#[async_trait]
pub trait ChannelApi: Send + Sync {
    /// Looks up the channel registered under `handle`.
    async fn resolve(&self, handle: &ChannelHandle) -> Result<ResolveOutcome, ApiError>;

    /// Fetches up to `limit` messages strictly older than `offset_id`.
    ///
    /// An `offset_id` of `0` means "start from the newest message". Pages are
    /// returned newest-first.
    async fn fetch_page(
        &self,
        channel: &ChannelRef,
        offset_id: i64,
        limit: u32,
    ) -> Result<FetchOutcome, ApiError>;
}

/// Result of [`ChannelApi::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Found(ChannelDescriptor),
    NotFound,
    Private,
}

/// Result of [`ChannelApi::fetch_page`].
///
/// Rate limiting is an expected answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Page(PageResponse),
    RateLimited { retry_after: Duration },
}

/// One page of raw history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResponse {
    /// Raw records, newest first.
    pub records: Vec<RawRecord>,
    /// Total message count, if the server volunteered one.
    pub count_hint: Option<u64>,
}

impl PageResponse {
    /// Creates a page without a count hint.
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            count_hint: None,
        }
    }

    /// Decodes a page from raw JSON elements.
    pub fn from_values(values: Vec<Value>, count_hint: Option<u64>) -> Self {
        Self {
            records: values.into_iter().map(RawRecord::from_value).collect(),
            count_hint,
        }
    }

    /// Builder method to attach a count hint.
    #[must_use]
    pub fn with_count_hint(mut self, count: u64) -> Self {
        self.count_hint = Some(count);
        self
    }
}

/// Transport and API failures other than rate limiting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with an unexpected status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("undecodable response: {0}")]
    Decode(String),
}

// ============================================================================
// Raw wire records
// ============================================================================

/// A raw history element, classified at the ingestion boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// A user-facing message.
    UserMessage(RawMessage),
    /// A service/system event (pins, title changes, ...).
    ServiceEvent(RawServiceEvent),
    /// An element type this crate does not know.
    Unknown { id: Option<i64>, kind: String },
    /// An element that claims a known type but failed to decode.
    Malformed { id: Option<i64>, reason: String },
}

impl RawRecord {
    /// Classifies and decodes one JSON element.
    ///
    /// Never fails: undecodable input becomes [`RawRecord::Malformed`].
    pub fn from_value(value: Value) -> Self {
        let id = value.get("id").and_then(Value::as_i64);
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return RawRecord::Malformed {
                id,
                reason: "missing record type".to_string(),
            };
        };

        match kind {
            "message" => match serde_json::from_value::<RawMessage>(value) {
                Ok(msg) => RawRecord::UserMessage(msg),
                Err(e) => RawRecord::Malformed {
                    id,
                    reason: e.to_string(),
                },
            },
            "service" => match serde_json::from_value::<RawServiceEvent>(value) {
                Ok(event) => RawRecord::ServiceEvent(event),
                Err(e) => RawRecord::Malformed {
                    id,
                    reason: e.to_string(),
                },
            },
            other => RawRecord::Unknown {
                id,
                kind: other.to_string(),
            },
        }
    }

    /// Returns the record's message id, if one could be read.
    ///
    /// Every variant contributes to the pagination cursor, including those
    /// that never reach the output.
    pub fn id(&self) -> Option<i64> {
        match self {
            RawRecord::UserMessage(msg) => Some(msg.id),
            RawRecord::ServiceEvent(event) => Some(event.id),
            RawRecord::Unknown { id, .. } | RawRecord::Malformed { id, .. } => *id,
        }
    }
}

/// Raw user message as sent by the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawMessage {
    pub id: i64,
    /// Send time as Unix seconds (number or numeric string).
    pub date: UnixSeconds,
    pub from_id: Option<i64>,
    /// Sender display name
    pub from: Option<String>,
    /// Body text: a string, or an array of strings and `{type, text, href?}` fragments
    pub text: Option<Value>,
    pub media: Option<RawMedia>,
    pub reply_to_message_id: Option<i64>,
    pub forwarded_from: Option<RawForward>,
    pub views: Option<u64>,
    pub edit_date: Option<UnixSeconds>,
}

/// Raw media attachment descriptor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawMedia {
    /// Attribute-level kind (`photo`, `sticker`, `voice`, `poll`, ...)
    pub kind: Option<String>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub size: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Duration in seconds
    pub duration: Option<u32>,
    /// Video flagged to loop (GIF-style)
    #[serde(default)]
    pub looped: bool,
    pub caption: Option<String>,
}

/// Raw forward header.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawForward {
    pub sender: Option<String>,
    pub channel: Option<String>,
    pub date: Option<UnixSeconds>,
    pub message_id: Option<i64>,
}

/// Raw service event. Only the id matters downstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawServiceEvent {
    pub id: i64,
    pub date: Option<UnixSeconds>,
    pub action: Option<String>,
}

/// Unix timestamp in seconds, accepted as a JSON number or numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnixSeconds(pub i64);

impl<'de> Deserialize<'de> for UnixSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(UnixSeconds(n)),
            Repr::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(UnixSeconds)
                .map_err(|_| serde::de::Error::custom(format!("invalid unix timestamp '{s}'"))),
        }
    }
}

static FLOOD_WAIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FLOOD_WAIT_(\d+)").expect("flood wait pattern is valid"));

/// Extracts the wait from a `FLOOD_WAIT_<seconds>` error token.
///
/// ```rust
/// use chanpack::api::parse_flood_wait;
/// use std::time::Duration;
///
/// assert_eq!(parse_flood_wait("420: FLOOD_WAIT_17"), Some(Duration::from_secs(17)));
/// assert_eq!(parse_flood_wait("CHANNEL_PRIVATE"), None);
/// ```
pub fn parse_flood_wait(text: &str) -> Option<Duration> {
    FLOOD_WAIT_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(Duration::from_secs)
}
