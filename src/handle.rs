//! Channel identifier parsing.
//!
//! Users refer to a channel in many ways: `@handle`, `https://t.me/handle`,
//! `http://t.me/handle/42?single`, `t.me/handle` or just `handle`. [`parse`]
//! reduces all of them to a validated [`ChannelHandle`].
//!
//! # Example
//!
//! ```rust
//! use chanpack::handle::{self, ChannelHandle};
//!
//! let a = handle::parse("@rust_news")?;
//! let b = handle::parse("https://t.me/rust_news/1024?single")?;
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "rust_news");
//! # Ok::<(), chanpack::handle::HandleError>(())
//! ```
//!
//! Validation is applied in a fixed order and the first failing rule decides
//! the error: empty, length, character class, double underscore, reserved word.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum handle length in characters.
pub const MIN_LEN: usize = 5;

/// Maximum handle length in characters.
pub const MAX_LEN: usize = 32;

/// Names the platform keeps for itself. Compared case-insensitively.
const RESERVED: &[&str] = &[
    "admin",
    "administrator",
    "support",
    "telegram",
    "settings",
    "contacts",
    "channels",
    "joinchat",
    "addstickers",
    "addemoji",
    "addtheme",
    "share",
    "proxy",
    "socks",
    "login",
    "confirmphone",
    "setlanguage",
];

static HANDLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_]*[A-Za-z0-9]$").expect("handle pattern is valid")
});

/// Why an input could not be turned into a [`ChannelHandle`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("channel name is empty")]
    Empty,

    #[error("'{handle}' is too short ({len} characters, minimum is 5)")]
    TooShort { handle: String, len: usize },

    #[error("'{handle}' is too long ({len} characters, maximum is 32)")]
    TooLong { handle: String, len: usize },

    #[error(
        "'{0}' may only contain letters, digits and underscores, and must start and end with a letter or digit"
    )]
    InvalidCharacters(String),

    #[error("'{0}' contains a double underscore")]
    DoubleUnderscore(String),

    #[error("'{0}' is a reserved name")]
    Reserved(String),
}

/// A validated channel username.
///
/// Handles are case-insensitive on the platform, so the canonical form is
/// lowercase. Construct one with [`parse`] or [`str::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelHandle(String);

impl ChannelHandle {
    /// Returns the canonical handle without the leading `@`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the public link for this handle.
    pub fn url(&self) -> String {
        format!("https://t.me/{}", self.0)
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl FromStr for ChannelHandle {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl TryFrom<String> for ChannelHandle {
    type Error = HandleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse(&value)
    }
}

impl From<ChannelHandle> for String {
    fn from(handle: ChannelHandle) -> Self {
        handle.0
    }
}

/// Parses free-form user input into a [`ChannelHandle`].
///
/// Accepted shapes:
/// - `@handle`
/// - `https://host/handle` and `http://host/handle`
/// - `host/handle` (bare short-domain form)
/// - `handle`
///
/// Trailing path segments, query strings and fragments are ignored. The
/// web-preview form `host/s/handle` is also understood.
pub fn parse(input: &str) -> Result<ChannelHandle, HandleError> {
    let candidate = extract_candidate(input.trim());
    validate(candidate)
}

/// Pulls the handle-shaped part out of `input` without validating it.
fn extract_candidate(input: &str) -> &str {
    let input = input.strip_prefix('@').unwrap_or(input);
    let input = input.split(['?', '#']).next().unwrap_or_default();

    let (rest, had_scheme) = strip_scheme(input);
    if !had_scheme && !rest.contains('/') {
        return rest;
    }

    let mut segments = rest.split('/').filter(|segment| !segment.is_empty());
    let _host = segments.next();
    let first = match segments.next() {
        Some("s") => segments.next().unwrap_or_default(),
        Some(segment) => segment,
        None => "",
    };
    first.strip_prefix('@').unwrap_or(first)
}

fn strip_scheme(input: &str) -> (&str, bool) {
    for scheme in ["https://", "http://"] {
        if input
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        {
            return (&input[scheme.len()..], true);
        }
    }
    (input, false)
}

fn validate(candidate: &str) -> Result<ChannelHandle, HandleError> {
    if candidate.is_empty() {
        return Err(HandleError::Empty);
    }

    let len = candidate.chars().count();
    if len < MIN_LEN {
        return Err(HandleError::TooShort {
            handle: candidate.to_string(),
            len,
        });
    }
    if len > MAX_LEN {
        return Err(HandleError::TooLong {
            handle: candidate.to_string(),
            len,
        });
    }

    if !HANDLE_RE.is_match(candidate) {
        return Err(HandleError::InvalidCharacters(candidate.to_string()));
    }

    if candidate.contains("__") {
        return Err(HandleError::DoubleUnderscore(candidate.to_string()));
    }

    let canonical = candidate.to_ascii_lowercase();
    if RESERVED.contains(&canonical.as_str()) {
        return Err(HandleError::Reserved(candidate.to_string()));
    }

    Ok(ChannelHandle(canonical))
}
