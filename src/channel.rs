//! Channel descriptors and handle resolution.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::{ChannelApi, ResolveOutcome};
use crate::error::{ChanpackError, ResolutionFailure, Result};
use crate::handle::ChannelHandle;

/// Opaque credential the API needs alongside a channel id.
///
/// The value never appears in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// The part of a descriptor needed to address the channel in page requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: i64,
    pub access_token: AccessToken,
}

/// A resolved channel.
///
/// Produced by [`resolve_channel`]; read-only for everything downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub id: i64,
    pub handle: ChannelHandle,
    #[serde(skip_serializing, default)]
    pub access_token: AccessToken,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub is_accessible: bool,
    /// Best-effort message count at resolve time.
    pub approx_message_count: u64,
    pub member_count: u64,
}

impl ChannelDescriptor {
    /// Creates an accessible descriptor with no counts.
    pub fn new(id: i64, handle: ChannelHandle, title: impl Into<String>) -> Self {
        Self {
            id,
            handle,
            access_token: AccessToken::default(),
            title: title.into(),
            description: None,
            is_accessible: true,
            approx_message_count: 0,
            member_count: 0,
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = token;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_message_count(mut self, count: u64) -> Self {
        self.approx_message_count = count;
        self
    }

    #[must_use]
    pub fn with_member_count(mut self, count: u64) -> Self {
        self.member_count = count;
        self
    }

    #[must_use]
    pub fn with_accessible(mut self, accessible: bool) -> Self {
        self.is_accessible = accessible;
        self
    }

    /// Returns the page-request address for this channel.
    pub fn channel_ref(&self) -> ChannelRef {
        ChannelRef {
            id: self.id,
            access_token: self.access_token.clone(),
        }
    }
}

/// Resolves `handle` into a downloadable [`ChannelDescriptor`].
///
/// Not-found, private and inaccessible channels are terminal
/// [`ChanpackError::Resolution`] errors and are never retried.
pub async fn resolve_channel<A>(api: &A, handle: &ChannelHandle) -> Result<ChannelDescriptor>
where
    A: ChannelApi + ?Sized,
{
    let failure = match api.resolve(handle).await? {
        ResolveOutcome::Found(descriptor) if descriptor.is_accessible => {
            tracing::info!(
                channel = %handle,
                id = descriptor.id,
                title = %descriptor.title,
                approx_messages = descriptor.approx_message_count,
                "Resolved channel"
            );
            return Ok(descriptor);
        }
        ResolveOutcome::Found(_) => ResolutionFailure::Inaccessible,
        ResolveOutcome::NotFound => ResolutionFailure::NotFound,
        ResolveOutcome::Private => ResolutionFailure::Private,
    };

    tracing::warn!(channel = %handle, reason = %failure, "Channel resolution failed");
    Err(ChanpackError::resolution(handle.as_str(), failure))
}
