//! JSON-over-HTTP implementation of [`ChannelApi`].
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Call | Request | Success body |
//! |------|---------|--------------|
//! | resolve | `GET /channels/{handle}` | channel object |
//! | fetch page | `GET /channels/{id}/messages?offset_id=&limit=&access_hash=` | `{"messages": [...], "count": n?}` |
//!
//! Status mapping: `404` is "not found" and `403` is "private" on resolve.
//! `429` and `420` on a page fetch are rate limits; the wait comes from the
//! `Retry-After` header, then from a `FLOOD_WAIT_<n>` token in the body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use serde_json::Value;

use super::{ApiError, ChannelApi, FetchOutcome, PageResponse, ResolveOutcome, parse_flood_wait};
use crate::channel::{AccessToken, ChannelDescriptor, ChannelRef};
use crate::config::ApiConfig;
use crate::error::{ChanpackError, Result};
use crate::handle::ChannelHandle;

/// Wait applied when a rate-limit response carries no usable hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// [`ChannelApi`] backed by a `reqwest` client.
///
/// # Example
///
/// ```rust,no_run
/// use chanpack::api::HttpChannelApi;
/// use chanpack::config::ApiConfig;
///
/// let api = HttpChannelApi::new(
///     &ApiConfig::new("https://gateway.example.com/v1").with_token("secret"),
/// )?;
/// # Ok::<(), chanpack::ChanpackError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpChannelApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChannel {
    id: i64,
    #[serde(default)]
    access_hash: String,
    title: String,
    about: Option<String>,
    #[serde(default = "default_accessible")]
    accessible: bool,
    #[serde(default)]
    messages_count: u64,
    #[serde(default)]
    participants_count: u64,
}

fn default_accessible() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct WirePage {
    messages: Vec<Value>,
    count: Option<u64>,
}

impl HttpChannelApi {
    /// Builds a client from `config`.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ChanpackError::invalid_config(
                "api_url",
                format!("'{}' is not an http(s) URL", config.base_url),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ChannelApi for HttpChannelApi {
    async fn resolve(&self, handle: &ChannelHandle) -> std::result::Result<ResolveOutcome, ApiError> {
        let response = self
            .get(&format!("/channels/{}", handle.as_str()))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(ResolveOutcome::NotFound),
            StatusCode::FORBIDDEN => Ok(ResolveOutcome::Private),
            status if status.is_success() => {
                let wire: WireChannel = response.json().await.map_err(decode)?;
                Ok(ResolveOutcome::Found(ChannelDescriptor {
                    id: wire.id,
                    handle: handle.clone(),
                    access_token: AccessToken::new(wire.access_hash),
                    title: wire.title,
                    description: wire.about.filter(|about| !about.trim().is_empty()),
                    is_accessible: wire.accessible,
                    approx_message_count: wire.messages_count,
                    member_count: wire.participants_count,
                }))
            }
            status => Err(status_error(status, response).await),
        }
    }

    async fn fetch_page(
        &self,
        channel: &ChannelRef,
        offset_id: i64,
        limit: u32,
    ) -> std::result::Result<FetchOutcome, ApiError> {
        let response = self
            .get(&format!("/channels/{}/messages", channel.id))
            .query(&[
                ("offset_id", offset_id.to_string()),
                ("limit", limit.to_string()),
                ("access_hash", channel.access_token.expose().to_string()),
            ])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 420 {
            let from_header = retry_after_header(response.headers());
            let body = response.text().await.unwrap_or_default();
            let retry_after = from_header
                .or_else(|| parse_flood_wait(&body))
                .unwrap_or(DEFAULT_RETRY_AFTER);
            return Ok(FetchOutcome::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let page: WirePage = response.json().await.map_err(decode)?;
        Ok(FetchOutcome::Page(PageResponse::from_values(
            page.messages,
            page.count,
        )))
    }
}

fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> ApiError {
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        body.trim().to_string()
    };
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

fn decode(err: reqwest::Error) -> ApiError {
    ApiError::Decode(err.to_string())
}
