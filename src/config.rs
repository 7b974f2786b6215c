//! Configuration types for the API client, the download engine and export.
//!
//! Plain builder structs with no CLI framework dependencies. The binary maps
//! its flags onto these.
//!
//! # Example
//!
//! ```rust
//! use chanpack::config::{DownloadConfig, ExportConfig};
//! use chanpack::export::ExportFormat;
//!
//! let download = DownloadConfig::new()
//!     .with_page_size(50)
//!     .with_skip_invalid(false);
//!
//! let export = ExportConfig::new().with_format(ExportFormat::Jsonl);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::download::MAX_PAGE_SIZE;
use crate::export::ExportFormat;

/// Configuration for the paginated download engine.
///
/// # Example
///
/// ```rust
/// use chanpack::config::DownloadConfig;
///
/// let config = DownloadConfig::new().with_page_size(100);
/// assert!(config.skip_invalid);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Messages requested per page (default: 100, at most 100)
    pub page_size: u32,

    /// Drop records that fail normalization instead of aborting (default: true)
    pub skip_invalid: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            skip_invalid: true,
        }
    }
}

impl DownloadConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size. Validated when the downloader is built.
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Sets whether to skip records that fail normalization.
    #[must_use]
    pub fn with_skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }
}

/// Configuration for [`HttpChannelApi`](crate::api::HttpChannelApi).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Gateway base URL, e.g. `https://gateway.example.com/v1`
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Per-request timeout (default: 30s)
    pub timeout: Duration,

    /// `User-Agent` header value
    pub user_agent: String,
}

impl ApiConfig {
    /// Creates a configuration for `base_url` with default timeout and agent.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("chanpack/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Configuration for export and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output document format (default: text)
    pub format: ExportFormat,

    /// Records per batch handed to a persistence sink (default: 500)
    pub persist_batch_size: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Text,
            persist_batch_size: 500,
        }
    }
}

impl ExportConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_persist_batch_size(mut self, size: usize) -> Self {
        self.persist_batch_size = size;
        self
    }
}
