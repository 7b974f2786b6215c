//! # Chanpack
//!
//! A Rust library for archiving the public message history of a broadcast
//! channel into a single, deterministic document.
//!
//! ## Overview
//!
//! An archive run is a straight pipeline:
//!
//! 1. **Parse** a user-supplied identifier (`@name`, `t.me/name`, full link)
//!    into a canonical [`ChannelHandle`].
//! 2. **Resolve** the handle into a [`ChannelDescriptor`] through a
//!    [`ChannelApi`](api::ChannelApi).
//! 3. **Download** the history page by page, newest to oldest, backing off
//!    when the API rate-limits.
//! 4. **Normalize** each raw message into a [`MessageRecord`]: media kind,
//!    links, mentions, hashtags, reply and forward linkage.
//! 5. **Export** the records oldest-first as text, JSON, JSONL or CSV.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chanpack::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<()> {
//! let api = HttpChannelApi::new(&ApiConfig::new("https://gateway.example.com/v1"))?;
//! let mut archiver = ChannelArchiver::new(Arc::new(api))
//!     .with_export_config(ExportConfig::new().with_format(ExportFormat::Jsonl));
//!
//! let (summary, path) = archiver
//!     .archive_to_path("@rustlang", None, CancellationToken::new())
//!     .await?;
//! println!("{} messages -> {}", summary.records, path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving the engine directly
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chanpack::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(api: Arc<dyn ChannelApi>) -> Result<()> {
//! let handle = chanpack::handle::parse("https://t.me/s/rustlang")?;
//! let descriptor = resolve_channel(&*api, &handle).await?;
//!
//! let mut downloader = Downloader::new(
//!     api,
//!     &descriptor,
//!     &DownloadConfig::default(),
//!     CancellationToken::new(),
//! )?;
//! while let Some(batch) = downloader.next_batch().await? {
//!     for record in &batch.records {
//!         println!("#{} {}", record.id, record.raw_text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - [`handle`] — Channel identifier parser ([`ChannelHandle`], [`HandleError`](handle::HandleError))
//! - [`api`] — Remote API seam ([`ChannelApi`](api::ChannelApi), [`RawRecord`](api::RawRecord)) and the HTTP client
//! - [`channel`] — [`ChannelDescriptor`] and [`resolve_channel`](channel::resolve_channel)
//! - [`download`] — Paginated download engine ([`Downloader`](download::Downloader), [`Cursor`](download::Cursor))
//! - [`normalize`] — Raw message normalization
//! - [`record`] — [`MessageRecord`], [`MediaKind`]
//! - [`progress`] — [`DownloadProgress`](progress::DownloadProgress) snapshots and callbacks
//! - [`export`] — Document serializer ([`ExportFormat`])
//! - [`sink`] — Persistence seam ([`RecordSink`](sink::RecordSink))
//! - [`archive`] — End-to-end [`ChannelArchiver`](archive::ChannelArchiver)
//! - [`config`] — Configuration types
//! - [`error`] — Unified error types ([`ChanpackError`], [`Result`])
//! - [`prelude`] — Convenient re-exports

pub mod api;
pub mod archive;
pub mod channel;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod handle;
pub mod normalize;
pub mod progress;
pub mod record;
pub mod sink;

// Re-export the main types at the crate root for convenience
pub use channel::ChannelDescriptor;
pub use error::{ChanpackError, Result};
pub use export::ExportFormat;
pub use handle::ChannelHandle;
pub use record::{MediaKind, MessageRecord};

/// Convenient re-exports for common usage.
///
/// ```rust
/// use chanpack::prelude::*;
/// ```
pub mod prelude {
    // Records
    pub use crate::record::{ForwardOrigin, MediaKind, MediaMeta, MessageRecord};

    // Error types
    pub use crate::error::{ChanpackError, Result};

    // Parsing and resolution
    pub use crate::channel::{ChannelDescriptor, resolve_channel};
    pub use crate::handle::ChannelHandle;

    // Remote API
    #[cfg(feature = "http")]
    pub use crate::api::HttpChannelApi;
    pub use crate::api::{ChannelApi, FetchOutcome, PageResponse, RawRecord, ResolveOutcome};

    // Engine
    pub use crate::download::{Batch, Downloader};
    pub use crate::progress::{DownloadProgress, ProgressCallback};

    // Output
    pub use crate::config::{ApiConfig, DownloadConfig, ExportConfig};
    pub use crate::export::{ExportFormat, serialize, serialize_to_path};

    // Pipeline
    pub use crate::archive::{ArchiveSummary, ChannelArchiver};
    pub use crate::sink::{BatchingSink, JsonlFileSink, RecordSink};
}
