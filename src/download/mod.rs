//! Paginated download engine.
//!
//! A [`Downloader`] walks one channel from the newest message to the oldest,
//! one page at a time, and yields a [`Batch`] of normalized records per page.
//!
//! - Rate-limit answers suspend the loop for the advised wait and retry the
//!   same offset. They never advance the cursor or count as progress.
//! - Transport and API errors end the download.
//! - Records that fail normalization are counted in
//!   [`DownloadProgress::skipped`] and dropped.
//! - Cancellation is checked before every page request and during backoff
//!   waits, never in the middle of a page.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chanpack::api::ChannelApi;
//! use chanpack::channel::ChannelDescriptor;
//! use chanpack::config::DownloadConfig;
//! use chanpack::download::Downloader;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(api: Arc<dyn ChannelApi>, descriptor: ChannelDescriptor) -> chanpack::Result<()> {
//! let mut downloader = Downloader::new(
//!     api,
//!     &descriptor,
//!     &DownloadConfig::default(),
//!     CancellationToken::new(),
//! )?;
//!
//! while let Some(batch) = downloader.next_batch().await? {
//!     println!("{} records, {} so far", batch.records.len(), batch.progress.downloaded);
//! }
//! # Ok(())
//! # }
//! ```

mod cursor;

pub use cursor::{Cursor, CursorState, MAX_BACKOFF};

use std::sync::Arc;

use futures::Stream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::{ChannelApi, FetchOutcome, PageResponse};
use crate::channel::{ChannelDescriptor, ChannelRef};
use crate::config::DownloadConfig;
use crate::error::{ChanpackError, Result};
use crate::normalize::normalize;
use crate::progress::{DownloadProgress, ProgressCallback, no_progress};
use crate::record::MessageRecord;

/// Largest page the remote API serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalized records from one page.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Records in page order (newest first). Service events and skipped
    /// records are not included.
    pub records: Vec<MessageRecord>,
    /// Progress after this page.
    pub progress: DownloadProgress,
    /// Cursor offset after this page.
    pub offset_id: i64,
    /// `true` if no further page will be requested.
    pub is_last: bool,
}

/// Download loop for a single channel.
pub struct Downloader<A: ChannelApi + ?Sized> {
    api: Arc<A>,
    channel: ChannelRef,
    cursor: Cursor,
    cancel: CancellationToken,
    skip_invalid: bool,
    total_estimate: u64,
    downloaded: u64,
    skipped: u64,
    delivered: u64,
    pages: u64,
    rate_limit_waits: u64,
    started: Instant,
    on_progress: ProgressCallback,
}

impl<A: ChannelApi + ?Sized> Downloader<A> {
    /// Creates a downloader positioned at the newest message of `descriptor`.
    ///
    /// A page size of 0 is rejected. Sizes above [`MAX_PAGE_SIZE`] are
    /// clamped.
    pub fn new(
        api: Arc<A>,
        descriptor: &ChannelDescriptor,
        config: &DownloadConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let page_size = match config.page_size {
            0 => {
                return Err(ChanpackError::invalid_config(
                    "page_size",
                    "must be at least 1",
                ));
            }
            size if size > MAX_PAGE_SIZE => {
                tracing::warn!(
                    requested = size,
                    page_size = MAX_PAGE_SIZE,
                    "Page size clamped"
                );
                MAX_PAGE_SIZE
            }
            size => size,
        };

        Ok(Self {
            api,
            channel: descriptor.channel_ref(),
            cursor: Cursor::new(page_size),
            cancel,
            skip_invalid: config.skip_invalid,
            total_estimate: descriptor.approx_message_count,
            downloaded: 0,
            skipped: 0,
            delivered: 0,
            pages: 0,
            rate_limit_waits: 0,
            started: Instant::now(),
            on_progress: no_progress(),
        })
    }

    /// Sets a callback invoked after every accepted page.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = callback;
        self
    }

    pub fn offset_id(&self) -> i64 {
        self.cursor.offset_id()
    }

    pub fn page_size(&self) -> u32 {
        self.cursor.page_size()
    }

    pub fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> DownloadProgress {
        DownloadProgress {
            skipped: self.skipped,
            delivered: self.delivered,
            pages: self.pages,
            rate_limit_waits: self.rate_limit_waits,
            ..DownloadProgress::compute(self.total_estimate, self.downloaded, self.started.elapsed())
        }
    }

    /// Fetches and normalizes the next page.
    ///
    /// Returns `Ok(None)` once the channel is exhausted. Rate-limit waits
    /// happen inside this call.
    pub async fn next_batch(&mut self) -> Result<Option<Batch>> {
        loop {
            match self.cursor.state() {
                CursorState::Done => return Ok(None),
                CursorState::Backoff { until } => {
                    let cancel = self.cancel.clone();
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(self.cancelled()),
                        () = tokio::time::sleep_until(until) => self.cursor.on_backoff_elapsed(),
                    }
                }
                CursorState::Fetching => {
                    if self.cancel.is_cancelled() {
                        return Err(self.cancelled());
                    }

                    let offset_id = self.cursor.offset_id();
                    let page_size = self.cursor.page_size();
                    tracing::debug!(offset_id, page_size, "Requesting page");

                    match self.api.fetch_page(&self.channel, offset_id, page_size).await? {
                        FetchOutcome::RateLimited { retry_after } => {
                            self.rate_limit_waits += 1;
                            tracing::warn!(
                                offset_id,
                                retry_after_secs = retry_after.as_secs_f64(),
                                "Rate limited, backing off"
                            );
                            self.cursor.on_rate_limited(retry_after, Instant::now());
                        }
                        FetchOutcome::Page(page) => return self.accept_page(page).map(Some),
                    }
                }
            }
        }
    }

    /// Drains the remaining pages into one vector.
    pub async fn collect_all(mut self) -> Result<(Vec<MessageRecord>, DownloadProgress)> {
        let mut records = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            records.extend(batch.records);
        }
        Ok((records, self.progress()))
    }

    /// Turns the downloader into a stream of batches.
    ///
    /// The stream ends after the last page or after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Batch>> {
        futures::stream::try_unfold(self, |mut downloader| async move {
            Ok(downloader
                .next_batch()
                .await?
                .map(|batch| (batch, downloader)))
        })
    }

    fn accept_page(&mut self, page: PageResponse) -> Result<Batch> {
        self.cursor.on_page(&page.records)?;

        if self.pages == 0 && self.total_estimate == 0 {
            if let Some(hint) = page.count_hint {
                self.total_estimate = hint;
            }
        }

        let mut records = Vec::with_capacity(page.records.len());
        for raw in &page.records {
            match normalize(raw) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) if self.skip_invalid => {
                    self.skipped += 1;
                    tracing::warn!(id = ?raw.id(), error = %e, "Skipping malformed record");
                }
                Err(e) => {
                    self.cursor.finish();
                    return Err(ChanpackError::protocol(format!(
                        "record {:?} failed normalization: {e}",
                        raw.id()
                    )));
                }
            }
        }

        self.downloaded += page.records.len() as u64;
        self.delivered += records.len() as u64;
        self.pages += 1;

        let progress = self.progress();
        tracing::debug!(
            offset_id = self.cursor.offset_id(),
            received = page.records.len(),
            downloaded = progress.downloaded,
            skipped = progress.skipped,
            "Page received"
        );
        (self.on_progress)(progress);

        let is_last = self.cursor.is_done();
        if is_last {
            tracing::info!(
                downloaded = progress.downloaded,
                skipped = progress.skipped,
                pages = progress.pages,
                rate_limit_waits = progress.rate_limit_waits,
                "Download complete"
            );
        }

        Ok(Batch {
            records,
            progress,
            offset_id: self.cursor.offset_id(),
            is_last,
        })
    }

    fn cancelled(&mut self) -> ChanpackError {
        self.cursor.finish();
        tracing::info!(
            offset_id = self.cursor.offset_id(),
            downloaded = self.downloaded,
            "Download cancelled"
        );
        ChanpackError::Cancelled
    }
}
