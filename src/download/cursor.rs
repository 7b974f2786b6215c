//! Pagination cursor.
//!
//! The cursor owns `offset_id` and the fetch/backoff/done state. It never
//! performs I/O, so every transition can be tested without a runtime.

use std::time::Duration;

use tokio::time::Instant;

use crate::api::RawRecord;
use crate::error::{ChanpackError, Result};

/// Longest backoff honoured for a single rate-limit answer.
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Where the download loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Ready to request the page older than `offset_id`.
    Fetching,
    /// Rate limited; retry the same offset at `until`.
    Backoff { until: Instant },
    /// No more pages.
    Done,
}

/// Offset cursor walking a channel from newest to oldest.
#[derive(Debug, Clone)]
pub struct Cursor {
    offset_id: i64,
    page_size: u32,
    state: CursorState,
}

impl Cursor {
    /// Creates a cursor positioned at the newest message.
    pub fn new(page_size: u32) -> Self {
        Self {
            offset_id: 0,
            page_size,
            state: CursorState::Fetching,
        }
    }

    /// Current offset. `0` means "start from the newest message".
    pub fn offset_id(&self) -> i64 {
        self.offset_id
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == CursorState::Done
    }

    /// Enters backoff. The offset is left untouched.
    ///
    /// Waits longer than [`MAX_BACKOFF`] are clamped to it.
    pub fn on_rate_limited(&mut self, wait: Duration, now: Instant) {
        if self.state != CursorState::Done {
            let until = now.checked_add(wait.min(MAX_BACKOFF)).unwrap_or(now);
            self.state = CursorState::Backoff { until };
        }
    }

    /// Leaves backoff and re-arms the same offset.
    pub fn on_backoff_elapsed(&mut self) {
        if matches!(self.state, CursorState::Backoff { .. }) {
            self.state = CursorState::Fetching;
        }
    }

    /// Advances past a received page.
    ///
    /// The new offset is the smallest id in the page. An empty page or one
    /// shorter than the page size ends the walk. A full page that carries no
    /// ids, or whose oldest id is not older than the current offset, would
    /// loop forever and is rejected as a protocol error.
    pub fn on_page(&mut self, records: &[RawRecord]) -> Result<()> {
        if records.is_empty() {
            self.state = CursorState::Done;
            return Ok(());
        }

        let is_short = records.len() < self.page_size as usize;
        let Some(min_id) = records.iter().filter_map(RawRecord::id).min() else {
            if is_short {
                self.state = CursorState::Done;
                return Ok(());
            }
            return Err(ChanpackError::protocol(format!(
                "full page of {} records carries no message ids",
                records.len()
            )));
        };

        if self.offset_id != 0 && min_id >= self.offset_id {
            return Err(ChanpackError::protocol(format!(
                "page below offset {} returned id {min_id}",
                self.offset_id
            )));
        }

        self.offset_id = min_id;
        self.state = if is_short {
            CursorState::Done
        } else {
            CursorState::Fetching
        };
        Ok(())
    }

    /// Stops the walk.
    pub fn finish(&mut self) {
        self.state = CursorState::Done;
    }
}
