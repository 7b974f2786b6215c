//! Download progress reporting.
//!
//! The download engine recomputes a [`DownloadProgress`] snapshot after every
//! accepted page and hands it to a [`ProgressCallback`]. Snapshots are plain
//! values; an observer on another thread can keep them without any locking.
//!
//! # Example
//!
//! ```rust
//! use chanpack::progress::{DownloadProgress, ProgressCallback};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let callback: ProgressCallback = Arc::new(|progress| {
//!     if let Some(pct) = progress.percentage() {
//!         println!("Downloaded: {:.1}%", pct);
//!     }
//! });
//!
//! callback(DownloadProgress::compute(250, 100, Duration::from_secs(2)));
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Snapshot of a running download.
///
/// `total_estimate` is a best-effort count taken once at start. When it is
/// wrong, [`percentage`](Self::percentage) can exceed 100 and
/// `eta_remaining_secs` can go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Approximate total message count (0 if unknown).
    pub total_estimate: u64,

    /// Raw records received so far, including skipped ones.
    pub downloaded: u64,

    /// Records dropped because they failed normalization.
    pub skipped: u64,

    /// Normalized records handed to the caller. Service events and skipped
    /// records are not counted.
    pub delivered: u64,

    /// Pages accepted so far.
    pub pages: u64,

    /// Rate-limit answers received so far.
    pub rate_limit_waits: u64,

    /// Wall time since the download started.
    pub elapsed: Duration,

    /// `downloaded / elapsed` in records per second.
    pub rate_per_second: f64,

    /// Seconds remaining, once at least one record has been downloaded.
    pub eta_remaining_secs: Option<f64>,
}

impl DownloadProgress {
    /// Computes rate and ETA from the raw counters.
    ///
    /// ```rust
    /// use chanpack::progress::DownloadProgress;
    /// use std::time::Duration;
    ///
    /// let p = DownloadProgress::compute(300, 100, Duration::from_secs(10));
    /// assert_eq!(p.rate_per_second, 10.0);
    /// assert_eq!(p.eta_remaining_secs, Some(20.0));
    ///
    /// let p = DownloadProgress::compute(300, 0, Duration::from_secs(10));
    /// assert_eq!(p.eta_remaining_secs, None);
    /// ```
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(total_estimate: u64, downloaded: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let rate_per_second = if secs > 0.0 {
            downloaded as f64 / secs
        } else {
            0.0
        };
        let eta_remaining_secs = (downloaded > 0)
            .then(|| (total_estimate as f64 - downloaded as f64) * secs / downloaded as f64);

        Self {
            total_estimate,
            downloaded,
            elapsed,
            rate_per_second,
            eta_remaining_secs,
            ..Self::default()
        }
    }

    /// Returns `downloaded / total_estimate` as a percentage.
    ///
    /// Returns `None` when the total is unknown. The value is not capped.
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> Option<f64> {
        (self.total_estimate > 0)
            .then(|| self.downloaded as f64 / self.total_estimate as f64 * 100.0)
    }

    /// Returns the ETA as a [`Duration`], clamped at zero.
    pub fn eta(&self) -> Option<Duration> {
        self.eta_remaining_secs
            .filter(|secs| secs.is_finite())
            .map(|secs| Duration::from_secs_f64(secs.max(0.0)))
    }
}

/// Callback receiving a snapshot after every accepted page.
pub type ProgressCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Creates a no-op progress callback.
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Creates a progress callback that prints one line per page to stderr.
///
/// ```rust
/// use chanpack::progress::{stderr_progress, DownloadProgress};
///
/// let callback = stderr_progress();
/// callback(DownloadProgress::default());
/// ```
pub fn stderr_progress() -> ProgressCallback {
    Arc::new(|progress| {
        let eta = progress
            .eta()
            .map(|eta| format!(", ETA {}s", eta.as_secs()))
            .unwrap_or_default();
        match progress.percentage() {
            Some(pct) => eprintln!(
                "   Downloaded {} / ~{} ({:.1}%, {:.0} msg/s{})",
                progress.downloaded, progress.total_estimate, pct, progress.rate_per_second, eta
            ),
            None => eprintln!(
                "   Downloaded {} ({:.0} msg/s)",
                progress.downloaded, progress.rate_per_second
            ),
        }
    })
}
