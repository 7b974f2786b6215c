//! Unified error types for chanpack.
//!
//! This module provides a single [`ChanpackError`] enum that covers every way
//! an archive run can fail. The variants follow the lifecycle of a run:
//!
//! - **Input errors** ([`InvalidHandle`](ChanpackError::InvalidHandle),
//!   [`InvalidConfig`](ChanpackError::InvalidConfig)) are reported immediately
//!   and must be fixed by the caller.
//! - **Resolution errors** ([`Resolution`](ChanpackError::Resolution)) end the
//!   run with a specific reason.
//! - **Transport errors** ([`Api`](ChanpackError::Api)) are propagated as-is.
//!   Rate limiting is not an error; the download engine absorbs it.
//! - **Sink errors** ([`Sink`](ChanpackError::Sink)) are retryable by the caller.

use std::io;

use thiserror::Error;

use crate::api::ApiError;
use crate::handle::HandleError;

/// A specialized [`Result`] type for chanpack operations.
///
/// # Example
///
/// ```rust
/// use chanpack::error::Result;
/// use chanpack::MessageRecord;
///
/// fn my_function() -> Result<Vec<MessageRecord>> {
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, ChanpackError>;

/// The error type for all chanpack operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChanpackError {
    /// The channel identifier supplied by the user is not a valid handle.
    #[error("Invalid channel: {0}")]
    InvalidHandle(#[from] HandleError),

    /// A configuration value is out of range or missing.
    #[error("Invalid {field}: {message}")]
    InvalidConfig {
        /// Name of the offending setting
        field: &'static str,
        /// Description of what's wrong
        message: String,
    },

    /// The channel could not be resolved into a downloadable descriptor.
    #[error("Cannot resolve @{handle}: {reason}")]
    Resolution {
        /// The handle that failed to resolve
        handle: String,
        /// Why resolution failed
        reason: ResolutionFailure,
    },

    /// The remote API failed for a reason other than rate limiting.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The remote API broke a pagination invariant.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The persistence sink rejected a batch.
    #[error("Sink error: {0}")]
    Sink(String),

    /// An I/O error occurred while writing the export.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error.
    #[cfg(feature = "csv-output")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The run was cancelled at a page boundary or during a backoff wait.
    #[error("Download cancelled")]
    Cancelled,
}

/// Reasons a channel handle did not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    /// No channel is registered under the handle
    #[error("channel not found")]
    NotFound,
    /// The channel exists but its history is private
    #[error("channel is private")]
    Private,
    /// The channel resolved but reports its history as inaccessible
    #[error("channel history is not accessible")]
    Inaccessible,
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl ChanpackError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        ChanpackError::InvalidConfig {
            field,
            message: message.into(),
        }
    }

    /// Creates a resolution error for `handle`.
    pub fn resolution(handle: impl Into<String>, reason: ResolutionFailure) -> Self {
        ChanpackError::Resolution {
            handle: handle.into(),
            reason,
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        ChanpackError::Protocol(message.into())
    }

    /// Creates a sink error.
    pub fn sink(message: impl Into<String>) -> Self {
        ChanpackError::Sink(message.into())
    }

    /// Returns `true` if the run failed because of user input.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            ChanpackError::InvalidHandle(_) | ChanpackError::InvalidConfig { .. }
        )
    }

    /// Returns `true` if this is a resolution error.
    pub fn is_resolution(&self) -> bool {
        matches!(self, ChanpackError::Resolution { .. })
    }

    /// Returns `true` if this is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChanpackError::Cancelled)
    }

    /// Returns `true` if the caller may reasonably retry the whole run.
    ///
    /// The library itself never retries these.
    pub fn is_retryable_by_caller(&self) -> bool {
        matches!(self, ChanpackError::Api(_) | ChanpackError::Sink(_))
    }
}
