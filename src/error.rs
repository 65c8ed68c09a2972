//! Central error types for camframe.
//!
//! Geometry never fails; these errors come from frame sources, the effect
//! filters, encoders and the stepped export. All errors implement `Serialize`
//! so the UI layer can receive them as plain strings.

use serde::Serialize;
use thiserror::Error;

/// Main error type for camframe operations.
#[derive(Error, Debug)]
pub enum CamFrameError {
    /// Frame or frame dimensions are not ready yet.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Seeking a stepped source failed.
    #[error("Seek to {timestamp_secs:.3}s failed: {reason}")]
    SeekFailed { timestamp_secs: f64, reason: String },

    /// Native blur/pixelate primitive is not available.
    #[error("Filter unsupported: {0}")]
    FilterUnsupported(String),

    /// External encoder reported a failure.
    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    /// Stepped processing exceeded its duration bound.
    #[error("Timed out after {secs:.1}s")]
    Timeout { secs: f64 },

    /// Zero or mismatched dimensions handed to a raster operation.
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// A screenshot capture is already running.
    #[error("Capture already in progress")]
    CaptureInProgress,

    /// Image encoding/decoding failed
    #[error("Image error: {0}")]
    ImageError(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl CamFrameError {
    /// Whether a local fallback exists for this failure.
    ///
    /// Filter failures fall back to the manual raster path; seek failures and
    /// timeouts fall back to delivering the unmodified source. Encoder
    /// failures have no safe fallback and go to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CamFrameError::SourceUnavailable(_)
                | CamFrameError::SeekFailed { .. }
                | CamFrameError::FilterUnsupported(_)
                | CamFrameError::Timeout { .. }
        )
    }
}

impl Serialize for CamFrameError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<image::ImageError> for CamFrameError {
    fn from(err: image::ImageError) -> Self {
        CamFrameError::ImageError(err.to_string())
    }
}

impl From<String> for CamFrameError {
    fn from(msg: String) -> Self {
        CamFrameError::Other(msg)
    }
}

impl From<&str> for CamFrameError {
    fn from(msg: &str) -> Self {
        CamFrameError::Other(msg.to_string())
    }
}

/// Extension trait for adding context to Results.
///
/// # Example
/// ```ignore
/// use crate::error::{ResultExt, CamFrameResult};
///
/// async fn run(task: tokio::task::JoinHandle<u32>) -> CamFrameResult<u32> {
///     task.await.context("Compose task failed")
/// }
/// ```
pub trait ResultExt<T> {
    /// Add context to an error, converting it to CamFrameError::Other.
    fn context(self, msg: &str) -> CamFrameResult<T>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F: FnOnce() -> String>(self, f: F) -> CamFrameResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context(self, msg: &str) -> CamFrameResult<T> {
        self.map_err(|e| CamFrameError::Other(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> CamFrameResult<T> {
        self.map_err(|e| CamFrameError::Other(format!("{}: {}", f(), e)))
    }
}

/// Extension trait for adding context to Option types.
pub trait OptionExt<T> {
    /// Convert None to CamFrameError::SourceUnavailable with the given message.
    fn context(self, msg: &str) -> CamFrameResult<T>;

    /// Convert None with a lazily evaluated message.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> CamFrameResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn context(self, msg: &str) -> CamFrameResult<T> {
        self.ok_or_else(|| CamFrameError::SourceUnavailable(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> CamFrameResult<T> {
        self.ok_or_else(|| CamFrameError::SourceUnavailable(f()))
    }
}

/// Type alias for Results using CamFrameError.
pub type CamFrameResult<T> = Result<T, CamFrameError>;
