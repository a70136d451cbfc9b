use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::types::Region;

/// A specialized `Result` type for match backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// The error type for all match backend primitives.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to load image {path:?}: {source}")]
    ImageLoadFailed {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Template crop region {region} exceeds image bounds ({width}x{height})")]
    TemplateCropOutOfBounds {
        region: Region,
        width: u32,
        height: u32,
    },

    #[error("Failed to capture screen '{screen}': {description}")]
    FrameCaptureFailed { screen: String, description: String },

    #[error("Image '{target}' not found on screen")]
    ImageNotFound { target: String },

    #[error("Timed out after {timeout:?} waiting on {}", .targets.join(", "))]
    WaitTimeout {
        targets: Vec<String>,
        timeout: Duration,
    },

    #[error("Screen {id} does not exist (available screens: {available})")]
    ScreenOutOfRange { id: usize, available: usize },

    #[error("Region {region} is empty or lies outside the screen")]
    InvalidRegion { region: Region },

    #[error("Similarity {value} is outside 0.0..=1.0")]
    InvalidSimilarity { value: f64 },

    #[error("Could not prepare capture directory {path:?}: {source}")]
    CaptureDirectoryFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write capture {path:?}: {source}")]
    CaptureWriteFailed {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Backend call '{operation}' failed: {description}")]
    Remote {
        operation: String,
        description: String,
    },
}

impl BackendError {
    /// Check if this error is a backend wait that ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::WaitTimeout { .. })
    }

    /// Shorthand for failures reported by an out-of-process backend.
    pub fn remote(operation: impl Into<String>, description: impl Into<String>) -> Self {
        BackendError::Remote {
            operation: operation.into(),
            description: description.into(),
        }
    }
}
