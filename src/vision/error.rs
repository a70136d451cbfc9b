use std::time::Duration;
use thiserror::Error;

use super::config::ConfigError;
use crate::backend::BackendError;

/// A specialized `Result` type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// The error type for all vision operations.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Invalid screen_id {requested}. Available screens: {available}")]
    ScreenSelection { requested: usize, available: usize },

    #[error("Timed out after {timeout:?} waiting for: {}", .targets.join(", "))]
    MatchTimeout {
        timeout: Duration,
        targets: Vec<String>,
    },

    #[error("'{operation}' needs at least one image")]
    NoTargets { operation: &'static str },

    #[error(transparent)]
    Backend(BackendError),
}

impl VisionError {
    /// Check if a mandatory condition was not met before the deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, VisionError::MatchTimeout { .. })
    }

    /// Targets still unsatisfied when the deadline passed
    pub fn missing_targets(&self) -> &[String] {
        match self {
            VisionError::MatchTimeout { targets, .. } => targets,
            _ => &[],
        }
    }
}

impl From<BackendError> for VisionError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::WaitTimeout { targets, timeout } => {
                VisionError::MatchTimeout { timeout, targets }
            }
            other => VisionError::Backend(other),
        }
    }
}
