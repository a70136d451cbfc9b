//! Startup and shutdown around a match backend

use std::time::Duration;

use super::config::MatchConfig;
use super::error::{VisionError, VisionResult};
use super::operations::VisionOperations;
use crate::backend::MatchBackend;

/// Capture label of the whole-screen snapshot taken at startup
pub const SCREEN_SNAPSHOT_LABEL: &str = "screen_snapshot.png";

/// Pixels trimmed from each side of the startup screen flash
const SCREEN_FLASH_MARGIN: u32 = 3;
const SCREEN_FLASH_DURATION: Duration = Duration::from_secs(1);

/// A backend prepared for use: default similarity installed and the
/// configured screen selected.
pub struct VisionSession<B: MatchBackend> {
    operations: VisionOperations<B>,
}

impl<B: MatchBackend> VisionSession<B> {
    pub async fn start(backend: B, config: MatchConfig) -> VisionResult<Self> {
        config.validate()?;

        backend.set_min_similarity(config.similarity).await?;
        select_screen(&backend, &config).await?;

        log::info!(
            "🚀 Vision session ready (screen {}, similarity {}, timeout {}s)",
            config.screen_id,
            config.similarity,
            config.timeout
        );
        Ok(Self {
            operations: VisionOperations::new(backend, config),
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.operations = self.operations.with_poll_interval(interval);
        self
    }

    pub fn operations(&self) -> &VisionOperations<B> {
        &self.operations
    }

    /// Shut the backend down. Failures are logged, not raised.
    pub async fn close(self) -> B {
        let backend = self.operations.into_backend();
        match backend.shutdown().await {
            Ok(()) => log::info!("👋 Vision session closed"),
            Err(e) => log::warn!("⚠️ Backend shutdown failed: {}", e),
        }
        backend
    }
}

async fn select_screen<B: MatchBackend>(backend: &B, config: &MatchConfig) -> VisionResult<()> {
    let available = backend.get_number_of_screens().await?;
    if config.screen_id >= available {
        return Err(VisionError::ScreenSelection {
            requested: config.screen_id,
            available,
        });
    }
    backend.change_screen(config.screen_id).await?;

    if config.highlight {
        let snapshot = backend.capture_roi(SCREEN_SNAPSHOT_LABEL).await?;
        let bounds = backend.get_image_coordinates(&snapshot).await?;
        backend
            .highlight_region(bounds.inset(SCREEN_FLASH_MARGIN), SCREEN_FLASH_DURATION)
            .await?;
    }
    Ok(())
}
