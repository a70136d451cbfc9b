//! Scoped overrides of the backend's match state
//!
//! Every override pushes its restoration onto a teardown stack while it is
//! applied. [`OverrideScope::exit`] pops the stack, so restorations always
//! run in reverse order of application, whether the wrapped operation
//! succeeded or not. A setup step that fails aborts the remaining setup and
//! unwinds whatever was already applied.

use std::time::Duration;
use tokio::time::sleep;

use super::config::{MatchConfig, validate_seconds};
use super::error::{VisionError, VisionResult};
use super::region::RegionOfInterest;
use crate::backend::MatchBackend;

/// Capture label used to highlight an explicit ROI rectangle
pub const ROI_SNAPSHOT_LABEL: &str = "roi_snapshot.png";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Teardown {
    RestoreSimilarity(f64),
    ResetRoi,
    ClearHighlights(Duration),
}

impl Teardown {
    fn describe(&self) -> String {
        match self {
            Teardown::RestoreSimilarity(previous) => format!("restore similarity {previous}"),
            Teardown::ResetRoi => "reset ROI".to_string(),
            Teardown::ClearHighlights(_) => "clear highlights".to_string(),
        }
    }
}

/// Opens override scopes against one backend and one set of defaults.
pub struct OverrideManager<'a, B: MatchBackend> {
    backend: &'a B,
    config: &'a MatchConfig,
}

impl<'a, B: MatchBackend> OverrideManager<'a, B> {
    pub fn new(backend: &'a B, config: &'a MatchConfig) -> Self {
        Self { backend, config }
    }

    /// Scope with nothing applied yet
    pub fn scope(&self) -> OverrideScope<'a, B> {
        OverrideScope {
            backend: self.backend,
            config: self.config,
            teardown: Vec::new(),
        }
    }

    /// Temporarily run with `value` as minimum similarity
    pub async fn with_similarity(&self, value: f64) -> VisionResult<OverrideScope<'a, B>> {
        let mut scope = self.scope();
        let setup = scope.apply_similarity(value).await;
        settle(scope, setup).await
    }

    /// Temporarily restrict matching to `roi`
    pub async fn with_roi(
        &self,
        roi: Option<&RegionOfInterest>,
        timeout: Duration,
    ) -> VisionResult<OverrideScope<'a, B>> {
        let mut scope = self.scope();
        let setup = scope.apply_roi(roi, timeout).await;
        settle(scope, setup).await
    }

    /// Scope that clears highlight overlays when it exits
    pub fn with_highlights(&self) -> OverrideScope<'a, B> {
        let mut scope = self.scope();
        scope.enable_highlights();
        scope
    }

    /// Similarity, then ROI, then highlights. Exit unwinds in reverse.
    pub async fn standard_scope(
        &self,
        similarity: f64,
        roi: Option<&RegionOfInterest>,
        timeout: Duration,
    ) -> VisionResult<OverrideScope<'a, B>> {
        let mut scope = self.scope();
        let setup = match scope.apply_similarity(similarity).await {
            Ok(()) => scope.apply_roi(roi, timeout).await,
            Err(e) => Err(e),
        };
        let mut scope = settle(scope, setup).await?;
        scope.enable_highlights();
        Ok(scope)
    }
}

/// Unwind a partially built scope if its setup failed
async fn settle<'a, B: MatchBackend>(
    scope: OverrideScope<'a, B>,
    setup: VisionResult<()>,
) -> VisionResult<OverrideScope<'a, B>> {
    match setup {
        Ok(()) => Ok(scope),
        Err(e) => {
            log::debug!("Override setup failed, unwinding {} steps: {}", scope.depth(), e);
            scope.exit().await;
            Err(e)
        }
    }
}

/// Overrides currently applied to the backend, with their restorations.
///
/// Call [`OverrideScope::exit`] when the operation is done; restoration
/// needs the backend and cannot run from `Drop`.
pub struct OverrideScope<'a, B: MatchBackend> {
    backend: &'a B,
    config: &'a MatchConfig,
    teardown: Vec<Teardown>,
}

impl<'a, B: MatchBackend> OverrideScope<'a, B> {
    /// Number of restorations still owed
    pub fn depth(&self) -> usize {
        self.teardown.len()
    }

    /// Install `value` unless it already is the configured default.
    pub async fn apply_similarity(&mut self, value: f64) -> VisionResult<()> {
        if value == self.config.similarity {
            return Ok(());
        }
        let previous = self.backend.set_min_similarity(value).await?;
        log::debug!("Similarity override {} (was {})", value, previous);
        self.teardown.push(Teardown::RestoreSimilarity(previous));
        Ok(())
    }

    /// Install `roi`. An anchor image is waited for (up to `timeout`) and
    /// its bounds become the ROI.
    pub async fn apply_roi(
        &mut self,
        roi: Option<&RegionOfInterest>,
        timeout: Duration,
    ) -> VisionResult<()> {
        let Some(roi) = roi else {
            return Ok(());
        };

        match roi {
            RegionOfInterest::Image(anchor) => {
                self.backend.wait_until_contains(anchor, timeout).await?;
                let bounds = self.backend.get_image_coordinates(anchor).await?;
                self.backend.set_roi(bounds).await?;
                self.teardown.push(Teardown::ResetRoi);
                log::debug!("ROI anchored on '{}' at {}", anchor, bounds);

                if self.config.highlight {
                    self.backend.highlight(anchor).await?;
                }
            }
            RegionOfInterest::Area(region) => {
                self.backend.set_roi(*region).await?;
                self.teardown.push(Teardown::ResetRoi);
                log::debug!("ROI set to {}", region);

                if self.config.highlight {
                    let snapshot = self.backend.capture_roi(ROI_SNAPSHOT_LABEL).await?;
                    self.backend.highlight(&snapshot).await?;
                }
            }
        }
        Ok(())
    }

    /// Clear all highlights on exit, after they were on screen for
    /// `highlight_time`. Nothing happens when highlighting is disabled.
    pub fn enable_highlights(&mut self) {
        if self.config.highlight {
            let display = match validate_seconds("highlight_time", self.config.highlight_time) {
                Ok(display) => display,
                Err(e) => {
                    log::warn!("⚠️ {}, clearing highlights without delay", e);
                    Duration::ZERO
                }
            };
            self.teardown.push(Teardown::ClearHighlights(display));
        }
    }

    /// Add an overlay around `image` without clearing earlier ones
    pub async fn add_highlight(&self, image: &str) -> VisionResult<()> {
        if self.config.highlight {
            self.backend.highlight(image).await?;
        }
        Ok(())
    }

    /// Highlight a target the moment it matched. A failed overlay is logged
    /// and never changes the operation's result.
    pub async fn highlight_matched(&self, image: &str) {
        if let Err(e) = self.add_highlight(image).await {
            log::warn!("⚠️ Could not highlight {}: {}", image, e);
        }
    }

    /// Undo every applied override, most recent first. Failures are logged
    /// and do not stop the remaining restorations.
    pub async fn exit(mut self) {
        while let Some(step) = self.teardown.pop() {
            if let Err(e) = self.unwind(step).await {
                log::warn!("⚠️ Failed to {}: {}", step.describe(), e);
            }
        }
    }

    async fn unwind(&self, step: Teardown) -> Result<(), VisionError> {
        match step {
            Teardown::RestoreSimilarity(previous) => {
                self.backend.set_min_similarity(previous).await?;
            }
            Teardown::ResetRoi => self.backend.reset_roi().await?,
            Teardown::ClearHighlights(display) => {
                sleep(display).await;
                self.backend.clear_all_highlights().await?;
            }
        }
        Ok(())
    }
}

impl<B: MatchBackend> Drop for OverrideScope<'_, B> {
    fn drop(&mut self) {
        if !self.teardown.is_empty() {
            log::warn!(
                "⚠️ Override scope dropped with {} restorations pending",
                self.teardown.len()
            );
        }
    }
}
