//! Keyword-level vision operations
//!
//! Each operation resolves its options against the configured defaults,
//! enters the standard override scope (similarity, then ROI, then
//! highlights), runs its polling mode and always unwinds the scope before
//! returning.

use std::time::Duration;

use super::config::{MatchConfig, validate_similarity, validate_timeout};
use super::error::{VisionError, VisionResult};
use super::polling::{PollingEngine, TargetMap, unique_targets};
use super::region::RegionOfInterest;
use super::scope::{OverrideManager, OverrideScope};
use crate::backend::{BackendError, BackendResult, MatchBackend};

/// Optional per-call settings. Anything left out falls back to the
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOptions {
    /// Seconds
    pub timeout: Option<f64>,
    pub similarity: Option<f64>,
    pub roi: Option<RegionOfInterest>,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn similarity(mut self, value: f64) -> Self {
        self.similarity = Some(value);
        self
    }

    pub fn roi(mut self, roi: impl Into<RegionOfInterest>) -> Self {
        self.roi = Some(roi.into());
        self
    }
}

/// Options with every default filled in and validated
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub timeout: Duration,
    pub similarity: f64,
    pub roi: Option<RegionOfInterest>,
}

/// Façade over a [`MatchBackend`] holding the resolved defaults.
///
/// Only one operation may run against a backend at a time; the backend's
/// similarity and ROI are shared state.
pub struct VisionOperations<B: MatchBackend> {
    backend: B,
    config: MatchConfig,
    engine: PollingEngine,
}

impl<B: MatchBackend> VisionOperations<B> {
    pub fn new(backend: B, config: MatchConfig) -> Self {
        Self {
            backend,
            config,
            engine: PollingEngine::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.engine = self.engine.with_poll_interval(interval);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn overrides(&self) -> OverrideManager<'_, B> {
        OverrideManager::new(&self.backend, &self.config)
    }

    /// Fill in defaults and validate, before anything reaches the backend
    pub fn resolve(&self, options: &MatchOptions) -> VisionResult<ResolvedOptions> {
        let timeout = validate_timeout(options.timeout.unwrap_or(self.config.timeout))?;
        let similarity = validate_similarity(options.similarity.unwrap_or(self.config.similarity))?;
        if let Some(roi) = &options.roi {
            roi.validate()?;
        }
        Ok(ResolvedOptions {
            timeout,
            similarity,
            roi: options.roi.clone(),
        })
    }

    async fn enter(&self, resolved: &ResolvedOptions) -> VisionResult<OverrideScope<'_, B>> {
        self.overrides()
            .standard_scope(resolved.similarity, resolved.roi.as_ref(), resolved.timeout)
            .await
    }

    /// Wait until `image` is visible
    pub async fn wait_until_image_appear(
        &self,
        image: &str,
        options: &MatchOptions,
    ) -> VisionResult<()> {
        let resolved = self.resolve(options)?;
        log::info!("⏳ Waiting up to {:?} for {} to appear", resolved.timeout, image);

        let scope = self.enter(&resolved).await?;
        let result = self.appear(&scope, image, resolved.timeout).await;
        scope.exit().await;
        result
    }

    async fn appear(
        &self,
        scope: &OverrideScope<'_, B>,
        image: &str,
        timeout: Duration,
    ) -> VisionResult<()> {
        self.backend.wait_until_contains(image, timeout).await?;
        scope.highlight_matched(image).await;
        Ok(())
    }

    /// Wait until `image` is no longer visible
    pub async fn wait_until_image_disappear(
        &self,
        image: &str,
        options: &MatchOptions,
    ) -> VisionResult<()> {
        let resolved = self.resolve(options)?;
        log::info!("⏳ Waiting up to {:?} for {} to vanish", resolved.timeout, image);

        let scope = self.enter(&resolved).await?;
        let result = self
            .backend
            .wait_until_not_contains(image, resolved.timeout)
            .await
            .map_err(VisionError::from);
        scope.exit().await;
        result
    }

    /// Number of occurrences of `image`. Fails if it never shows up
    /// within the timeout.
    pub async fn count_image(&self, image: &str, options: &MatchOptions) -> VisionResult<usize> {
        let resolved = self.resolve(options)?;

        let scope = self.enter(&resolved).await?;
        let result = self.count(&scope, image, resolved.timeout).await;
        scope.exit().await;

        if let Ok(count) = &result {
            log::info!("🔢 {} found {} times", image, count);
        }
        result
    }

    async fn count(
        &self,
        scope: &OverrideScope<'_, B>,
        image: &str,
        timeout: Duration,
    ) -> VisionResult<usize> {
        self.backend.wait_until_contains(image, timeout).await?;
        let count = self.backend.image_count(image).await?;
        if count > 0 {
            scope.highlight_matched(image).await;
        }
        Ok(count)
    }

    /// Occurrences of every image, polled until all were seen or the
    /// timeout passed. Images never seen count as 0.
    pub async fn count_multiple_images(
        &self,
        images: &[String],
        options: &MatchOptions,
    ) -> VisionResult<TargetMap<usize>> {
        let resolved = self.resolve(options)?;
        if images.is_empty() {
            return Ok(TargetMap::default());
        }

        let scope = self.enter(&resolved).await?;
        let result = self.count_each(&scope, images, resolved.timeout).await;
        scope.exit().await;
        result
    }

    async fn count_each(
        &self,
        scope: &OverrideScope<'_, B>,
        images: &[String],
        timeout: Duration,
    ) -> VisionResult<TargetMap<usize>> {
        let backend = &self.backend;
        let outcome = self
            .engine
            .poll_each(images, timeout, move |image| async move {
                let count = backend.image_count(&image).await?;
                if count > 0 {
                    scope.highlight_matched(&image).await;
                }
                Ok::<_, BackendError>((count > 0).then_some(count))
            })
            .await?;

        Ok(outcome.into_map(|count| count.unwrap_or(0)))
    }

    /// Whether `image` becomes visible before the timeout
    pub async fn image_exists(&self, image: &str, options: &MatchOptions) -> VisionResult<bool> {
        let resolved = self.resolve(options)?;

        let scope = self.enter(&resolved).await?;
        let result = self
            .exists_each(&scope, &[image.to_string()], resolved.timeout)
            .await
            .map(|found| found.get(image).copied().unwrap_or(false));
        scope.exit().await;
        result
    }

    /// Whether each image became visible before the timeout. Running out
    /// of time is not an error.
    pub async fn multiple_images_exist(
        &self,
        images: &[String],
        options: &MatchOptions,
    ) -> VisionResult<TargetMap<bool>> {
        let resolved = self.resolve(options)?;
        if images.is_empty() {
            return Ok(TargetMap::default());
        }

        let scope = self.enter(&resolved).await?;
        let result = self.exists_each(&scope, images, resolved.timeout).await;
        scope.exit().await;
        result
    }

    async fn exists_each(
        &self,
        scope: &OverrideScope<'_, B>,
        images: &[String],
        timeout: Duration,
    ) -> VisionResult<TargetMap<bool>> {
        let backend = &self.backend;
        let outcome = self
            .engine
            .poll_each(images, timeout, move |image| seen(backend, scope, image))
            .await?;

        Ok(outcome.into_map(|slot| slot.is_some()))
    }

    /// Wait for the first of `images` to appear and return it
    pub async fn wait_one_of_multiple_images(
        &self,
        images: &[String],
        options: &MatchOptions,
    ) -> VisionResult<String> {
        let resolved = self.resolve(options)?;
        let candidates = unique_targets(images);
        if candidates.is_empty() {
            return Err(VisionError::NoTargets {
                operation: "wait_one_of_multiple_images",
            });
        }

        let scope = self.enter(&resolved).await?;
        let result = self.first_of(&scope, &candidates, resolved.timeout).await;
        scope.exit().await;

        if let Ok(winner) = &result {
            log::info!("✅ {} appeared first", winner);
        }
        result
    }

    async fn first_of(
        &self,
        scope: &OverrideScope<'_, B>,
        candidates: &[String],
        timeout: Duration,
    ) -> VisionResult<String> {
        let winner = self.backend.wait_for_any(candidates, timeout).await?;
        scope.highlight_matched(&winner).await;
        Ok(winner)
    }

    /// Wait until every image is visible. On timeout the error lists the
    /// images that never appeared.
    pub async fn wait_multiple_images(
        &self,
        images: &[String],
        options: &MatchOptions,
    ) -> VisionResult<()> {
        let resolved = self.resolve(options)?;
        if images.is_empty() {
            return Ok(());
        }
        log::info!(
            "⏳ Waiting up to {:?} for {} images",
            resolved.timeout,
            unique_targets(images).len()
        );

        let scope = self.enter(&resolved).await?;
        let result = self.all_of(&scope, images, resolved.timeout).await;
        scope.exit().await;
        result
    }

    async fn all_of(
        &self,
        scope: &OverrideScope<'_, B>,
        images: &[String],
        timeout: Duration,
    ) -> VisionResult<()> {
        let backend = &self.backend;
        self.engine
            .poll_all(images, timeout, move |image| seen(backend, scope, image))
            .await?;
        Ok(())
    }
}

/// Presence probe that highlights the image as soon as it is seen
async fn seen<B: MatchBackend>(
    backend: &B,
    scope: &OverrideScope<'_, B>,
    image: String,
) -> BackendResult<Option<()>> {
    if backend.exists(&image).await? {
        scope.highlight_matched(&image).await;
        return Ok(Some(()));
    }
    Ok(None)
}
