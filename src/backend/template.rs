//! In-process match backend built on screenshot frames and template matching

use image::GrayImage;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tokio::time::{Duration, Instant, sleep};

use super::error::{BackendError, BackendResult};
use super::frames::FrameSource;
use super::types::{Highlight, MatchBackend, Region, deadline_after};
use crate::template_matching::{Match, TemplateMatcher};

/// Cadence of the backend's own blocking waits
pub const DEFAULT_BACKEND_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Similarity the backend starts with before anyone overrides it
pub const INITIAL_SIMILARITY: f64 = 0.7;

#[derive(Debug)]
struct BackendState {
    similarity: f64,
    roi: Option<Region>,
    screen: usize,
    highlights: Vec<Highlight>,
}

/// Match backend that searches screenshots of one or more screens.
///
/// Targets are image file paths (or names registered with
/// [`TemplateBackend::register_template`]). Everything lives behind
/// `RefCell`s: the backend is a single-threaded, process-wide resource.
pub struct TemplateBackend<S: FrameSource> {
    screens: Vec<S>,
    matcher: TemplateMatcher,
    state: RefCell<BackendState>,
    templates: RefCell<HashMap<String, Rc<GrayImage>>>,
    capture_dir: PathBuf,
    poll_interval: Duration,
}

impl<S: FrameSource> TemplateBackend<S> {
    pub fn new(screens: Vec<S>) -> Self {
        Self {
            screens,
            matcher: TemplateMatcher::new(),
            state: RefCell::new(BackendState {
                similarity: INITIAL_SIMILARITY,
                roi: None,
                screen: 0,
                highlights: Vec::new(),
            }),
            templates: RefCell::new(HashMap::new()),
            capture_dir: std::env::temp_dir().join("screen-vision-run"),
            poll_interval: DEFAULT_BACKEND_POLL_INTERVAL,
        }
    }

    /// Directory where `capture_roi` snapshots are written
    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = dir.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Make an in-memory image available as a target under `name`
    pub fn register_template(&self, name: impl Into<String>, template: GrayImage) {
        self.templates
            .borrow_mut()
            .insert(name.into(), Rc::new(template));
    }

    pub fn similarity(&self) -> f64 {
        self.state.borrow().similarity
    }

    pub fn roi(&self) -> Option<Region> {
        self.state.borrow().roi
    }

    /// Frame source of screen `id`
    pub fn screen(&self, id: usize) -> Option<&S> {
        self.screens.get(id)
    }

    pub fn active_screen(&self) -> usize {
        self.state.borrow().screen
    }

    /// Highlight overlays currently drawn
    pub fn highlights(&self) -> Vec<Highlight> {
        self.state.borrow().highlights.clone()
    }

    /// Load a template once and keep it cached.
    /// For files like "img-[300,1682,50,50].png" only that region of the
    /// stored screenshot is used as the template.
    fn load_template(&self, target: &str) -> BackendResult<Rc<GrayImage>> {
        if let Some(cached) = self.templates.borrow().get(target) {
            return Ok(Rc::clone(cached));
        }

        let path = Path::new(target);
        let full = image::open(path)
            .map_err(|source| BackendError::ImageLoadFailed {
                path: path.to_path_buf(),
                source,
            })?
            .to_luma8();

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(target);
        let template = match Region::from_filename(file_name) {
            Some(crop) => {
                let right = crop.x.checked_add(crop.width);
                let bottom = crop.y.checked_add(crop.height);
                if right.is_none_or(|r| r > full.width()) || bottom.is_none_or(|b| b > full.height()) {
                    return Err(BackendError::TemplateCropOutOfBounds {
                        region: crop,
                        width: full.width(),
                        height: full.height(),
                    });
                }
                log::debug!("📐 Cropping template '{}' to {}", target, crop);
                image::imageops::crop_imm(&full, crop.x, crop.y, crop.width, crop.height).to_image()
            }
            None => full,
        };

        let template = Rc::new(template);
        self.templates
            .borrow_mut()
            .insert(target.to_string(), Rc::clone(&template));
        Ok(template)
    }

    /// Capture the active screen, cropped to the ROI when one is set.
    /// Returns the pixels and the area they cover in screen coordinates.
    fn search_area(&self) -> BackendResult<(GrayImage, Region)> {
        let (screen, roi) = {
            let state = self.state.borrow();
            (state.screen, state.roi)
        };
        let source = self
            .screens
            .get(screen)
            .ok_or(BackendError::ScreenOutOfRange {
                id: screen,
                available: self.screens.len(),
            })?;
        let frame = source.capture()?;

        match roi {
            None => {
                let area = Region::full_screen(frame.width(), frame.height());
                Ok((frame, area))
            }
            Some(roi) => {
                if roi.x >= frame.width() || roi.y >= frame.height() {
                    return Err(BackendError::InvalidRegion { region: roi });
                }
                let area = roi.clip_to_screen(frame.width(), frame.height());
                let cropped =
                    image::imageops::crop_imm(&frame, area.x, area.y, area.width, area.height)
                        .to_image();
                Ok((cropped, area))
            }
        }
    }

    fn threshold(&self) -> f32 {
        self.state.borrow().similarity as f32
    }

    fn find_all(&self, target: &str) -> BackendResult<Vec<Match>> {
        let template = self.load_template(target)?;
        let (pixels, area) = self.search_area()?;
        Ok(self
            .matcher
            .find_matches(&pixels, &template, self.threshold())
            .into_iter()
            .map(|m| m.offset(area.x, area.y))
            .collect())
    }

    fn find_best(&self, target: &str) -> BackendResult<Option<Match>> {
        let template = self.load_template(target)?;
        let (pixels, area) = self.search_area()?;
        Ok(self
            .matcher
            .best_match(&pixels, &template, self.threshold())
            .map(|m| m.offset(area.x, area.y)))
    }

    /// Re-run `check` every poll interval until it yields a value or the
    /// timeout passes.
    async fn poll_until<T, F>(
        &self,
        timeout: Duration,
        targets: Vec<String>,
        mut check: F,
    ) -> BackendResult<T>
    where
        F: FnMut() -> BackendResult<Option<T>>,
    {
        let deadline = deadline_after(timeout);
        loop {
            if let Some(found) = check()? {
                return Ok(found);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(BackendError::WaitTimeout { targets, timeout });
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

impl<S: FrameSource> MatchBackend for TemplateBackend<S> {
    async fn set_min_similarity(&self, value: f64) -> BackendResult<f64> {
        if !(0.0..=1.0).contains(&value) {
            return Err(BackendError::InvalidSimilarity { value });
        }
        let previous = std::mem::replace(&mut self.state.borrow_mut().similarity, value);
        log::debug!("Similarity {:.2} -> {:.2}", previous, value);
        Ok(previous)
    }

    async fn set_roi(&self, region: Region) -> BackendResult<()> {
        if !region.is_valid() {
            return Err(BackendError::InvalidRegion { region });
        }
        self.state.borrow_mut().roi = Some(region);
        log::debug!("ROI set to {}", region);
        Ok(())
    }

    async fn reset_roi(&self) -> BackendResult<()> {
        self.state.borrow_mut().roi = None;
        log::debug!("ROI reset to whole screen");
        Ok(())
    }

    async fn capture_roi(&self, label: &str) -> BackendResult<String> {
        let (pixels, area) = self.search_area()?;

        std::fs::create_dir_all(&self.capture_dir).map_err(|source| {
            BackendError::CaptureDirectoryFailed {
                path: self.capture_dir.clone(),
                source,
            }
        })?;
        let mut path = self.capture_dir.join(label);
        if path.extension().is_none() {
            path.set_extension("png");
        }
        pixels
            .save(&path)
            .map_err(|source| BackendError::CaptureWriteFailed {
                path: path.clone(),
                source,
            })?;

        let reference = path.display().to_string();
        log::debug!("📸 Captured {} into {}", area, reference);
        self.register_template(reference.clone(), pixels);
        Ok(reference)
    }

    async fn highlight(&self, image: &str) -> BackendResult<()> {
        let found = self
            .find_best(image)?
            .ok_or_else(|| BackendError::ImageNotFound {
                target: image.to_string(),
            })?;
        log::info!("🖍️ Highlight {}", found.describe(image));
        self.state.borrow_mut().highlights.push(Highlight {
            label: image.to_string(),
            region: found.region(),
            duration: None,
        });
        Ok(())
    }

    async fn highlight_region(&self, region: Region, duration: Duration) -> BackendResult<()> {
        log::info!("🖍️ Highlight region {} for {:?}", region, duration);
        self.state.borrow_mut().highlights.push(Highlight {
            label: region.to_string(),
            region,
            duration: Some(duration),
        });
        Ok(())
    }

    async fn clear_all_highlights(&self) -> BackendResult<()> {
        let cleared = std::mem::take(&mut self.state.borrow_mut().highlights);
        log::debug!("Cleared {} highlights", cleared.len());
        Ok(())
    }

    async fn exists(&self, target: &str) -> BackendResult<bool> {
        Ok(self.find_best(target)?.is_some())
    }

    async fn image_count(&self, target: &str) -> BackendResult<usize> {
        Ok(self.find_all(target)?.len())
    }

    async fn get_image_coordinates(&self, target: &str) -> BackendResult<Region> {
        self.find_best(target)?
            .map(|m| m.region())
            .ok_or_else(|| BackendError::ImageNotFound {
                target: target.to_string(),
            })
    }

    async fn wait_until_contains(&self, target: &str, timeout: Duration) -> BackendResult<()> {
        self.poll_until(timeout, vec![target.to_string()], || {
            Ok(self.find_best(target)?.map(|_| ()))
        })
        .await
    }

    async fn wait_until_not_contains(&self, target: &str, timeout: Duration) -> BackendResult<()> {
        self.poll_until(timeout, vec![target.to_string()], || {
            Ok(self.find_best(target)?.is_none().then_some(()))
        })
        .await
    }

    async fn wait_for_any(&self, targets: &[String], timeout: Duration) -> BackendResult<String> {
        if targets.is_empty() {
            return Err(BackendError::WaitTimeout {
                targets: Vec::new(),
                timeout,
            });
        }
        self.poll_until(timeout, targets.to_vec(), || {
            for target in targets {
                if self.find_best(target)?.is_some() {
                    return Ok(Some(target.clone()));
                }
            }
            Ok(None)
        })
        .await
    }

    async fn get_number_of_screens(&self) -> BackendResult<usize> {
        Ok(self.screens.len())
    }

    async fn change_screen(&self, id: usize) -> BackendResult<()> {
        if id >= self.screens.len() {
            return Err(BackendError::ScreenOutOfRange {
                id,
                available: self.screens.len(),
            });
        }
        self.state.borrow_mut().screen = id;
        log::info!("🖥️ Active screen: {} ({})", id, self.screens[id].name());
        Ok(())
    }
}
