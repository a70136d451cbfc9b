// Core match backend types and traits
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use super::error::BackendResult;

/// Rectangle on the active screen, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a full-screen region
    pub fn full_screen(screen_width: u32, screen_height: u32) -> Self {
        Self::new(0, 0, screen_width, screen_height)
    }

    /// Parse coordinates such as "300,1682,50,50" or "[300, 1682, 50, 50]"
    pub fn parse(text: &str) -> Option<Region> {
        let trimmed = text.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(trimmed);
        let parts: Vec<&str> = inner.split(',').collect();
        if parts.len() != 4 {
            return None;
        }
        match (
            parts[0].trim().parse::<u32>(),
            parts[1].trim().parse::<u32>(),
            parts[2].trim().parse::<u32>(),
            parts[3].trim().parse::<u32>(),
        ) {
            (Ok(x), Ok(y), Ok(width), Ok(height)) => Some(Region::new(x, y, width, height)),
            _ => None,
        }
    }

    /// Extract the region embedded in a file name: template-[x,y,width,height].png
    pub fn from_filename(filename: &str) -> Option<Region> {
        let start = filename.find('[')?;
        let end = filename.find(']')?;
        if end <= start {
            return None;
        }
        Self::parse(&filename[start + 1..end])
    }

    /// Clip region to screen boundaries
    pub fn clip_to_screen(mut self, screen_width: u32, screen_height: u32) -> Region {
        self.x = self.x.min(screen_width.saturating_sub(1));
        self.y = self.y.min(screen_height.saturating_sub(1));
        self.width = self.width.min(screen_width.saturating_sub(self.x));
        self.height = self.height.min(screen_height.saturating_sub(self.y));
        self
    }

    /// Shrink every side by `margin` pixels. Regions too small to shrink are
    /// returned unchanged.
    pub fn inset(&self, margin: u32) -> Region {
        if self.width <= 2 * margin || self.height <= 2 * margin {
            return *self;
        }
        Region::new(
            self.x + margin,
            self.y + margin,
            self.width - 2 * margin,
            self.height - 2 * margin,
        )
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Check if this region is valid (non-zero dimensions)
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{},{}]", self.x, self.y, self.width, self.height)
    }
}

/// Used when `now + timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Deadline `timeout` from now, saturating for timeouts too large to add
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

/// Primitive recognition operations the vision layer is built on.
///
/// The backend owns process-wide state (active similarity, ROI, highlight
/// overlays, selected screen) that every call may observe or mutate. Receivers
/// are `&self`; implementations use interior mutability and are not expected
/// to be shared across threads. Only one operation may drive a backend at a
/// time.
#[allow(async_fn_in_trait)]
pub trait MatchBackend {
    /// Install a new minimum similarity and return the one it replaced.
    async fn set_min_similarity(&self, value: f64) -> BackendResult<f64>;

    async fn set_roi(&self, region: Region) -> BackendResult<()>;
    /// Restore the "whole screen" search area.
    async fn reset_roi(&self) -> BackendResult<()>;
    /// Snapshot the current ROI (whole screen when unset) and return a
    /// reference usable as an image target.
    async fn capture_roi(&self, label: &str) -> BackendResult<String>;

    async fn highlight(&self, image: &str) -> BackendResult<()>;
    async fn highlight_region(&self, region: Region, duration: Duration) -> BackendResult<()>;
    async fn clear_all_highlights(&self) -> BackendResult<()>;

    async fn exists(&self, target: &str) -> BackendResult<bool>;
    async fn image_count(&self, target: &str) -> BackendResult<usize>;
    async fn get_image_coordinates(&self, target: &str) -> BackendResult<Region>;

    /// Block until `target` is visible; fails with a wait timeout otherwise.
    async fn wait_until_contains(&self, target: &str, timeout: Duration) -> BackendResult<()>;
    /// Block until `target` is no longer visible.
    async fn wait_until_not_contains(&self, target: &str, timeout: Duration) -> BackendResult<()>;
    /// Race several targets and return the first one seen.
    async fn wait_for_any(&self, targets: &[String], timeout: Duration) -> BackendResult<String>;

    async fn get_number_of_screens(&self) -> BackendResult<usize>;
    async fn change_screen(&self, id: usize) -> BackendResult<()>;

    // Release backend resources (remote servers, helper processes)
    async fn shutdown(&self) -> BackendResult<()> {
        Ok(())
    }
}

/// A highlight overlay currently drawn on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub label: String,
    pub region: Region,
    pub duration: Option<Duration>,
}
