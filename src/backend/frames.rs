// Screen frame sources for the template backend
use image::GrayImage;
use std::cell::RefCell;
use std::path::PathBuf;

use super::error::{BackendError, BackendResult};

/// One physical screen the template backend can search.
pub trait FrameSource {
    /// Display name used in logs and errors
    fn name(&self) -> &str;
    /// Grab the current contents of the screen as grayscale pixels
    fn capture(&self) -> BackendResult<GrayImage>;
}

/// Screen backed by a screenshot file that another process keeps refreshing.
/// The file is re-read on every capture.
#[derive(Debug, Clone)]
pub struct FileFrameSource {
    path: PathBuf,
    name: String,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl FrameSource for FileFrameSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn capture(&self) -> BackendResult<GrayImage> {
        let frame = image::open(&self.path).map_err(|e| BackendError::FrameCaptureFailed {
            screen: self.name.clone(),
            description: e.to_string(),
        })?;
        Ok(frame.to_luma8())
    }
}

/// Screen held in memory; the frame can be swapped between polls.
#[derive(Debug)]
pub struct MemoryFrameSource {
    name: String,
    frame: RefCell<GrayImage>,
}

impl MemoryFrameSource {
    pub fn new(name: impl Into<String>, frame: GrayImage) -> Self {
        Self {
            name: name.into(),
            frame: RefCell::new(frame),
        }
    }

    /// Replace what the screen shows
    pub fn show(&self, frame: GrayImage) {
        *self.frame.borrow_mut() = frame;
    }
}

impl FrameSource for MemoryFrameSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn capture(&self) -> BackendResult<GrayImage> {
        Ok(self.frame.borrow().clone())
    }
}
