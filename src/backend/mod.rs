// Match backend module - primitive image recognition operations
// This module defines the contract the vision layer drives and an
// in-process implementation that searches screenshots with template matching.

pub mod error;
pub mod frames;
pub mod template;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export the main types for easy access
pub use error::{BackendError, BackendResult};
pub use frames::{FileFrameSource, FrameSource, MemoryFrameSource};
pub use template::TemplateBackend;
pub use types::{Highlight, MatchBackend, Region, deadline_after};
