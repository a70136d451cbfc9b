pub mod args;
pub mod backend;
pub mod report;
pub mod template_matching;
pub mod vision;

pub use backend::{MatchBackend, TemplateBackend};
pub use vision::{MatchConfig, MatchOptions, VisionError, VisionOperations, VisionSession};
