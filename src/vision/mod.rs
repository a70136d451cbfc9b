// Vision module - scoped overrides and deadline-bounded polling
// Drives a MatchBackend to implement the keyword-level operations:
// wait for images, count them, and decide any/all/each over batches.

pub mod config;
pub mod error;
pub mod operations;
pub mod polling;
pub mod region;
pub mod scope;
pub mod session;


// Re-export the main types for easy access
pub use config::{ConfigError, ConfigResult, MatchConfig};
pub use error::{VisionError, VisionResult};
pub use operations::{MatchOptions, ResolvedOptions, VisionOperations};
pub use polling::{DEFAULT_POLL_INTERVAL, PollOutcome, PollingEngine, TargetMap};
pub use region::RegionOfInterest;
pub use scope::{OverrideManager, OverrideScope};
pub use session::VisionSession;
