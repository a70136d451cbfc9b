/// Template matching module for locating images in screenshots
///
/// This module provides:
/// - Normalised squared-difference scoring backed by imageproc
/// - Thresholding against the active similarity
/// - Greedy suppression of overlapping candidates so counts reflect
///   distinct occurrences
pub mod matcher;
pub mod types;

pub use matcher::TemplateMatcher;
pub use types::Match;
