//! Region-of-interest arguments accepted by vision operations

use super::config::{ConfigError, ConfigResult};
use crate::backend::Region;

/// Where an operation searches. Lives for a single operation call.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionOfInterest {
    /// Search inside the area currently occupied by this anchor image
    Image(String),
    /// Search inside an explicit rectangle
    Area(Region),
}

impl RegionOfInterest {
    /// Interpret a keyword argument: "x,y,w,h" / "[x,y,w,h]" become an
    /// area, anything else is an anchor image.
    pub fn parse(text: &str) -> Self {
        match Region::parse(text) {
            Some(region) => RegionOfInterest::Area(region),
            None => RegionOfInterest::Image(text.trim().to_string()),
        }
    }

    /// Reject rectangles without area and empty anchor names
    pub fn validate(&self) -> ConfigResult<()> {
        match self {
            RegionOfInterest::Area(region) if !region.is_valid() => Err(ConfigError::InvalidValue {
                key: "roi".to_string(),
                value: region.to_string(),
                reason: "width and height must be > 0".to_string(),
            }),
            RegionOfInterest::Image(target) if target.is_empty() => Err(ConfigError::InvalidValue {
                key: "roi".to_string(),
                value: String::new(),
                reason: "anchor image name is empty".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl From<Region> for RegionOfInterest {
    fn from(region: Region) -> Self {
        RegionOfInterest::Area(region)
    }
}

impl From<&str> for RegionOfInterest {
    fn from(target: &str) -> Self {
        RegionOfInterest::Image(target.to_string())
    }
}

impl From<String> for RegionOfInterest {
    fn from(target: String) -> Self {
        RegionOfInterest::Image(target)
    }
}
