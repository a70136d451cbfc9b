/// Template matching data types
use crate::backend::Region;

/// A single match result
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    /// X coordinate in the search image
    pub x: u32,
    /// Y coordinate in the search image
    pub y: u32,
    /// Width of the matched template
    pub width: u32,
    /// Height of the matched template
    pub height: u32,
    /// Similarity score (0.0-1.0)
    pub score: f32,
}

impl Match {
    /// Area covered by the match
    pub fn region(&self) -> Region {
        Region::new(self.x, self.y, self.width, self.height)
    }

    /// Same match, moved by the origin of the area it was found in
    pub fn offset(mut self, dx: u32, dy: u32) -> Self {
        self.x += dx;
        self.y += dy;
        self
    }

    /// Format match as string with score percentage
    pub fn describe(&self, label: &str) -> String {
        let score_pct = (self.score * 100.0) as u32;
        format!("{} at ({},{}) - {}%", label, self.x, self.y, score_pct)
    }
}
