/// Template matching implementation
///
/// Squared-difference matching with overlap suppression

use super::types::Match;
use image::GrayImage;
use imageproc::template_matching::{MatchTemplateMethod, match_template};

/// Upper bound on distinct matches reported for one template
pub const DEFAULT_MAX_MATCHES: usize = 100;

const MAX_PIXEL_SQ_DIFF: f64 = 255.0 * 255.0;

/// Template matcher for finding images inside screenshots
pub struct TemplateMatcher {
    max_matches: usize,
}

impl TemplateMatcher {
    /// Create a matcher with the default match limit
    pub fn new() -> Self {
        Self {
            max_matches: DEFAULT_MAX_MATCHES,
        }
    }

    pub fn with_max_matches(max_matches: usize) -> Self {
        Self {
            max_matches: max_matches.max(1),
        }
    }

    /// Find distinct occurrences of `template` in `image`
    ///
    /// # Arguments
    /// * `image` - The grayscale image to search in
    /// * `template` - The grayscale template to look for
    /// * `threshold` - Minimum similarity (0.0-1.0)
    ///
    /// # Returns
    /// Non-overlapping matches sorted by score (highest first)
    pub fn find_matches(&self, image: &GrayImage, template: &GrayImage, threshold: f32) -> Vec<Match> {
        let mut candidates = self.score_positions(image, template, threshold);
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut accepted: Vec<Match> = Vec::new();
        for candidate in candidates {
            if accepted.len() >= self.max_matches {
                break;
            }
            let region = candidate.region();
            if accepted.iter().all(|m| !m.region().intersects(&region)) {
                accepted.push(candidate);
            }
        }

        log::debug!(
            "  🔍 {}x{} template: {} distinct matches >= {:.2}",
            template.width(),
            template.height(),
            accepted.len(),
            threshold
        );
        accepted
    }

    /// Highest scoring match, if any reaches `threshold`
    pub fn best_match(&self, image: &GrayImage, template: &GrayImage, threshold: f32) -> Option<Match> {
        self.score_positions(image, template, threshold)
            .into_iter()
            .max_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Every placement whose similarity reaches `threshold`
    fn score_positions(&self, image: &GrayImage, template: &GrayImage, threshold: f32) -> Vec<Match> {
        let (tw, th) = template.dimensions();
        if tw == 0 || th == 0 || tw > image.width() || th > image.height() {
            return Vec::new();
        }

        let max_sq_diff = (tw as f64) * (th as f64) * MAX_PIXEL_SQ_DIFF;
        let ssd = match_template(image, template, MatchTemplateMethod::SumOfSquaredErrors);

        ssd.enumerate_pixels()
            .filter_map(|(x, y, pixel)| {
                let score = similarity_from_ssd(pixel[0] as f64, max_sq_diff);
                (score >= threshold).then_some(Match {
                    x,
                    y,
                    width: tw,
                    height: th,
                    score,
                })
            })
            .collect()
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a sum of squared differences into a 0.0-1.0 similarity
fn similarity_from_ssd(sum_sq_diff: f64, max_sq_diff: f64) -> f32 {
    if !sum_sq_diff.is_finite() || max_sq_diff <= 0.0 {
        return 0.0;
    }
    (1.0 - sum_sq_diff / max_sq_diff).clamp(0.0, 1.0) as f32
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Luma;

    /// 8x8 template: white 6x6 square inside a black border
    pub(crate) fn square_template() -> GrayImage {
        GrayImage::from_fn(8, 8, |x, y| {
            if (1..7).contains(&x) && (1..7).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    pub(crate) fn stamp(frame: &mut GrayImage, template: &GrayImage, x: u32, y: u32) {
        for (dx, dy, pixel) in template.enumerate_pixels() {
            frame.put_pixel(x + dx, y + dy, *pixel);
        }
    }

    #[test]
    fn test_create_matcher() {
        let matcher = TemplateMatcher::new();
        assert_eq!(matcher.max_matches, DEFAULT_MAX_MATCHES);
        assert_eq!(TemplateMatcher::with_max_matches(0).max_matches, 1);
    }

    #[test]
    fn test_perfect_match_found() {
        let template = square_template();
        let mut frame = GrayImage::new(40, 30);
        stamp(&mut frame, &template, 12, 9);

        let best = TemplateMatcher::new()
            .best_match(&frame, &template, 0.9)
            .expect("stamped template should be found");
        assert_eq!((best.x, best.y), (12, 9));
        assert!(best.score >= 0.99, "Perfect match should score >= 0.99");
    }

    #[test]
    fn test_counts_distinct_occurrences() {
        let template = square_template();
        let mut frame = GrayImage::new(60, 40);
        stamp(&mut frame, &template, 2, 2);
        stamp(&mut frame, &template, 30, 20);

        let matches = TemplateMatcher::new().find_matches(&frame, &template, 0.9);
        assert_eq!(matches.len(), 2, "Neighbouring placements must be suppressed");
        let mut origins: Vec<(u32, u32)> = matches.iter().map(|m| (m.x, m.y)).collect();
        origins.sort();
        assert_eq!(origins, vec![(2, 2), (30, 20)]);
    }

    #[test]
    fn test_absent_template_has_no_matches() {
        let template = square_template();
        let frame = GrayImage::new(40, 40);

        assert!(TemplateMatcher::new().find_matches(&frame, &template, 0.9).is_empty());
        assert!(TemplateMatcher::new().best_match(&frame, &template, 0.9).is_none());
    }

    #[test]
    fn test_template_larger_than_image() {
        let template = square_template();
        let frame = GrayImage::new(4, 4);

        assert!(TemplateMatcher::new().find_matches(&frame, &template, 0.0).is_empty());
    }

    #[test]
    fn test_max_matches_limit() {
        let template = square_template();
        let mut frame = GrayImage::new(60, 20);
        for x in [0, 15, 30, 45] {
            stamp(&mut frame, &template, x, 5);
        }

        let matches = TemplateMatcher::with_max_matches(3).find_matches(&frame, &template, 0.9);
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn test_similarity_from_ssd_bounds() {
        assert_eq!(similarity_from_ssd(0.0, 100.0), 1.0);
        assert_eq!(similarity_from_ssd(100.0, 100.0), 0.0);
        assert_eq!(similarity_from_ssd(f64::NAN, 100.0), 0.0);
    }
}
