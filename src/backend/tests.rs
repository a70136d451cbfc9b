// Tests for the template backend and region helpers
// Focus: similarity/ROI state, counting, waits, captures, screen selection

#[cfg(test)]
mod template_backend_tests {
    use super::super::error::BackendError;
    use super::super::frames::MemoryFrameSource;
    use super::super::template::{INITIAL_SIMILARITY, TemplateBackend};
    use super::super::types::{MatchBackend, Region};
    use crate::template_matching::matcher::tests::{square_template, stamp};
    use image::GrayImage;
    use std::time::Duration;

    const SQUARE: &str = "square";

    fn two_square_frame() -> GrayImage {
        let template = square_template();
        let mut frame = GrayImage::new(60, 40);
        stamp(&mut frame, &template, 2, 2);
        stamp(&mut frame, &template, 30, 20);
        frame
    }

    fn backend_with(frames: Vec<GrayImage>) -> TemplateBackend<MemoryFrameSource> {
        let screens = frames
            .into_iter()
            .enumerate()
            .map(|(i, frame)| MemoryFrameSource::new(format!("screen-{i}"), frame))
            .collect();
        let backend = TemplateBackend::new(screens)
            .with_capture_dir(std::env::temp_dir().join("screen-vision-run-tests"));
        backend.register_template(SQUARE, square_template());
        backend
    }

    // ============================================================
    // REGION HELPERS
    // ============================================================

    #[test]
    fn test_region_parse_from_filename() {
        let region = Region::from_filename("img-[300,1682,50,50].png").unwrap();
        assert_eq!(region, Region::new(300, 1682, 50, 50));
    }

    #[test]
    fn test_region_parse_plain_and_bracketed() {
        assert_eq!(Region::parse("1, 2, 3, 4"), Some(Region::new(1, 2, 3, 4)));
        assert_eq!(Region::parse("[5,6,7,8]"), Some(Region::new(5, 6, 7, 8)));
        assert_eq!(Region::parse("1,2,3"), None);
        assert_eq!(Region::parse("a,b,c,d"), None);
        assert!(Region::from_filename("button_start.png").is_none());
    }

    #[test]
    fn test_region_clips_to_screen_bounds() {
        let region = Region::new(1000, 2200, 200, 200).clip_to_screen(1080, 2280);
        assert_eq!(region, Region::new(1000, 2200, 80, 80));
    }

    #[test]
    fn test_region_inset_and_geometry() {
        let region = Region::new(0, 0, 100, 50);
        assert_eq!(region.inset(3), Region::new(3, 3, 94, 44));
        assert_eq!(Region::new(0, 0, 4, 4).inset(3), Region::new(0, 0, 4, 4));
        assert!(region.intersects(&Region::new(90, 40, 20, 20)));
        assert!(!region.intersects(&Region::new(100, 0, 5, 5)));
        assert_eq!(region.to_string(), "[0,0,100,50]");
    }

    // ============================================================
    // SIMILARITY / ROI STATE
    // ============================================================

    #[tokio::test]
    async fn test_set_min_similarity_returns_previous() {
        let backend = backend_with(vec![two_square_frame()]);

        let previous = backend.set_min_similarity(0.9).await.unwrap();
        assert_eq!(previous, INITIAL_SIMILARITY);
        assert_eq!(backend.set_min_similarity(0.8).await.unwrap(), 0.9);
        assert_eq!(backend.similarity(), 0.8);
    }

    #[tokio::test]
    async fn test_invalid_similarity_rejected() {
        let backend = backend_with(vec![two_square_frame()]);

        let err = backend.set_min_similarity(1.5).await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidSimilarity { .. }));
        assert_eq!(backend.similarity(), INITIAL_SIMILARITY);
    }

    #[tokio::test]
    async fn test_count_and_exists() {
        let backend = backend_with(vec![two_square_frame()]);
        backend.set_min_similarity(0.9).await.unwrap();

        assert!(backend.exists(SQUARE).await.unwrap());
        assert_eq!(backend.image_count(SQUARE).await.unwrap(), 2);

        let blank = backend_with(vec![GrayImage::new(60, 40)]);
        blank.set_min_similarity(0.9).await.unwrap();
        assert!(!blank.exists(SQUARE).await.unwrap());
        assert_eq!(blank.image_count(SQUARE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_roi_restricts_search() {
        let backend = backend_with(vec![two_square_frame()]);
        backend.set_min_similarity(0.9).await.unwrap();

        backend.set_roi(Region::new(25, 15, 20, 20)).await.unwrap();
        assert_eq!(backend.image_count(SQUARE).await.unwrap(), 1);
        assert_eq!(
            backend.get_image_coordinates(SQUARE).await.unwrap(),
            Region::new(30, 20, 8, 8),
            "Coordinates are reported in screen space"
        );

        backend.reset_roi().await.unwrap();
        assert_eq!(backend.roi(), None);
        assert_eq!(backend.image_count(SQUARE).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_roi_rejected() {
        let backend = backend_with(vec![two_square_frame()]);

        let err = backend.set_roi(Region::new(0, 0, 0, 10)).await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidRegion { .. }));
        assert_eq!(backend.roi(), None);
    }

    #[tokio::test]
    async fn test_missing_image_coordinates() {
        let backend = backend_with(vec![GrayImage::new(20, 20)]);
        backend.set_min_similarity(0.9).await.unwrap();

        let err = backend.get_image_coordinates(SQUARE).await.unwrap_err();
        assert!(matches!(err, BackendError::ImageNotFound { target } if target == SQUARE));
    }

    // ============================================================
    // WAITS
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_contains_times_out() {
        let backend = backend_with(vec![GrayImage::new(20, 20)]);
        backend.set_min_similarity(0.9).await.unwrap();

        let start = tokio::time::Instant::now();
        let err = backend
            .wait_until_contains(SQUARE, Duration::from_secs(2))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_wait_returns_on_match() {
        let backend = backend_with(vec![two_square_frame()]);
        backend.set_min_similarity(0.9).await.unwrap();

        backend
            .wait_until_contains(SQUARE, Duration::MAX)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_not_contains_succeeds_when_absent() {
        let backend = backend_with(vec![GrayImage::new(20, 20)]);
        backend.set_min_similarity(0.9).await.unwrap();

        backend
            .wait_until_not_contains(SQUARE, Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_any_returns_visible_target() {
        let backend = backend_with(vec![two_square_frame()]);
        backend.register_template("blank", GrayImage::from_pixel(8, 8, image::Luma([200])));
        backend.set_min_similarity(0.9).await.unwrap();

        let targets = vec!["blank".to_string(), SQUARE.to_string()];
        let winner = backend
            .wait_for_any(&targets, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(winner, SQUARE);
    }

    // ============================================================
    // HIGHLIGHTS AND CAPTURES
    // ============================================================

    #[tokio::test]
    async fn test_highlight_and_clear() {
        let backend = backend_with(vec![two_square_frame()]);
        backend.set_min_similarity(0.9).await.unwrap();

        backend.highlight(SQUARE).await.unwrap();
        backend
            .highlight_region(Region::new(0, 0, 5, 5), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(backend.highlights().len(), 2);

        backend.clear_all_highlights().await.unwrap();
        assert!(backend.highlights().is_empty());
    }

    #[tokio::test]
    async fn test_capture_roi_is_usable_as_target() {
        let backend = backend_with(vec![two_square_frame()]);
        backend.set_min_similarity(0.9).await.unwrap();
        backend.set_roi(Region::new(25, 15, 20, 20)).await.unwrap();

        let captured = backend.capture_roi("roi_capture_test").await.unwrap();
        assert!(captured.ends_with("roi_capture_test.png"));
        assert!(std::path::Path::new(&captured).exists());

        backend.reset_roi().await.unwrap();
        backend.highlight(&captured).await.unwrap();
        assert_eq!(backend.highlights()[0].region, Region::new(25, 15, 20, 20));
    }

    #[tokio::test]
    async fn test_template_file_cropped_by_name() {
        let frame = two_square_frame();
        let dir = std::env::temp_dir().join("screen-vision-run-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shot-[30,20,8,8].png");
        frame.save(&path).unwrap();

        let backend = backend_with(vec![frame]);
        backend.set_min_similarity(0.9).await.unwrap();
        let target = path.display().to_string();

        assert_eq!(backend.image_count(&target).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_template_crop_past_u32_range_rejected() {
        let frame = two_square_frame();
        let dir = std::env::temp_dir().join("screen-vision-run-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shot-[4294967295,0,10,10].png");
        frame.save(&path).unwrap();

        let backend = backend_with(vec![frame]);
        let err = backend.exists(&path.display().to_string()).await.unwrap_err();
        assert!(matches!(err, BackendError::TemplateCropOutOfBounds { .. }));
    }

    #[tokio::test]
    async fn test_missing_template_file() {
        let backend = backend_with(vec![two_square_frame()]);

        let err = backend.exists("/nonexistent/template.png").await.unwrap_err();
        assert!(matches!(err, BackendError::ImageLoadFailed { .. }));
    }

    // ============================================================
    // SCREENS
    // ============================================================

    #[tokio::test]
    async fn test_change_screen() {
        let backend = backend_with(vec![GrayImage::new(60, 40), two_square_frame()]);
        backend.set_min_similarity(0.9).await.unwrap();

        assert_eq!(backend.get_number_of_screens().await.unwrap(), 2);
        assert!(!backend.exists(SQUARE).await.unwrap());

        backend.change_screen(1).await.unwrap();
        assert_eq!(backend.active_screen(), 1);
        assert!(backend.exists(SQUARE).await.unwrap());

        let err = backend.change_screen(2).await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::ScreenOutOfRange { id: 2, available: 2 }
        ));
        assert_eq!(backend.active_screen(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_swapped_between_polls() {
        let backend = backend_with(vec![GrayImage::new(60, 40)]);
        backend.set_min_similarity(0.9).await.unwrap();
        assert!(!backend.exists(SQUARE).await.unwrap());

        backend.screen(0).unwrap().show(two_square_frame());
        backend
            .wait_until_contains(SQUARE, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(backend.image_count(SQUARE).await.unwrap(), 2);
    }
}
