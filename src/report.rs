//! Runs a command-line operation and formats its result

use serde::Serialize;
use std::fmt;

use crate::args::Command;
use crate::backend::MatchBackend;
use crate::vision::{MatchOptions, TargetMap, VisionOperations, VisionResult};

/// Result of one operation, printable as text or JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Report {
    Done,
    Count(usize),
    Found(bool),
    Winner(String),
    Counts(TargetMap<usize>),
    Presence(TargetMap<bool>),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Done => write!(f, "✅ Done"),
            Report::Count(count) => write!(f, "🔢 {}", count),
            Report::Found(found) => write!(f, "{}", if *found { "✅ Found" } else { "❌ Not found" }),
            Report::Winner(target) => write!(f, "✅ {}", target),
            Report::Counts(counts) => {
                for (target, count) in counts.iter() {
                    writeln!(f, "🔢 {}: {}", target, count)?;
                }
                Ok(())
            }
            Report::Presence(found) => {
                for (target, seen) in found.iter() {
                    let mark = if *seen { "✅" } else { "❌" };
                    writeln!(f, "{} {}", mark, target)?;
                }
                Ok(())
            }
        }
    }
}

pub async fn execute<B: MatchBackend>(
    operations: &VisionOperations<B>,
    command: &Command,
    options: &MatchOptions,
) -> VisionResult<Report> {
    let report = match command {
        Command::WaitAppear(image) => {
            operations.wait_until_image_appear(image, options).await?;
            Report::Done
        }
        Command::WaitDisappear(image) => {
            operations.wait_until_image_disappear(image, options).await?;
            Report::Done
        }
        Command::Count(image) => Report::Count(operations.count_image(image, options).await?),
        Command::Exists(image) => Report::Found(operations.image_exists(image, options).await?),
        Command::CountMultiple(images) => {
            Report::Counts(operations.count_multiple_images(images, options).await?)
        }
        Command::MultipleExist(images) => {
            Report::Presence(operations.multiple_images_exist(images, options).await?)
        }
        Command::WaitOneOf(images) => {
            Report::Winner(operations.wait_one_of_multiple_images(images, options).await?)
        }
        Command::WaitAll(images) => {
            operations.wait_multiple_images(images, options).await?;
            Report::Done
        }
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryFrameSource, TemplateBackend};
    use crate::template_matching::matcher::tests::{square_template, stamp};
    use crate::vision::{MatchConfig, VisionSession};
    use image::GrayImage;

    async fn session() -> VisionSession<TemplateBackend<MemoryFrameSource>> {
        let mut frame = GrayImage::new(60, 40);
        stamp(&mut frame, &square_template(), 2, 2);
        stamp(&mut frame, &square_template(), 30, 20);

        let backend = TemplateBackend::new(vec![MemoryFrameSource::new("screen-0", frame)])
            .with_capture_dir(std::env::temp_dir().join("screen-vision-run-tests"));
        backend.register_template("square", square_template());
        backend.register_template("blank", GrayImage::from_pixel(8, 8, image::Luma([200])));

        let config = MatchConfig {
            similarity: 0.9,
            highlight: false,
            ..MatchConfig::default()
        };
        VisionSession::start(backend, config).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_count_and_presence() {
        let session = session().await;
        let ops = session.operations();
        let options = MatchOptions::new();

        let count = execute(ops, &Command::Count("square".to_string()), &options)
            .await
            .unwrap();
        assert_eq!(count, Report::Count(2));

        let presence = execute(
            ops,
            &Command::MultipleExist(vec!["square".to_string(), "blank".to_string()]),
            &options,
        )
        .await
        .unwrap();
        assert_eq!(
            serde_json::to_string(&presence).unwrap(),
            r#"{"kind":"presence","value":{"square":true,"blank":false}}"#
        );
        assert_eq!(presence.to_string(), "✅ square\n❌ blank\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_roi_restricts_count() {
        let session = session().await;
        let ops = session.operations();
        let options = MatchOptions::new().roi(crate::backend::Region::new(25, 15, 20, 20));

        let count = execute(ops, &Command::Count("square".to_string()), &options)
            .await
            .unwrap();

        assert_eq!(count, Report::Count(1));
        assert_eq!(ops.backend().roi(), None, "ROI is reset after the operation");
        assert_eq!(ops.backend().similarity(), 0.9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_wait_all_failure() {
        let session = session().await;
        let ops = session.operations();
        let err = execute(
            ops,
            &Command::WaitAll(vec!["square".to_string(), "blank".to_string()]),
            &MatchOptions::new().timeout(1.0),
        )
        .await
        .unwrap_err();

        assert_eq!(err.missing_targets(), &["blank".to_string()][..]);
    }
}
