use log::LevelFilter;
use screen_vision_run::args::{Args, ParseOutcome};
use screen_vision_run::backend::{FileFrameSource, TemplateBackend};
use screen_vision_run::report::{self, Report};
use screen_vision_run::vision::{MatchConfig, VisionResult, VisionSession};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(ParseOutcome::Exit) => return ExitCode::SUCCESS,
        Err(ParseOutcome::Invalid(message)) => {
            eprintln!("❌ {}", message);
            return ExitCode::from(2);
        }
    };

    let mut logger = env_logger::Builder::from_default_env();
    if args.debug_mode {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    // Operations share one non-thread-safe backend; a single-threaded runtime is enough
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&args)) {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("❌ Failed to encode result: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{}", report.to_string().trim_end());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> VisionResult<Report> {
    let config = MatchConfig::load(&args.overrides)?;
    log::debug!("Effective config: {:?}", config);

    let screens: Vec<FileFrameSource> = args.screens.iter().map(FileFrameSource::new).collect();
    let session = VisionSession::start(TemplateBackend::new(screens), config).await?;

    let result = report::execute(session.operations(), &args.command, &args.options).await;
    session.close().await;
    result
}
