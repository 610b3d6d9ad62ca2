//! Timeline Downloader - CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use timeline_downloader::{
    api::TimelineApi,
    cli::{handle_interrupt, Args, Interrupt},
    config::{validate_config, validate_profile_id, Config, VideoBackend},
    download::{HttpMaterializer, VideoMaterializer, YtDlpMaterializer},
    error::{exit_codes, Error, Result},
    output::{
        create_item_bar, print_banner, print_config_summary, print_error, print_info,
        print_run_stats, print_success, print_summary, print_warning,
    },
    pipeline::{PipelineOrchestrator, RunStatus},
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(RunStatus::Completed) | Ok(RunStatus::CompletedWithFailures) => {
            ExitCode::from(exit_codes::SUCCESS as u8)
        }
        Ok(RunStatus::Cancelled) => ExitCode::from(exit_codes::ABORT as u8),
        Ok(RunStatus::Failed) => ExitCode::from(exit_codes::API_ERROR as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::MissingConfig(_)
                | Error::TomlParse(_) => ExitCode::from(exit_codes::CONFIG_ERROR as u8),
                Error::Unauthorized(_)
                | Error::Forbidden(_)
                | Error::Api(_)
                | Error::Manifest(_)
                | Error::Http(_) => ExitCode::from(exit_codes::API_ERROR as u8),
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

async fn run() -> Result<RunStatus> {
    // Pick up API_KEY / API_HOST from a local .env file
    let dotenv = dotenvy::dotenv();

    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    if let Err(e) = dotenv {
        if !e.not_found() {
            print_warning(&format!("Could not read .env file: {}", e));
        }
    }

    print_banner();

    // Load configuration
    let mut config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        tracing::debug!(
            "Configuration file not found: {}, using defaults",
            args.config.display()
        );
        Config::default()
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    // Validate configuration
    validate_config(&config)?;
    let profile = validate_profile_id(&args.profile)?.to_string();

    print_config_summary(
        &profile,
        &config.output_directory().display().to_string(),
        config.options.max_concurrency,
        &config.options.video_backend.to_string(),
    );

    let api = Arc::new(TimelineApi::new(
        config.api.api_key.clone(),
        config.api.api_host.clone(),
        &config.api.user_agent,
        config.api.page_size,
    )?);

    let materializer: Arc<dyn VideoMaterializer> = match config.options.video_backend {
        VideoBackend::YtDlp => Arc::new(YtDlpMaterializer::default()),
        VideoBackend::Http => Arc::new(HttpMaterializer::new(api.clone())),
    };

    // First Ctrl-C stops dispatching; in-flight downloads finish and the
    // manifest is written. A second one exits immediately.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                match handle_interrupt(&cancel) {
                    Interrupt::Cancel => print_warning(
                        "Interrupted, finishing in-flight downloads (Ctrl-C again to force quit)...",
                    ),
                    Interrupt::ForceQuit => {
                        print_error("Interrupted again, exiting without saving");
                        std::process::exit(exit_codes::ABORT);
                    }
                }
            }
        }
    });

    let mut pipeline = PipelineOrchestrator::new(
        api.clone(),
        api,
        materializer,
        config.pipeline_settings(),
    );
    if config.options.show_progress {
        pipeline = pipeline.with_progress(create_item_bar("Downloading"));
    }

    print_info(&format!("Fetching timeline of {}...", profile));
    let report = pipeline.run(&profile, cancel).await?;

    print_run_stats(&profile, &report);
    print_summary(&report.summary);

    match report.status {
        RunStatus::Completed => print_success("All media downloaded"),
        RunStatus::CompletedWithFailures => print_warning(&format!(
            "{} item(s) failed; run again to retry them",
            report.summary.failed
        )),
        RunStatus::Cancelled => print_warning("Run cancelled; progress saved"),
        RunStatus::Failed => {
            if let Some(e) = &report.error {
                print_error(&format!("Timeline could not be fetched: {}", e));
            }
        }
    }

    Ok(report.status)
}
