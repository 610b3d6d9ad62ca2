//! Command-line argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{Config, VideoBackend};

/// Profile timeline media downloader CLI.
#[derive(Parser, Debug)]
#[command(
    name = "timeline-downloader",
    version,
    about = "Download all photos and videos from a profile timeline",
    long_about = "A CLI tool to download every photo and video posted to a profile timeline.\n\n\
                  Files land in <directory>/<profile>/{photos,videos} next to a data.json manifest. \
                  Interrupted runs continue where they stopped."
)]
pub struct Args {
    /// Profile id to download from.
    pub profile: String,

    /// Base directory for downloads.
    #[arg(short = 'd', long = "directory")]
    pub output_directory: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Timeline API key.
    #[arg(long = "api-key", env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Timeline API host.
    #[arg(long = "api-host", env = "API_HOST")]
    pub api_host: Option<String>,

    /// Maximum number of concurrent downloads.
    #[arg(long, env = "MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Attempts per request, first try included.
    #[arg(long, env = "MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Stop after this many new media items.
    #[arg(short = 'n', long = "count")]
    pub count: Option<u64>,

    /// How videos are downloaded.
    #[arg(long, value_enum)]
    pub video_backend: Option<VideoBackendArg>,

    /// Ignore the saved cursor and walk the timeline from the top.
    #[arg(long)]
    pub restart: bool,

    /// Hide download progress information.
    #[arg(long, short)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

/// CLI video backend argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VideoBackendArg {
    /// Use the external yt-dlp tool.
    YtDlp,
    /// Download the best mp4 variant directly.
    Http,
}

impl From<VideoBackendArg> for VideoBackend {
    fn from(arg: VideoBackendArg) -> Self {
        match arg {
            VideoBackendArg::YtDlp => VideoBackend::YtDlp,
            VideoBackendArg::Http => VideoBackend::Http,
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        // Override API settings if provided
        if let Some(api_key) = &self.api_key {
            config.api.api_key = api_key.clone();
        }

        if let Some(api_host) = &self.api_host {
            config.api.api_host = api_host.clone();
        }

        // Override options if provided
        if let Some(dir) = &self.output_directory {
            config.options.output_directory = Some(dir.clone());
        }

        if let Some(max_concurrency) = self.max_concurrency {
            config.options.max_concurrency = max_concurrency;
        }

        if let Some(max_retries) = self.max_retries {
            config.options.max_retries = max_retries;
        }

        if let Some(count) = self.count {
            config.options.max_items = Some(count);
        }

        if let Some(backend) = self.video_backend {
            config.options.video_backend = backend.into();
        }

        // Boolean flags (only override if set to non-default)
        if self.restart {
            config.options.resume = false;
        }

        if self.quiet {
            config.options.show_progress = false;
        }
    }
}
