//! Timeline Downloader - fetch every photo and video a profile has posted
//!
//! This library walks a profile's media timeline page by page, extracts the
//! photo and video attachments, downloads them with bounded concurrency,
//! and keeps a `data.json` manifest of everything that landed on disk.
//!
//! # Features
//!
//! - Cursor pagination with resume from the last saved cursor
//! - Deduplication by media id across pages and runs
//! - Concurrent downloads with retry and exponential backoff
//! - Videos via `yt-dlp` or direct HTTP
//! - Atomic manifest writes; no partial files survive a failure
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use timeline_downloader::{Config, PipelineOrchestrator, TimelineApi, YtDlpMaterializer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let api = Arc::new(TimelineApi::new(
//!         config.api.api_key.clone(),
//!         config.api.api_host.clone(),
//!         &config.api.user_agent,
//!         config.api.page_size,
//!     )?);
//!
//!     let mut pipeline = PipelineOrchestrator::new(
//!         api.clone(),
//!         api,
//!         Arc::new(YtDlpMaterializer::default()),
//!         config.pipeline_settings(),
//!     );
//!     let report = pipeline.run("44196397", CancellationToken::new()).await?;
//!     println!("{}: {} file(s)", report.status, report.summary.succeeded());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod manifest;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod timeline;

// Re-exports for convenience
pub use api::TimelineApi;
pub use config::{Config, VideoBackend};
pub use download::{
    DownloadScheduler, HttpMaterializer, MediaFetcher, RetryPolicy, RunSummary,
    VideoMaterializer, YtDlpMaterializer,
};
pub use error::{Error, Result};
pub use manifest::{MetadataStore, RunManifest};
pub use media::{MediaDescriptor, MediaExtractor, MediaKind};
pub use pipeline::{PipelineOrchestrator, PipelineSettings, RunReport, RunStatus};
pub use timeline::{TimelineCursor, TimelinePaginator, TimelineSource};
