//! Download module for media materialization.
//!
//! This module provides:
//! - Retry policy with exponential backoff
//! - Direct file downloads through part files
//! - Video materialization (yt-dlp or plain HTTP)
//! - Bounded-concurrency scheduling
//! - Run statistics

pub mod fetch;
pub mod media;
pub mod retry;
pub mod scheduler;
pub mod state;
pub mod video;

pub use fetch::{MediaBody, MediaFetcher};
pub use media::download_direct;
pub use retry::{retry_with_backoff, RetryDecision, RetryPolicy};
pub use scheduler::{DownloadScheduler, ItemOutcome, Submission, DEFAULT_MAX_CONCURRENCY};
pub use state::RunSummary;
pub use video::{HttpMaterializer, VideoMaterializer, YtDlpMaterializer};
