//! Video backend selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How video references are turned into local files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoBackend {
    /// Hand the reference to the external `yt-dlp` tool (default).
    #[default]
    YtDlp,
    /// Stream the selected mp4 variant directly.
    Http,
}

impl fmt::Display for VideoBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoBackend::YtDlp => write!(f, "yt-dlp"),
            VideoBackend::Http => write!(f, "http"),
        }
    }
}

impl FromStr for VideoBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yt-dlp" | "ytdlp" => Ok(VideoBackend::YtDlp),
            "http" => Ok(VideoBackend::Http),
            _ => Err(format!("Unknown video backend: {}", s)),
        }
    }
}
