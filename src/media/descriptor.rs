//! Media descriptor representation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::naming::sanitize_filename;

/// Kind of media content. Decided once at extraction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Get the folder name for this media kind.
    pub fn folder_name(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photos",
            MediaKind::Video => "videos",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Download state of one descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadStatus {
    #[default]
    Pending,
    Downloading,
    Succeeded,
    Failed(String),
}

impl DownloadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Succeeded | DownloadStatus::Failed(_))
    }

    fn rank(&self) -> u8 {
        match self {
            DownloadStatus::Pending => 0,
            DownloadStatus::Downloading => 1,
            DownloadStatus::Succeeded | DownloadStatus::Failed(_) => 2,
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Pending => write!(f, "pending"),
            DownloadStatus::Downloading => write!(f, "downloading"),
            DownloadStatus::Succeeded => write!(f, "succeeded"),
            DownloadStatus::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// One discovered media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    /// Stable attachment id, unique within the profile's media set.
    pub id: String,

    pub kind: MediaKind,

    /// Remote location. For videos this may be an opaque page reference.
    pub source_url: String,

    /// Timestamp of the originating post.
    pub posted_at: Option<DateTime<Utc>>,

    /// Id of the originating post.
    pub post_id: Option<String>,

    /// Text of the originating post.
    pub text: Option<String>,

    status: DownloadStatus,
}

impl MediaDescriptor {
    /// Create a pending descriptor.
    ///
    /// The id becomes the file name, so it must be a single safe path
    /// component: no separators, no `..`, no characters that would need
    /// replacing on disk.
    pub fn new(id: impl Into<String>, kind: MediaKind, source_url: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::Api("media descriptor without an id".into()));
        }
        if sanitize_filename(&id)? != id {
            return Err(Error::InvalidFilename(format!(
                "Media id '{}' is not usable as a file name",
                id
            )));
        }

        Ok(Self {
            id,
            kind,
            source_url: source_url.into(),
            posted_at: None,
            post_id: None,
            text: None,
            status: DownloadStatus::Pending,
        })
    }

    pub fn status(&self) -> &DownloadStatus {
        &self.status
    }

    pub fn mark_downloading(&mut self) -> Result<()> {
        self.advance(DownloadStatus::Downloading)
    }

    pub fn mark_succeeded(&mut self) -> Result<()> {
        self.advance(DownloadStatus::Succeeded)
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<()> {
        self.advance(DownloadStatus::Failed(reason.into()))
    }

    /// Move the status forward. Terminal states are final.
    fn advance(&mut self, next: DownloadStatus) -> Result<()> {
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            return Err(Error::InvalidTransition(format!(
                "{} {}: {} -> {}",
                self.kind, self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Base filename (without extension) for this item.
    pub fn file_stem(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo() -> MediaDescriptor {
        MediaDescriptor::new("100", MediaKind::Photo, "https://cdn.example.com/100.jpg").unwrap()
    }

    #[test]
    fn test_rejects_empty_id() {
        assert!(MediaDescriptor::new("", MediaKind::Photo, "x").is_err());
        assert!(MediaDescriptor::new("  ", MediaKind::Video, "x").is_err());
    }

    #[test]
    fn test_rejects_ids_unsafe_as_file_names() {
        for id in ["../escaped", "../../outside", "a/b", "a\\b", ".hidden", "x:y", "nul\0"] {
            assert!(
                matches!(
                    MediaDescriptor::new(id, MediaKind::Video, "x"),
                    Err(Error::InvalidFilename(_))
                ),
                "accepted {:?}",
                id
            );
        }
        assert_eq!(
            MediaDescriptor::new("1234567890_ab-c", MediaKind::Photo, "x").unwrap().file_stem(),
            "1234567890_ab-c"
        );
    }

    #[test]
    fn test_forward_transitions() {
        let mut item = photo();
        assert_eq!(item.status(), &DownloadStatus::Pending);
        item.mark_downloading().unwrap();
        item.mark_succeeded().unwrap();
        assert_eq!(item.status(), &DownloadStatus::Succeeded);
    }

    #[test]
    fn test_terminal_states_do_not_regress() {
        let mut item = photo();
        item.mark_downloading().unwrap();
        item.mark_failed("HTTP 404").unwrap();

        assert!(item.mark_downloading().is_err());
        assert!(item.mark_succeeded().is_err());
        assert_eq!(item.status(), &DownloadStatus::Failed("HTTP 404".into()));
    }

    #[test]
    fn test_pending_can_fail_directly() {
        let mut item = photo();
        item.mark_failed("cancelled").unwrap();
        assert!(item.status().is_terminal());
    }

    #[test]
    fn test_downloading_twice_is_rejected() {
        let mut item = photo();
        item.mark_downloading().unwrap();
        assert!(item.mark_downloading().is_err());
    }

    #[test]
    fn test_folder_names() {
        assert_eq!(MediaKind::Photo.folder_name(), "photos");
        assert_eq!(MediaKind::Video.folder_name(), "videos");
    }
}
