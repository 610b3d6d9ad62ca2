//! Durable record of successfully downloaded media.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::media::{DownloadStatus, MediaDescriptor, MediaKind};
use crate::timeline::TimelineCursor;

/// One downloaded media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub id: String,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub source_url: String,
    /// Path of the local file, relative to the manifest's folder.
    pub file: String,
}

/// On-disk manifest (`data.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub profile: String,
    /// Where the next run picks up; `None` once the timeline was walked to the end.
    #[serde(default)]
    pub cursor: Option<TimelineCursor>,
    #[serde(default)]
    pub items: Vec<ManifestRecord>,
}

/// Accumulates manifest records during a run and writes them atomically.
///
/// Only the coordinating task owns the store; it is never shared with
/// download workers.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    manifest: RunManifest,
    ids: HashSet<String>,
}

impl MetadataStore {
    /// Load the manifest at `path`, or start an empty one if none exists.
    ///
    /// A manifest that exists but cannot be read or parsed is an error: it
    /// is never silently replaced.
    pub async fn open(path: impl Into<PathBuf>, profile: &str) -> Result<Self> {
        let path = path.into();

        let manifest = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let manifest: RunManifest = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::Manifest(format!("{} is not a valid manifest: {}", path.display(), e))
                })?;
                if manifest.profile != profile {
                    return Err(Error::Manifest(format!(
                        "{} belongs to profile '{}', not '{}'",
                        path.display(),
                        manifest.profile,
                        profile
                    )));
                }
                tracing::debug!(
                    "Loaded manifest with {} item(s) from {}",
                    manifest.items.len(),
                    path.display()
                );
                manifest
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RunManifest {
                profile: profile.to_string(),
                ..Default::default()
            },
            Err(e) => {
                return Err(Error::Manifest(format!(
                    "Cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let ids = manifest.items.iter().map(|r| r.id.clone()).collect();

        Ok(Self { path, manifest, ids })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &RunManifest {
        &self.manifest
    }

    pub fn cursor(&self) -> Option<&TimelineCursor> {
        self.manifest.cursor.as_ref()
    }

    pub fn len(&self) -> usize {
        self.manifest.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.items.is_empty()
    }

    /// Ids already recorded, used to seed deduplication.
    pub fn seen_ids(&self) -> impl Iterator<Item = &str> {
        self.manifest.items.iter().map(|r| r.id.as_str())
    }

    /// Append a record for a succeeded item.
    ///
    /// Returns `Ok(false)` if the id is already recorded.
    pub fn record(&mut self, descriptor: &MediaDescriptor, file: &Path) -> Result<bool> {
        if descriptor.status() != &DownloadStatus::Succeeded {
            return Err(Error::InvalidTransition(format!(
                "cannot record {} {} with status {}",
                descriptor.kind,
                descriptor.id,
                descriptor.status()
            )));
        }

        if !self.ids.insert(descriptor.id.clone()) {
            return Ok(false);
        }

        self.manifest.items.push(ManifestRecord {
            id: descriptor.id.clone(),
            kind: descriptor.kind,
            post_id: descriptor.post_id.clone(),
            posted_at: descriptor.posted_at,
            text: descriptor.text.clone(),
            source_url: descriptor.source_url.clone(),
            file: self.relative_file(file),
        });

        Ok(true)
    }

    pub fn set_cursor(&mut self, cursor: Option<TimelineCursor>) {
        self.manifest.cursor = cursor;
    }

    /// Write the manifest atomically.
    ///
    /// The bytes go to a temporary file beside the manifest, are synced, and
    /// then renamed over it, so readers see either the old or the new
    /// manifest. Identical state produces identical bytes.
    pub async fn finalize(&self) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(&self.manifest)?;
        bytes.push(b'\n');

        let path = self.path.clone();
        let count = self.manifest.items.len();

        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| Error::Manifest(format!("manifest writer panicked: {}", e)))??;

        tracing::debug!("Wrote manifest with {} item(s) to {}", count, self.path.display());
        Ok(())
    }

    fn relative_file(&self, file: &Path) -> String {
        let relative = self
            .path
            .parent()
            .and_then(|dir| file.strip_prefix(dir).ok())
            .unwrap_or(file);

        // Forward slashes keep manifests portable.
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    Ok(())
}
