//! Output directory layout.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::naming::{is_final_file_for, is_part_file_for, sanitize_filename};
use crate::media::MediaKind;

/// Manifest filename inside the profile folder.
pub const MANIFEST_FILENAME: &str = "data.json";

/// `<root>/<profile>/{photos,videos,data.json}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    profile_dir: PathBuf,
}

impl OutputLayout {
    /// Build the layout for a profile (with path traversal protection).
    pub fn new(output_root: &Path, profile: &str) -> Result<Self> {
        let folder = sanitize_filename(profile.trim())?;
        Ok(Self {
            profile_dir: output_root.join(folder),
        })
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    pub fn kind_dir(&self, kind: MediaKind) -> PathBuf {
        self.profile_dir.join(kind.folder_name())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.profile_dir.join(MANIFEST_FILENAME)
    }

    /// Create the profile folder and its media subfolders.
    pub async fn ensure(&self) -> Result<()> {
        for kind in [MediaKind::Photo, MediaKind::Video] {
            tokio::fs::create_dir_all(self.kind_dir(kind)).await?;
        }
        Ok(())
    }

    /// Path relative to the profile folder, as stored in the manifest.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.profile_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    /// Find a finished, non-empty `<stem>.<ext>` file for an item.
    pub async fn find_existing(&self, kind: MediaKind, stem: &str) -> Result<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(self.kind_dir(kind)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_final_file_for(name, stem) {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() && meta.len() > 0 {
                return Ok(Some(entry.path()));
            }
        }

        Ok(None)
    }

    /// Remove every partial or leftover artifact for an item.
    ///
    /// Used on failure paths so no truncated file survives under the item's name.
    pub async fn remove_artifacts(&self, kind: MediaKind, stem: &str) -> Result<usize> {
        let dir = self.kind_dir(kind);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if is_part_file_for(name, stem) || belongs_to(name, stem) {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if removed > 0 {
            tracing::debug!("Removed {} leftover file(s) for {}", removed, stem);
        }
        Ok(removed)
    }
}

/// `<stem>.<anything>`, including intermediate files of external tools.
fn belongs_to(filename: &str, stem: &str) -> bool {
    filename
        .strip_prefix(stem)
        .map(|rest| rest.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::naming::part_filename;

    #[test]
    fn test_layout_paths() {
        let layout = OutputLayout::new(Path::new("/downloads"), "someone").unwrap();
        assert_eq!(layout.profile_dir(), Path::new("/downloads/someone"));
        assert_eq!(
            layout.kind_dir(MediaKind::Photo),
            PathBuf::from("/downloads/someone/photos")
        );
        assert_eq!(
            layout.manifest_path(),
            PathBuf::from("/downloads/someone/data.json")
        );
        assert_eq!(
            layout.relative(Path::new("/downloads/someone/videos/1.mp4")),
            PathBuf::from("videos/1.mp4")
        );
    }

    #[test]
    fn test_layout_rejects_traversal() {
        assert!(OutputLayout::new(Path::new("/downloads"), "../etc").is_err());
        assert!(OutputLayout::new(Path::new("/downloads"), "").is_err());
    }

    #[tokio::test]
    async fn test_find_existing_and_remove_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "someone").unwrap();
        layout.ensure().await.unwrap();

        let photos = layout.kind_dir(MediaKind::Photo);
        std::fs::write(photos.join("100.jpg"), b"jpeg").unwrap();
        std::fs::write(photos.join("101.jpg"), b"").unwrap();
        std::fs::write(photos.join(part_filename("102")), b"half").unwrap();
        std::fs::write(photos.join("1020.jpg"), b"other").unwrap();

        assert_eq!(
            layout.find_existing(MediaKind::Photo, "100").await.unwrap(),
            Some(photos.join("100.jpg"))
        );
        assert_eq!(layout.find_existing(MediaKind::Photo, "101").await.unwrap(), None);
        assert_eq!(layout.find_existing(MediaKind::Photo, "102").await.unwrap(), None);

        assert_eq!(layout.remove_artifacts(MediaKind::Photo, "102").await.unwrap(), 1);
        assert!(photos.join("1020.jpg").exists());
        assert!(photos.join("100.jpg").exists());
    }
}
