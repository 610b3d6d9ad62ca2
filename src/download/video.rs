//! Video materialization: turning a video reference into one local file.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::download::fetch::MediaFetcher;
use crate::download::media::download_direct;
use crate::error::{Error, Result};
use crate::media::MediaKind;

/// yt-dlp format selector: best mp4-compatible streams, merged.
const YT_DLP_FORMAT: &str = "bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4]/bv*+ba/b";

/// Resolves a video reference and writes exactly one complete file.
///
/// Implementations either return the final path or leave nothing behind
/// under `destination` (the path without extension).
#[async_trait]
pub trait VideoMaterializer: Send + Sync {
    async fn materialize(&self, source_url: &str, destination: &Path) -> Result<PathBuf>;
}

/// Materializes videos with the external `yt-dlp` tool.
#[derive(Debug, Clone)]
pub struct YtDlpMaterializer {
    program: PathBuf,
}

impl Default for YtDlpMaterializer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
        }
    }
}

impl YtDlpMaterializer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl VideoMaterializer for YtDlpMaterializer {
    async fn materialize(&self, source_url: &str, destination: &Path) -> Result<PathBuf> {
        let template = format!("{}.%(ext)s", destination.display());

        let mut command = Command::new(&self.program);
        // Own process group: a terminal Ctrl-C reaches only us, and in-flight
        // transfers keep running while the run winds down.
        #[cfg(unix)]
        command.process_group(0);

        let output = command
            .args([
                "--no-playlist",
                "--no-progress",
                "--no-warnings",
                "-f",
                YT_DLP_FORMAT,
                "--merge-output-format",
                "mp4",
                "--print",
                "after_move:filepath",
                "-o",
                template.as_str(),
                source_url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::ToolNotFound(self.program.display().to_string())
                } else {
                    Error::Materialize(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_yt_dlp_failure(output.status.code(), &stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| Error::Materialize("yt-dlp did not report an output file".into()))
    }
}

/// Map yt-dlp's error output onto the failure taxonomy.
fn classify_yt_dlp_failure(code: Option<i32>, stderr: &str) -> Error {
    let last_line = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string();
    let detail = format!("yt-dlp exited with {:?}: {}", code, last_line);

    if stderr.contains("HTTP Error 404") {
        Error::NotFound(detail)
    } else if stderr.contains("HTTP Error 403") {
        Error::Forbidden(detail)
    } else if stderr.contains("HTTP Error 429") {
        Error::RateLimited { retry_after: None }
    } else if stderr.contains("HTTP Error 5")
        || stderr.contains("timed out")
        || stderr.contains("Connection reset")
        || stderr.contains("Temporary failure")
    {
        Error::Transient(detail)
    } else {
        Error::Materialize(detail)
    }
}

/// Materializes videos whose source is already a direct file URL.
pub struct HttpMaterializer {
    fetcher: Arc<dyn MediaFetcher>,
}

impl HttpMaterializer {
    pub fn new(fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl VideoMaterializer for HttpMaterializer {
    async fn materialize(&self, source_url: &str, destination: &Path) -> Result<PathBuf> {
        let dir = destination
            .parent()
            .ok_or_else(|| Error::Materialize("Destination has no parent directory".into()))?;
        let stem = destination
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Materialize("Invalid path encoding for destination".into()))?;

        download_direct(self.fetcher.as_ref(), source_url, dir, stem, MediaKind::Video).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_yt_dlp_failure() {
        assert!(matches!(
            classify_yt_dlp_failure(Some(1), "ERROR: unable to download video data: HTTP Error 404: Not Found"),
            Error::NotFound(_)
        ));
        assert!(matches!(
            classify_yt_dlp_failure(Some(1), "ERROR: HTTP Error 403: Forbidden"),
            Error::Forbidden(_)
        ));
        assert!(matches!(
            classify_yt_dlp_failure(Some(1), "ERROR: HTTP Error 429: Too Many Requests"),
            Error::RateLimited { .. }
        ));
        assert!(matches!(
            classify_yt_dlp_failure(Some(1), "ERROR: HTTP Error 503: Service Unavailable"),
            Error::Transient(_)
        ));
        assert!(matches!(
            classify_yt_dlp_failure(Some(1), "ERROR: Unsupported URL: https://example.com"),
            Error::Materialize(_)
        ));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_yt_dlp_runs_in_its_own_process_group() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-yt-dlp");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             out=\"$(dirname \"$0\")/200.mp4\"\n\
             echo \"$$ $(cut -d' ' -f5 /proc/$$/stat)\" > \"$out\"\n\
             echo \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let path = YtDlpMaterializer::new(&script)
            .materialize("https://example.com/v", &dir.path().join("200"))
            .await
            .unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        let ids: Vec<&str> = written.split_whitespace().collect();
        assert_eq!(ids.len(), 2);
        // pid == pgid: the child leads its own group.
        assert_eq!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn test_missing_program_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let materializer = YtDlpMaterializer::new("/nonexistent/yt-dlp-binary");

        let err = materializer
            .materialize("https://example.com/v.mp4", &dir.path().join("200"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ToolNotFound(_)));
    }
}
