//! Direct media file downloading.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::download::fetch::{MediaBody, MediaFetcher};
use crate::error::{Error, Result};
use crate::fs::{extension_for_content_type, part_filename};
use crate::media::MediaKind;

/// Content type some CDNs send for any binary payload.
const OCTET_STREAM: &str = "application/octet-stream";

/// Download `url` into `<target_dir>/<stem>.<ext>`.
///
/// Bytes are streamed into a hidden part file which is renamed into place
/// only after a complete, non-empty transfer. The part file is removed on
/// every failure path.
pub async fn download_direct(
    fetcher: &dyn MediaFetcher,
    url: &str,
    target_dir: &Path,
    stem: &str,
    kind: MediaKind,
) -> Result<PathBuf> {
    let body = fetcher.fetch(url).await?;
    let extension = extension_for(kind, body.content_type.as_deref())?;

    let part_path = target_dir.join(part_filename(stem));
    let output_path = target_dir.join(format!("{}.{}", stem, extension));

    if let Err(e) = write_body(body, &part_path).await {
        discard(&part_path).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&part_path, &output_path).await {
        discard(&part_path).await;
        return Err(e.into());
    }

    Ok(output_path)
}

/// Pick the file extension from the declared content type.
///
/// A missing or generic binary type falls back to the kind's usual
/// container; a type of the wrong family is rejected.
fn extension_for(kind: MediaKind, content_type: Option<&str>) -> Result<String> {
    let default = match kind {
        MediaKind::Photo => "jpg",
        MediaKind::Video => "mp4",
    };

    let Some(content_type) = content_type.filter(|ct| *ct != OCTET_STREAM) else {
        tracing::debug!("No usable content type, defaulting to .{}", default);
        return Ok(default.to_string());
    };

    let family = match kind {
        MediaKind::Photo => "image/",
        MediaKind::Video => "video/",
    };
    if !content_type.starts_with(family) {
        return Err(Error::CorruptContent(format!(
            "expected {}* but server sent {}",
            family, content_type
        )));
    }

    Ok(extension_for_content_type(content_type).unwrap_or_else(|| default.to_string()))
}

/// Stream the body to `path`, returning the number of bytes written.
async fn write_body(body: MediaBody, path: &Path) -> Result<u64> {
    let MediaBody {
        content_length,
        mut stream,
        ..
    } = body;

    let mut file = File::create(path).await?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;

    if downloaded == 0 {
        return Err(Error::CorruptContent("server returned an empty body".into()));
    }

    if let Some(expected) = content_length {
        if expected != downloaded {
            return Err(Error::CorruptContent(format!(
                "truncated transfer: {} of {} bytes",
                downloaded, expected
            )));
        }
    }

    Ok(downloaded)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove partial file {}: {}", path.display(), e);
        }
    }
}
