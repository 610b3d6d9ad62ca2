//! Filename generation and validation.

use crate::error::{Error, Result};

/// Suffix of in-progress download files.
pub const PART_SUFFIX: &str = "part";

/// Validate and sanitize a filename by removing or replacing invalid characters.
///
/// Returns an error if the filename contains path traversal patterns.
pub fn sanitize_filename(name: &str) -> Result<String> {
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    // Hidden names would collide with our own part files.
    if sanitized.starts_with('.') {
        return Err(Error::InvalidFilename(format!(
            "Filename cannot start with a dot: '{}'",
            name
        )));
    }

    Ok(sanitized)
}

/// Name of the in-progress file for a media id.
pub fn part_filename(stem: &str) -> String {
    format!(".{}.{}.{}", stem, uuid::Uuid::new_v4().simple(), PART_SUFFIX)
}

/// Whether `filename` is an in-progress file belonging to `stem`.
pub fn is_part_file_for(filename: &str, stem: &str) -> bool {
    filename
        .strip_prefix('.')
        .and_then(|rest| rest.strip_prefix(stem))
        .map(|rest| rest.starts_with('.') && rest.ends_with(&format!(".{}", PART_SUFFIX)))
        .unwrap_or(false)
}

/// Whether `filename` is a finished artifact `<stem>.<ext>`.
pub fn is_final_file_for(filename: &str, stem: &str) -> bool {
    match filename.strip_prefix(stem).and_then(|rest| rest.strip_prefix('.')) {
        Some(ext) => !ext.is_empty() && !ext.contains('.') && ext != PART_SUFFIX,
        None => false,
    }
}

/// Convert a declared MIME type to a file extension.
///
/// Common media types map to their usual extension; anything else falls
/// back to `mime_guess`.
pub fn extension_for_content_type(content_type: &str) -> Option<String> {
    let ext = match content_type {
        // Images
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",

        // Videos
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",

        other => {
            return mime_guess::get_mime_extensions_str(other)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string());
        }
    };

    Some(ext.to_string())
}
