//! Raw media fetching abstraction.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;

/// A response body being streamed from the media CDN.
pub struct MediaBody {
    /// Declared `Content-Type`, without parameters, lowercased.
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub stream: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for MediaBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Plain byte-stream GET of a media URL.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<MediaBody>;
}

/// Normalize a `Content-Type` header value: drop parameters, lowercase.
pub fn normalize_content_type(raw: &str) -> Option<String> {
    let essence = raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if essence.is_empty() {
        None
    } else {
        Some(essence)
    }
}
