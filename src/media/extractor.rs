//! Timeline entry parsing and per-run deduplication.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::api::types::{MediaEntity, PostResult, RawEntry, VideoVariant};
use crate::media::descriptor::{MediaDescriptor, MediaKind};

/// Entry type that carries a post.
const TIMELINE_ITEM: &str = "TimelineTimelineItem";

/// Timestamp format of `created_at`, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Turns raw timeline entries into unique media descriptors.
#[derive(Debug, Default)]
pub struct MediaExtractor {
    seen: HashSet<String>,
    duplicates: u64,
}

impl MediaExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor that already knows about previously recorded ids.
    pub fn with_seen<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seen: ids.into_iter().map(Into::into).collect(),
            duplicates: 0,
        }
    }

    /// Extract new descriptors from a page of entries, in entry order.
    ///
    /// Ids already seen in this run (or seeded from a prior manifest) are
    /// dropped and counted as duplicates.
    pub fn extract(&mut self, entries: &[RawEntry]) -> Vec<MediaDescriptor> {
        let mut out = Vec::new();

        for entry in entries {
            for descriptor in parse_entry(entry) {
                if self.seen.insert(descriptor.id.clone()) {
                    out.push(descriptor);
                } else {
                    tracing::debug!("Skipping duplicate media ID: {}", descriptor.id);
                    self.duplicates += 1;
                }
            }
        }

        out
    }

    /// Number of duplicate attachments dropped so far.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Number of distinct ids known to this extractor.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

/// Parse every media attachment of one entry.
fn parse_entry(entry: &RawEntry) -> Vec<MediaDescriptor> {
    if entry.content.entry_type.as_deref() != Some(TIMELINE_ITEM) {
        return Vec::new();
    }

    let Some(post) = entry
        .content
        .item_content
        .as_ref()
        .and_then(|c| c.tweet_results.as_ref())
        .and_then(|r| r.result.as_ref())
    else {
        return Vec::new();
    };

    let Some(legacy) = post.legacy.as_ref() else {
        return Vec::new();
    };

    let media = match legacy.extended_entities.as_ref() {
        Some(entities) => &entities.media,
        None => return Vec::new(),
    };

    let posted_at = legacy.created_at.as_deref().and_then(parse_created_at);

    media
        .iter()
        .filter_map(|m| parse_media(m, post, posted_at))
        .collect()
}

/// Classify one attachment by its declared type and pick its source.
fn parse_media(
    media: &MediaEntity,
    post: &PostResult,
    posted_at: Option<DateTime<Utc>>,
) -> Option<MediaDescriptor> {
    let (kind, source) = match media.media_type.as_str() {
        "photo" => (MediaKind::Photo, media.media_url_https.clone()),
        "video" | "animated_gif" => (MediaKind::Video, select_video_source(media)),
        other => {
            tracing::debug!("Ignoring media {} of unsupported type '{}'", media.id_str, other);
            return None;
        }
    };

    let Some(source) = source.filter(|s| !s.is_empty()) else {
        tracing::warn!("Media {} has no usable source URL", media.id_str);
        return None;
    };

    let mut descriptor = match MediaDescriptor::new(media.id_str.clone(), kind, source) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("Skipping attachment: {}", e);
            return None;
        }
    };

    descriptor.posted_at = posted_at;
    descriptor.post_id = post.rest_id.clone();
    descriptor.text = post.legacy.as_ref().and_then(|l| l.full_text.clone());

    Some(descriptor)
}

/// Best mp4 variant by bitrate, else the attachment's page URL.
fn select_video_source(media: &MediaEntity) -> Option<String> {
    let best = media
        .video_info
        .as_ref()
        .and_then(|info| best_mp4_variant(&info.variants))
        .map(|v| v.url.clone());

    best.or_else(|| media.expanded_url.clone())
}

fn best_mp4_variant(variants: &[VideoVariant]) -> Option<&VideoVariant> {
    variants
        .iter()
        .filter(|v| v.content_type == "video/mp4")
        .max_by_key(|v| v.bitrate.unwrap_or(0))
}

fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, CREATED_AT_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(json: &str) -> RawEntry {
        serde_json::from_str(json).unwrap()
    }

    fn post_entry(post_id: &str, media: &str) -> RawEntry {
        entry(&format!(
            r#"{{
                "entryId": "tweet-{post_id}",
                "content": {{
                    "entryType": "TimelineTimelineItem",
                    "itemContent": {{"tweet_results": {{"result": {{
                        "rest_id": "{post_id}",
                        "legacy": {{
                            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
                            "full_text": "post {post_id}",
                            "extended_entities": {{"media": [{media}]}}
                        }}
                    }}}}}}
                }}
            }}"#
        ))
    }

    fn photo(id: &str) -> String {
        format!(
            r#"{{"id_str": "{id}", "type": "photo", "media_url_https": "https://cdn.example.com/{id}.jpg"}}"#
        )
    }

    #[test]
    fn test_extracts_photo_with_post_metadata() {
        let mut extractor = MediaExtractor::new();
        let items = extractor.extract(&[post_entry("1", &photo("100"))]);

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.id, "100");
        assert_eq!(item.kind, MediaKind::Photo);
        assert_eq!(item.source_url, "https://cdn.example.com/100.jpg");
        assert_eq!(item.post_id.as_deref(), Some("1"));
        assert_eq!(item.text.as_deref(), Some("post 1"));
        assert_eq!(
            item.posted_at,
            Some(Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap())
        );
    }

    #[test]
    fn test_video_picks_highest_bitrate_mp4() {
        let media = r#"{
            "id_str": "200", "type": "video",
            "expanded_url": "https://example.com/status/2/video/1",
            "video_info": {"variants": [
                {"content_type": "application/x-mpegURL", "url": "https://video.example.com/pl.m3u8"},
                {"content_type": "video/mp4", "bitrate": 832000, "url": "https://video.example.com/low.mp4"},
                {"content_type": "video/mp4", "bitrate": 2176000, "url": "https://video.example.com/high.mp4"}
            ]}
        }"#;
        let mut extractor = MediaExtractor::new();
        let items = extractor.extract(&[post_entry("2", media)]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, MediaKind::Video);
        assert_eq!(items[0].source_url, "https://video.example.com/high.mp4");
    }

    #[test]
    fn test_video_without_variants_uses_reference() {
        let media = r#"{"id_str": "201", "type": "animated_gif",
            "expanded_url": "https://example.com/status/2/video/1"}"#;
        let mut extractor = MediaExtractor::new();
        let items = extractor.extract(&[post_entry("2", media)]);

        assert_eq!(items[0].kind, MediaKind::Video);
        assert_eq!(items[0].source_url, "https://example.com/status/2/video/1");
    }

    #[test]
    fn test_classifies_by_declared_type_not_url() {
        let media = r#"{"id_str": "300", "type": "photo",
            "media_url_https": "https://cdn.example.com/300.mp4"}"#;
        let mut extractor = MediaExtractor::new();
        let items = extractor.extract(&[post_entry("3", media)]);
        assert_eq!(items[0].kind, MediaKind::Photo);
    }

    #[test]
    fn test_all_attachments_are_extracted() {
        let media = format!("{},{}", photo("401"), photo("402"));
        let mut extractor = MediaExtractor::new();
        let ids: Vec<_> = extractor
            .extract(&[post_entry("4", &media)])
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["401", "402"]);
    }

    #[test]
    fn test_dedup_across_pages() {
        let mut extractor = MediaExtractor::new();
        let page1 = vec![post_entry("1", &photo("100")), post_entry("2", &photo("101"))];
        let page2 = vec![post_entry("2", &photo("101")), post_entry("3", &photo("102"))];

        let first: Vec<_> = extractor.extract(&page1).into_iter().map(|d| d.id).collect();
        let second: Vec<_> = extractor.extract(&page2).into_iter().map(|d| d.id).collect();

        assert_eq!(first, vec!["100", "101"]);
        assert_eq!(second, vec!["102"]);
        assert_eq!(extractor.duplicates(), 1);
    }

    #[test]
    fn test_seeded_ids_are_skipped() {
        let mut extractor = MediaExtractor::with_seen(["100"]);
        assert!(extractor.extract(&[post_entry("1", &photo("100"))]).is_empty());
        assert_eq!(extractor.duplicates(), 1);
        assert_eq!(extractor.seen_count(), 1);
    }

    #[test]
    fn test_entries_without_media_pass_over() {
        let mut extractor = MediaExtractor::new();
        let cursor_entry = entry(r#"{"entryId": "cursor-bottom", "content": {"entryType": "TimelineTimelineCursor"}}"#);
        let text_only = entry(
            r#"{"content": {"entryType": "TimelineTimelineItem",
                "itemContent": {"tweet_results": {"result": {"rest_id": "9", "legacy": {"full_text": "hi"}}}}}}"#,
        );
        assert!(extractor.extract(&[cursor_entry, text_only]).is_empty());
        assert_eq!(extractor.duplicates(), 0);
        assert_eq!(extractor.seen_count(), 0);
    }

    #[test]
    fn test_skips_unknown_type_and_missing_id() {
        let media = r#"{"id_str": "500", "type": "audio", "media_url_https": "https://x/y"},
                       {"id_str": "", "type": "photo", "media_url_https": "https://x/z.jpg"},
                       {"id_str": "501", "type": "photo"}"#;
        let mut extractor = MediaExtractor::new();
        assert!(extractor.extract(&[post_entry("5", media)]).is_empty());
    }

    #[test]
    fn test_skips_ids_that_would_escape_the_kind_folder() {
        let media = format!("{}, {}, {}", photo("../escaped"), photo("a\\\\b"), photo("600"));
        let mut extractor = MediaExtractor::new();
        let items = extractor.extract(&[post_entry("6", &media)]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "600");
    }

    #[test]
    fn test_unparsable_created_at() {
        assert!(parse_created_at("yesterday").is_none());
    }
}
