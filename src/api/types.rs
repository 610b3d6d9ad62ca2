//! API response type definitions.

use serde::Deserialize;

/// One page of the timeline endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelinePageResponse {
    #[serde(default)]
    pub entries: Vec<RawEntry>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    /// Explicit continuation flag; when absent it is derived from `next_cursor`.
    #[serde(default)]
    pub has_more: Option<bool>,
}

/// A raw timeline entry, passed through untouched until extraction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    #[serde(default)]
    pub entry_id: Option<String>,
    #[serde(default)]
    pub content: EntryContent,
}

/// Entry content wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryContent {
    #[serde(default)]
    pub entry_type: Option<String>,
    #[serde(default)]
    pub item_content: Option<ItemContent>,
}

/// Item content holding the post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemContent {
    #[serde(default)]
    pub tweet_results: Option<PostResults>,
}

/// Post lookup result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostResults {
    #[serde(default)]
    pub result: Option<PostResult>,
}

/// A post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostResult {
    #[serde(default)]
    pub rest_id: Option<String>,
    #[serde(default)]
    pub legacy: Option<PostLegacy>,
}

/// Post body: timestamp, text and attached media.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostLegacy {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub extended_entities: Option<ExtendedEntities>,
}

/// Media container on a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtendedEntities {
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

/// One media attachment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaEntity {
    #[serde(default)]
    pub id_str: String,
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub media_url_https: Option<String>,
    #[serde(default)]
    pub expanded_url: Option<String>,
    #[serde(default)]
    pub video_info: Option<VideoInfo>,
}

/// Video stream variants.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub variants: Vec<VideoVariant>,
}

/// A single encoded rendition of a video.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoVariant {
    pub content_type: String,
    #[serde(default)]
    pub bitrate: Option<u64>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_with_media() {
        let json = r#"{
            "entries": [{
                "entryId": "tweet-1",
                "content": {
                    "entryType": "TimelineTimelineItem",
                    "itemContent": {"tweet_results": {"result": {
                        "rest_id": "1",
                        "legacy": {
                            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
                            "full_text": "hello",
                            "extended_entities": {"media": [{
                                "id_str": "100",
                                "type": "photo",
                                "media_url_https": "https://cdn.example.com/100.jpg"
                            }]}
                        }
                    }}}
                }
            }],
            "next_cursor": "abc"
        }"#;

        let page: TimelinePageResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
        assert_eq!(page.has_more, None);

        let legacy = page.entries[0]
            .content
            .item_content
            .as_ref()
            .and_then(|c| c.tweet_results.as_ref())
            .and_then(|r| r.result.as_ref())
            .and_then(|r| r.legacy.as_ref())
            .unwrap();
        let media = &legacy.extended_entities.as_ref().unwrap().media[0];
        assert_eq!(media.id_str, "100");
        assert_eq!(media.media_type, "photo");
    }

    #[test]
    fn test_parse_sparse_page() {
        let page: TimelinePageResponse =
            serde_json::from_str(r#"{"entries": [{"content": {}}], "next_cursor": null}"#)
                .unwrap();
        assert_eq!(page.entries.len(), 1);
        assert!(page.entries[0].content.item_content.is_none());
        assert!(page.next_cursor.is_none());
    }
}
