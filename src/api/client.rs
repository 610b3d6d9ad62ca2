//! Timeline API HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{header, Client, Response, StatusCode};
use url::Url;

use crate::api::types::TimelinePageResponse;
use crate::download::fetch::{normalize_content_type, MediaBody, MediaFetcher};
use crate::error::{Error, Result};
use crate::timeline::{TimelineCursor, TimelinePage, TimelineSource};

/// Timeline endpoint path.
const TIMELINE_PATH: &str = "timeline";

/// User agent sent with API and CDN requests.
pub const DEFAULT_USER_AGENT: &str = concat!("timeline-downloader/", env!("CARGO_PKG_VERSION"));

/// Timeline API client with key/host authentication.
pub struct TimelineApi {
    client: Client,
    api_key: String,
    api_host: String,
    base_url: Url,
    page_size: u32,
}

impl TimelineApi {
    /// Create a new API client.
    ///
    /// `api_host` is a bare host (`api.example.com`) or a full base URL
    /// (`http://127.0.0.1:8080`).
    pub fn new(api_key: String, api_host: String, user_agent: &str, page_size: u32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url_for(&api_host)?;

        Ok(Self {
            client,
            api_key,
            api_host: host_header_value(&base_url),
            base_url,
            page_size,
        })
    }

    /// Build the timeline URL for a profile and cursor.
    fn timeline_url(&self, profile: &str, cursor: Option<&TimelineCursor>) -> Result<Url> {
        let mut url = self.base_url.join(TIMELINE_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("user", profile);
            query.append_pair("count", &self.page_size.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor.as_str());
            }
        }
        Ok(url)
    }

    /// Make an authenticated GET request.
    async fn get(&self, url: Url) -> Result<Response> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = parse_retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, retry_after, &body))
    }
}

#[async_trait]
impl TimelineSource for TimelineApi {
    async fn fetch_page(
        &self,
        profile: &str,
        cursor: Option<&TimelineCursor>,
    ) -> Result<TimelinePage> {
        let url = self.timeline_url(profile, cursor)?;
        let response = self.get(url).await?;
        let text = response.text().await?;
        tracing::debug!("Timeline response length: {} bytes", text.len());

        let page: TimelinePageResponse = serde_json::from_str(&text).map_err(|e| {
            Error::Api(format!(
                "Failed to parse timeline: {} - Response: {}",
                e,
                &text[..floor_char_boundary(&text, 500)]
            ))
        })?;

        Ok(into_page(page))
    }
}

#[async_trait]
impl MediaFetcher for TimelineApi {
    /// Download a file from a CDN URL as a byte stream.
    async fn fetch(&self, url: &str) -> Result<MediaBody> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after = parse_retry_after(&response);
            return Err(error_for_status(status, retry_after, url));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(normalize_content_type);
        let content_length = response.content_length();
        let stream = response.bytes_stream().map_err(Error::from).boxed();

        Ok(MediaBody {
            content_type,
            content_length,
            stream,
        })
    }
}

/// Convert the wire page into the paginator's page type.
fn into_page(page: TimelinePageResponse) -> TimelinePage {
    let next_cursor = page
        .next_cursor
        .filter(|c| !c.is_empty())
        .map(TimelineCursor::new);
    let has_more = page.has_more.unwrap_or(next_cursor.is_some()) && next_cursor.is_some();

    TimelinePage {
        entries: page.entries,
        next_cursor,
        has_more,
    }
}

/// Map a non-success HTTP status to the error taxonomy.
pub fn error_for_status(status: StatusCode, retry_after: Option<Duration>, context: &str) -> Error {
    let detail = if context.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, context)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED => Error::Unauthorized(detail),
        StatusCode::FORBIDDEN => Error::Forbidden(detail),
        StatusCode::NOT_FOUND | StatusCode::GONE => Error::NotFound(detail),
        StatusCode::REQUEST_TIMEOUT => Error::Transient(detail),
        s if s.is_server_error() => Error::Transient(detail),
        _ => Error::Api(detail),
    }
}

/// Read a `Retry-After` header expressed in seconds.
fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn base_url_for(api_host: &str) -> Result<Url> {
    let raw = if api_host.starts_with("http://") || api_host.starts_with("https://") {
        api_host.to_string()
    } else {
        format!("https://{}", api_host)
    };
    let mut url = Url::parse(&raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn host_header_value(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(host: &str) -> TimelineApi {
        TimelineApi::new("key".into(), host.into(), DEFAULT_USER_AGENT, 20).unwrap()
    }

    #[test]
    fn test_timeline_url_bare_host() {
        let api = api("api.example.com");
        let url = api.timeline_url("12345", None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/timeline?user=12345&count=20"
        );
        assert_eq!(api.api_host, "api.example.com");
    }

    #[test]
    fn test_timeline_url_with_cursor_and_scheme() {
        let api = api("http://127.0.0.1:8080/v1");
        let cursor = TimelineCursor::new("DAAB+/=");
        let url = api.timeline_url("12345", Some(&cursor)).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/v1/timeline?user=12345&count=20&cursor=DAAB%2B%2F%3D"
        );
        assert_eq!(api.api_host, "127.0.0.1:8080");
    }

    #[test]
    fn test_error_for_status() {
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(5)), ""),
            Error::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(5)
        ));
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, None, ""),
            Error::Unauthorized(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, None, "x"),
            Error::NotFound(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, None, ""),
            Error::Transient(_)
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_REQUEST, None, ""),
            Error::Api(_)
        ));
    }

    #[test]
    fn test_into_page_has_more() {
        let page = into_page(TimelinePageResponse {
            entries: Vec::new(),
            next_cursor: Some("next".into()),
            has_more: None,
        });
        assert!(page.has_more);
        assert_eq!(page.next_cursor, Some(TimelineCursor::new("next")));

        let page = into_page(TimelinePageResponse {
            entries: Vec::new(),
            next_cursor: Some(String::new()),
            has_more: Some(true),
        });
        assert!(!page.has_more);

        let page = into_page(TimelinePageResponse {
            entries: Vec::new(),
            next_cursor: Some("next".into()),
            has_more: Some(false),
        });
        assert!(!page.has_more);
    }
}
