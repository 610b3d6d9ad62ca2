//! Cursor-driven timeline walking.

use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio_util::sync::CancellationToken;

use crate::download::retry::{retry_with_backoff, RetryPolicy};
use crate::error::Result;
use crate::timeline::source::{TimelineCursor, TimelinePage, TimelineSource};

/// Walks a profile's timeline page by page.
///
/// The only natural end is a page reporting `has_more == false`; empty pages
/// in the middle of the stream are passed through. Transient and rate-limit
/// failures are retried with the same cursor.
pub struct TimelinePaginator {
    source: Arc<dyn TimelineSource>,
    profile: String,
    policy: RetryPolicy,
    cancel: CancellationToken,
    /// Cursor for the next request (`None` = start of timeline).
    next: Option<TimelineCursor>,
    /// Cursor used for the most recently fetched page.
    current: Option<TimelineCursor>,
    exhausted: bool,
    pages: u64,
}

impl TimelinePaginator {
    /// Start at the top of the timeline.
    pub fn new(
        source: Arc<dyn TimelineSource>,
        profile: impl Into<String>,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            profile: profile.into(),
            policy,
            cancel,
            next: None,
            current: None,
            exhausted: false,
            pages: 0,
        }
    }

    /// Continue from a previously persisted cursor.
    pub fn resume(mut self, cursor: Option<TimelineCursor>) -> Self {
        self.current = cursor.clone();
        self.next = cursor;
        self
    }

    /// Fetch the next page, or `None` once the timeline is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<TimelinePage>> {
        if self.exhausted {
            return Ok(None);
        }

        let requested = self.next.clone();
        // Everything before this page has been handed out; a failed or
        // interrupted fetch resumes here.
        self.current = requested.clone();
        let label = format!("page {}", self.pages + 1);
        let source = Arc::clone(&self.source);
        let profile = self.profile.as_str();

        let (result, attempts) = retry_with_backoff(&self.policy, &self.cancel, &label, |_| {
            source.fetch_page(profile, requested.as_ref())
        })
        .await;
        let page = result?;

        self.pages += 1;

        tracing::debug!(
            page = self.pages,
            entries = page.entries.len(),
            attempts,
            has_more = page.has_more,
            "Fetched timeline page"
        );

        if !page.has_more {
            self.exhausted = true;
        } else if page.next_cursor.is_none() || page.next_cursor == requested {
            tracing::warn!(
                "Timeline returned no new cursor after page {}; treating as end of timeline",
                self.pages
            );
            self.exhausted = true;
        }
        self.next = page.next_cursor.clone();

        Ok(Some(page))
    }

    /// Cursor to persist for resuming: the one of the latest requested page.
    ///
    /// `None` once the timeline has been walked to its end.
    pub fn resume_cursor(&self) -> Option<TimelineCursor> {
        if self.exhausted {
            None
        } else {
            self.current.clone()
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of pages fetched so far.
    pub fn pages(&self) -> u64 {
        self.pages
    }

    /// Adapt into a stream of pages that ends at exhaustion or the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<TimelinePage>> {
        stream::try_unfold(self, |mut paginator| async move {
            let page = paginator.next_page().await?;
            Ok(page.map(|p| (p, paginator)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves scripted responses and records the cursors it was asked for.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<TimelinePage>>>,
        requests: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<TimelinePage>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<Option<String>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TimelineSource for ScriptedSource {
        async fn fetch_page(
            &self,
            _profile: &str,
            cursor: Option<&TimelineCursor>,
        ) -> Result<TimelinePage> {
            self.requests
                .lock()
                .unwrap()
                .push(cursor.map(|c| c.as_str().to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Api("script exhausted".into())))
        }
    }

    fn page(next: Option<&str>, has_more: bool) -> Result<TimelinePage> {
        Ok(TimelinePage {
            entries: Vec::new(),
            next_cursor: next.map(TimelineCursor::new),
            has_more,
        })
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter: false,
        }
    }

    fn paginator(source: Arc<ScriptedSource>) -> TimelinePaginator {
        TimelinePaginator::new(source, "12345", policy(), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_empty_page_does_not_end_stream() {
        let source = ScriptedSource::new(vec![
            page(Some("a"), true),
            page(Some("b"), true),
            page(None, false),
        ]);
        let pages: Vec<_> = paginator(source.clone())
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(
            source.requests(),
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_retries_same_cursor() {
        let source = ScriptedSource::new(vec![
            page(Some("a"), true),
            Err(Error::RateLimited {
                retry_after: Some(Duration::from_millis(1)),
            }),
            Err(Error::Transient("HTTP 502".into())),
            page(None, false),
        ]);
        let mut p = paginator(source.clone());

        assert!(p.next_page().await.unwrap().is_some());
        assert!(p.next_page().await.unwrap().is_some());
        assert!(p.next_page().await.unwrap().is_none());
        assert_eq!(
            source.requests(),
            vec![
                None,
                Some("a".to_string()),
                Some("a".to_string()),
                Some("a".to_string())
            ]
        );
        assert_eq!(p.pages(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let source = ScriptedSource::new(vec![Err(Error::Unauthorized("HTTP 401".into()))]);
        let mut p = paginator(source.clone());

        assert!(matches!(p.next_page().await, Err(Error::Unauthorized(_))));
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_uses_persisted_cursor() {
        let source = ScriptedSource::new(vec![page(Some("d"), true), page(None, false)]);
        let mut p = paginator(source.clone()).resume(Some(TimelineCursor::new("c")));

        assert_eq!(p.resume_cursor(), Some(TimelineCursor::new("c")));
        p.next_page().await.unwrap();
        assert_eq!(p.resume_cursor(), Some(TimelineCursor::new("c")));
        p.next_page().await.unwrap();
        assert_eq!(p.resume_cursor(), None);
        assert!(p.is_exhausted());
        assert_eq!(source.requests()[0], Some("c".to_string()));
    }

    #[tokio::test]
    async fn test_failed_fetch_resumes_at_failed_page() {
        let source = ScriptedSource::new(vec![
            page(Some("a"), true),
            Err(Error::Unauthorized("HTTP 401".into())),
        ]);
        let mut p = paginator(source.clone());

        p.next_page().await.unwrap();
        assert_eq!(p.resume_cursor(), None);
        assert!(p.next_page().await.is_err());
        assert_eq!(p.resume_cursor(), Some(TimelineCursor::new("a")));
        assert!(!p.is_exhausted());
    }

    #[tokio::test]
    async fn test_repeated_cursor_ends_stream() {
        let source = ScriptedSource::new(vec![page(Some("a"), true), page(Some("a"), true)]);
        let mut p = paginator(source.clone());

        p.next_page().await.unwrap();
        p.next_page().await.unwrap();
        assert!(p.next_page().await.unwrap().is_none());
        assert_eq!(source.requests().len(), 2);
    }
}
