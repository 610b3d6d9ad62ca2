//! Timeline source abstraction and page types.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::types::RawEntry;
use crate::error::Result;

/// Opaque pagination token returned by the timeline API.
///
/// Never parsed or compared beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimelineCursor(String);

impl TimelineCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimelineCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fetched page of raw timeline entries.
#[derive(Debug, Clone, Default)]
pub struct TimelinePage {
    pub entries: Vec<RawEntry>,
    pub next_cursor: Option<TimelineCursor>,
    pub has_more: bool,
}

/// Anything that can serve pages of a profile's timeline.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    /// Fetch the page starting at `cursor` (`None` = start of timeline).
    async fn fetch_page(
        &self,
        profile: &str,
        cursor: Option<&TimelineCursor>,
    ) -> Result<TimelinePage>;
}
