//! Run statistics.

use serde::Serialize;

use crate::download::scheduler::ItemOutcome;
use crate::media::MediaKind;

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Timeline pages fetched.
    pub pages: u64,
    /// New descriptors produced by extraction.
    pub discovered: u64,
    /// Attachments skipped because their id was already seen.
    pub duplicates: u64,

    // Terminal outcomes
    pub photos: u64,
    pub videos: u64,
    /// Succeeded items whose file was already on disk.
    pub adopted: u64,
    pub failed: u64,

    /// Discovered but never handed to a worker (cancellation or item limit).
    pub not_dispatched: u64,
}

impl RunSummary {
    /// Account for one finished item.
    pub fn add_outcome(&mut self, outcome: &ItemOutcome) {
        if !outcome.succeeded() {
            self.failed += 1;
            return;
        }

        if outcome.adopted {
            self.adopted += 1;
        }
        match outcome.descriptor.kind {
            MediaKind::Photo => self.photos += 1,
            MediaKind::Video => self.videos += 1,
        }
    }

    /// Items that reached `Succeeded`, adopted ones included.
    pub fn succeeded(&self) -> u64 {
        self.photos + self.videos
    }

    /// Items that reached a terminal status.
    pub fn finished(&self) -> u64 {
        self.succeeded() + self.failed
    }
}
