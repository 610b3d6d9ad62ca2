//! End-to-end run coordination.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;

use crate::config::validate_profile_id;
use crate::download::{
    DownloadScheduler, ItemOutcome, MediaFetcher, RetryPolicy, RunSummary, Submission,
    VideoMaterializer, DEFAULT_MAX_CONCURRENCY,
};
use crate::error::{Error, Result};
use crate::fs::OutputLayout;
use crate::manifest::MetadataStore;
use crate::media::MediaExtractor;
use crate::pipeline::order::DiscoveryOrder;
use crate::timeline::{TimelinePaginator, TimelineSource};

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Folder that receives one subfolder per profile.
    pub output_root: PathBuf,
    pub max_concurrency: usize,
    /// Shared by pagination and per-item downloads.
    pub retry: RetryPolicy,
    /// Stop discovery after this many new items.
    pub max_items: Option<u64>,
    /// Start from the cursor saved in the manifest.
    pub resume: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("medias"),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::default(),
            max_items: None,
            resume: true,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// The timeline was processed but some items failed.
    CompletedWithFailures,
    Cancelled,
    /// Pagination failed for good; items finished before that are recorded.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::CompletedWithFailures => write!(f, "completed with failures"),
            RunStatus::Cancelled => write!(f, "cancelled"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    /// Pages are fetched, extracted, and dispatched as they arrive.
    Paginating,
    /// Discovery is over; waiting for in-flight downloads.
    Downloading,
    Finalizing,
    Finished(RunStatus),
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Init => write!(f, "init"),
            RunPhase::Paginating => write!(f, "paginating"),
            RunPhase::Downloading => write!(f, "downloading"),
            RunPhase::Finalizing => write!(f, "finalizing"),
            RunPhase::Finished(status) => write!(f, "finished ({})", status),
        }
    }
}

/// Result of a run that got past initialization.
#[derive(Debug)]
pub struct RunReport {
    pub status: RunStatus,
    pub summary: RunSummary,
    pub manifest_path: PathBuf,
    /// The error that ended a `Failed` run.
    pub error: Option<Error>,
}

/// Drives pagination, extraction, downloads, and the manifest for one profile.
pub struct PipelineOrchestrator {
    source: Arc<dyn TimelineSource>,
    fetcher: Arc<dyn MediaFetcher>,
    materializer: Arc<dyn VideoMaterializer>,
    settings: PipelineSettings,
    progress: Option<ProgressBar>,
    phase: RunPhase,
}

impl PipelineOrchestrator {
    pub fn new(
        source: Arc<dyn TimelineSource>,
        fetcher: Arc<dyn MediaFetcher>,
        materializer: Arc<dyn VideoMaterializer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            fetcher,
            materializer,
            settings,
            progress: None,
            phase: RunPhase::Init,
        }
    }

    /// Report finished items on a progress bar.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::debug!(from = %self.phase, to = %phase, "Run phase");
        self.phase = phase;
    }

    /// Acquire all media of `profile`.
    ///
    /// Errors before any work starts (invalid profile, unreadable manifest,
    /// output folder not creatable) are returned as `Err`. Once discovery
    /// has begun the run always drains in-flight work, writes the manifest,
    /// and returns a report, even when pagination fails or `cancel` fires.
    pub async fn run(&mut self, profile: &str, cancel: CancellationToken) -> Result<RunReport> {
        self.phase = RunPhase::Init;

        let profile = validate_profile_id(profile)?;
        let layout = OutputLayout::new(&self.settings.output_root, profile)?;
        layout.ensure().await?;

        let store = MetadataStore::open(layout.manifest_path(), profile).await?;
        let mut extractor = MediaExtractor::with_seen(store.seen_ids());
        let start = if self.settings.resume {
            store.cursor().cloned()
        } else {
            None
        };

        match &start {
            Some(cursor) => tracing::info!(
                "Resuming {} from cursor {} ({} item(s) already recorded)",
                profile,
                cursor,
                store.len()
            ),
            None => tracing::info!("Walking timeline of {} from the top", profile),
        }

        let mut paginator = TimelinePaginator::new(
            Arc::clone(&self.source),
            profile,
            self.settings.retry.clone(),
            cancel.clone(),
        )
        .resume(start);

        let mut scheduler = DownloadScheduler::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.materializer),
            layout.clone(),
            self.settings.retry.clone(),
            self.settings.max_concurrency,
            cancel.clone(),
        );

        let mut run = RunState {
            store,
            layout,
            order: DiscoveryOrder::new(),
            summary: RunSummary::default(),
            progress: self.progress.clone(),
        };
        let mut seq = 0u64;
        let mut failure: Option<Error> = None;

        self.enter(RunPhase::Paginating);
        'pages: loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                page = paginator.next_page() => page,
            };

            let page = match page {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(Error::Cancelled) => break,
                Err(e) => {
                    tracing::error!("Timeline pagination failed: {}", e);
                    failure = Some(e);
                    break;
                }
            };
            run.summary.pages += 1;

            for descriptor in extractor.extract(&page.entries) {
                if let Some(max) = self.settings.max_items {
                    if run.summary.discovered >= max {
                        tracing::info!("Reached the limit of {} item(s)", max);
                        break 'pages;
                    }
                }

                seq += 1;
                run.summary.discovered += 1;
                if let Some(bar) = &run.progress {
                    bar.inc_length(1);
                }

                match scheduler.submit(seq, descriptor).await {
                    Submission::Queued => {}
                    Submission::Rejected(descriptor) => {
                        tracing::debug!("Not dispatched: {} {}", descriptor.kind, descriptor.id);
                        run.summary.not_dispatched += 1;
                        run.order.skip(seq);
                    }
                }

                run.absorb(scheduler.collect_finished());
            }

            if paginator.is_exhausted() {
                break;
            }
        }
        run.summary.duplicates = extractor.duplicates();

        self.enter(RunPhase::Downloading);
        let outcomes = scheduler.drain().await;
        run.absorb(outcomes);
        // Panicked tasks produced no outcome but still count as failed items.
        run.summary.failed += scheduler.lost();
        run.flush_all();

        let status = if failure.is_some() {
            RunStatus::Failed
        } else if cancel.is_cancelled() {
            RunStatus::Cancelled
        } else if run.summary.failed > 0 {
            RunStatus::CompletedWithFailures
        } else {
            RunStatus::Completed
        };

        self.enter(RunPhase::Finalizing);
        run.store.set_cursor(paginator.resume_cursor());
        run.store.finalize().await?;

        if let Some(bar) = &run.progress {
            bar.finish_and_clear();
        }

        tracing::info!(
            status = %status,
            pages = run.summary.pages,
            discovered = run.summary.discovered,
            succeeded = run.summary.succeeded(),
            failed = run.summary.failed,
            "Run finished"
        );
        self.enter(RunPhase::Finished(status));

        Ok(RunReport {
            status,
            summary: run.summary,
            manifest_path: run.store.path().to_path_buf(),
            error: failure,
        })
    }
}

/// State owned by the coordinating task for the duration of a run.
struct RunState {
    store: MetadataStore,
    layout: OutputLayout,
    order: DiscoveryOrder<ItemOutcome>,
    summary: RunSummary,
    progress: Option<ProgressBar>,
}

impl RunState {
    /// Count finished outcomes and record those next in discovery order.
    fn absorb(&mut self, outcomes: Vec<ItemOutcome>) {
        for outcome in outcomes {
            self.summary.add_outcome(&outcome);
            if let Some(bar) = &self.progress {
                bar.inc(1);
                bar.set_message(format!("{} {}", outcome.descriptor.kind, outcome.descriptor.id));
            }
            self.order.insert(outcome.seq, outcome);
        }

        for outcome in self.order.pop_ready() {
            self.record(outcome);
        }
    }

    /// Record everything still buffered.
    fn flush_all(&mut self) {
        for outcome in self.order.drain() {
            self.record(outcome);
        }
    }

    fn record(&mut self, outcome: ItemOutcome) {
        let Some(path) = &outcome.path else { return };

        match self.store.record(&outcome.descriptor, path) {
            Ok(true) => tracing::debug!(
                "Recorded {} as {}",
                outcome.descriptor.id,
                self.layout.relative(path).display()
            ),
            Ok(false) => {}
            Err(e) => tracing::warn!("Could not record {}: {}", outcome.descriptor.id, e),
        }
    }
}
