//! Bounded-concurrency download scheduling.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::download::fetch::MediaFetcher;
use crate::download::media::download_direct;
use crate::download::retry::{retry_with_backoff, RetryPolicy};
use crate::download::video::VideoMaterializer;
use crate::error::{Error, Result};
use crate::fs::OutputLayout;
use crate::media::{MediaDescriptor, MediaKind};

/// Default number of concurrently in-flight downloads.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Final state of one scheduled item.
#[derive(Debug)]
pub struct ItemOutcome {
    /// Discovery sequence number assigned by the caller.
    pub seq: u64,
    /// The descriptor, in a terminal status.
    pub descriptor: MediaDescriptor,
    /// Local file for succeeded items.
    pub path: Option<PathBuf>,
    /// Number of download attempts made (0 when adopted from disk).
    pub attempts: u32,
    /// The file was already on disk from an earlier run.
    pub adopted: bool,
}

impl ItemOutcome {
    pub fn succeeded(&self) -> bool {
        self.path.is_some()
    }
}

/// Result of offering an item to the scheduler.
#[derive(Debug)]
pub enum Submission {
    Queued,
    /// The run was cancelled before a worker slot freed up.
    Rejected(MediaDescriptor),
}

/// Shared per-item download logic.
struct Worker {
    fetcher: Arc<dyn MediaFetcher>,
    materializer: Arc<dyn VideoMaterializer>,
    layout: OutputLayout,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl Worker {
    /// Drive one descriptor to a terminal status.
    async fn run(&self, seq: u64, mut descriptor: MediaDescriptor) -> ItemOutcome {
        transition(&mut descriptor, MediaDescriptor::mark_downloading);

        match self.layout.find_existing(descriptor.kind, descriptor.file_stem()).await {
            Ok(Some(path)) => {
                tracing::debug!("Already on disk: {}", path.display());
                transition(&mut descriptor, MediaDescriptor::mark_succeeded);
                return ItemOutcome {
                    seq,
                    descriptor,
                    path: Some(path),
                    attempts: 0,
                    adopted: true,
                };
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not scan for existing {}: {}", descriptor.id, e),
        }

        let label = format!("{} {}", descriptor.kind, descriptor.id);
        let (result, attempts) =
            retry_with_backoff(&self.policy, &self.cancel, &label, |_| self.download(&descriptor))
                .await;

        match result {
            Ok(path) => {
                tracing::info!("Downloaded: {}", path.display());
                transition(&mut descriptor, MediaDescriptor::mark_succeeded);
                ItemOutcome {
                    seq,
                    descriptor,
                    path: Some(path),
                    attempts,
                    adopted: false,
                }
            }
            Err(e) => {
                tracing::warn!(
                    id = %descriptor.id,
                    kind = %descriptor.kind,
                    attempts,
                    "Failed to download media: {}",
                    e
                );
                let reason = e.to_string();
                transition(&mut descriptor, |d| d.mark_failed(reason));
                ItemOutcome {
                    seq,
                    descriptor,
                    path: None,
                    attempts,
                    adopted: false,
                }
            }
        }
    }

    /// One download attempt. Leaves no artifact behind on failure.
    async fn download(&self, descriptor: &MediaDescriptor) -> Result<PathBuf> {
        let result = match descriptor.kind {
            MediaKind::Photo => {
                download_direct(
                    self.fetcher.as_ref(),
                    &descriptor.source_url,
                    &self.layout.kind_dir(MediaKind::Photo),
                    descriptor.file_stem(),
                    MediaKind::Photo,
                )
                .await
            }
            MediaKind::Video => self.materialize_video(descriptor).await,
        };

        if result.is_err() {
            if let Err(e) = self
                .layout
                .remove_artifacts(descriptor.kind, descriptor.file_stem())
                .await
            {
                tracing::warn!("Cleanup after failed download of {} failed: {}", descriptor.id, e);
            }
        }

        result
    }

    async fn materialize_video(&self, descriptor: &MediaDescriptor) -> Result<PathBuf> {
        let destination = self
            .layout
            .kind_dir(MediaKind::Video)
            .join(descriptor.file_stem());
        let path = self
            .materializer
            .materialize(&descriptor.source_url, &destination)
            .await?;

        let meta = tokio::fs::metadata(&path).await.map_err(|e| {
            Error::CorruptContent(format!("materialized file {} is missing: {}", path.display(), e))
        })?;
        if !meta.is_file() || meta.len() == 0 {
            return Err(Error::CorruptContent(format!(
                "materialized file {} is empty",
                path.display()
            )));
        }

        Ok(path)
    }
}

fn transition<F>(descriptor: &mut MediaDescriptor, step: F)
where
    F: FnOnce(&mut MediaDescriptor) -> Result<()>,
{
    if let Err(e) = step(descriptor) {
        tracing::debug!("{}", e);
    }
}

/// Dispatches descriptors to a bounded pool of download workers.
///
/// Each descriptor is moved into exactly one worker task and handed back in
/// its [`ItemOutcome`]. Outcomes arrive in completion order; callers that
/// need discovery order sort by `seq`.
pub struct DownloadScheduler {
    worker: Arc<Worker>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<ItemOutcome>,
    cancel: CancellationToken,
    lost: u64,
}

impl DownloadScheduler {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        materializer: Arc<dyn VideoMaterializer>,
        layout: OutputLayout,
        policy: RetryPolicy,
        max_concurrency: usize,
        cancel: CancellationToken,
    ) -> Self {
        let worker = Worker {
            fetcher,
            materializer,
            layout,
            policy,
            cancel: cancel.clone(),
        };

        Self {
            worker: Arc::new(worker),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            tasks: JoinSet::new(),
            cancel,
            lost: 0,
        }
    }

    /// Queue a descriptor, waiting for a free worker slot.
    ///
    /// Once the run is cancelled no new work starts; the descriptor is
    /// handed back untouched.
    pub async fn submit(&mut self, seq: u64, descriptor: MediaDescriptor) -> Submission {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Submission::Rejected(descriptor),
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return Submission::Rejected(descriptor),
            },
        };

        let worker = Arc::clone(&self.worker);
        self.tasks.spawn(async move {
            let _permit = permit;
            worker.run(seq, descriptor).await
        });

        Submission::Queued
    }

    /// Number of tasks not yet collected.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Collect outcomes that are already finished, without waiting.
    pub fn collect_finished(&mut self) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::new();
        while let Some(joined) = self.tasks.try_join_next() {
            self.accept(joined, &mut outcomes);
        }
        outcomes
    }

    /// Wait for every in-flight task and collect its outcome.
    pub async fn drain(&mut self) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            self.accept(joined, &mut outcomes);
        }
        outcomes
    }

    /// Tasks that panicked and produced no outcome.
    pub fn lost(&self) -> u64 {
        self.lost
    }

    fn accept(
        &mut self,
        joined: std::result::Result<ItemOutcome, tokio::task::JoinError>,
        outcomes: &mut Vec<ItemOutcome>,
    ) {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::error!("Download task join error: {}", e);
                self.lost += 1;
            }
        }
    }
}
