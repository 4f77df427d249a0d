//! Processing orchestrator.
//!
//! Drives one cycle — list the todo playlist, then per item download →
//! insert into done → delete from todo — and the daemon loop around it.
//! Items are processed strictly sequentially: the shared API quota makes
//! parallel downloads counterproductive without an admission-control layer
//! this design deliberately does not have.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::download::MediaFetcher;
use crate::quota::QuotaTracker;
use crate::youtube::{PlaylistApi, PlaylistVideo};

/// Per-item result tag, used for aggregation and metrics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Success,
    DownloadFailed,
    PartialApiFailure,
    UnexpectedError,
}

impl ProcessingOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessingOutcome::Success => "success",
            ProcessingOutcome::DownloadFailed => "download_failed",
            ProcessingOutcome::PartialApiFailure => "partial_api_failure",
            ProcessingOutcome::UnexpectedError => "unexpected_error",
        }
    }
}

/// Aggregated result of one processing cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub listed: usize,
    pub succeeded: usize,
    pub download_failed: usize,
    pub partial_api_failure: usize,
    pub unexpected: usize,
}

impl CycleSummary {
    fn tally(&mut self, outcome: ProcessingOutcome) {
        match outcome {
            ProcessingOutcome::Success => self.succeeded += 1,
            ProcessingOutcome::DownloadFailed => self.download_failed += 1,
            ProcessingOutcome::PartialApiFailure => self.partial_api_failure += 1,
            ProcessingOutcome::UnexpectedError => self.unexpected += 1,
        }
    }
}

pub struct PlaylistManager {
    api: Arc<dyn PlaylistApi>,
    fetcher: Arc<dyn MediaFetcher>,
    quota: Arc<Mutex<QuotaTracker>>,
    todo_playlist_id: String,
    done_playlist_id: String,
    download_path: PathBuf,
}

impl PlaylistManager {
    pub fn new(
        api: Arc<dyn PlaylistApi>,
        fetcher: Arc<dyn MediaFetcher>,
        quota: Arc<Mutex<QuotaTracker>>,
        todo_playlist_id: String,
        done_playlist_id: String,
        download_path: PathBuf,
    ) -> Self {
        Self {
            api,
            fetcher,
            quota,
            todo_playlist_id,
            done_playlist_id,
            download_path,
        }
    }

    /// Process one video: download, add to done, remove from todo.
    ///
    /// Failure semantics, in order:
    /// - download fails: stop, both memberships unchanged — the item is
    ///   retried in full next cycle.
    /// - insert into done fails: log and continue anyway; the media is on
    ///   disk, and losing the done bookkeeping is less harmful than leaving
    ///   the item stuck in todo forever.
    /// - delete from todo fails: terminal for this item; it stays in todo
    ///   and is re-downloaded next cycle (downloads overwrite, repeating
    ///   one is harmless).
    pub async fn process_video(&self, video: &PlaylistVideo) -> ProcessingOutcome {
        tracing::info!("Processing video: {}", video.title);

        if let Err(e) = self.fetcher.fetch(video, &self.download_path).await {
            tracing::error!("Failed to download {}: {}", video.title, e);
            return ProcessingOutcome::DownloadFailed;
        }

        let mut outcome = ProcessingOutcome::Success;

        if self
            .api
            .insert_item(&self.done_playlist_id, &video.video_id)
            .await
            .is_err()
        {
            tracing::warn!(
                "Downloaded but failed to add to done playlist: {}",
                video.title
            );
            outcome = ProcessingOutcome::PartialApiFailure;
        }

        if self
            .api
            .delete_item(&video.playlist_item_id)
            .await
            .is_err()
        {
            tracing::warn!(
                "Downloaded but failed to remove from todo playlist: {}",
                video.title
            );
            return ProcessingOutcome::PartialApiFailure;
        }

        if outcome == ProcessingOutcome::Success {
            tracing::info!("Successfully processed: {}", video.title);
        }
        outcome
    }

    /// One full pass over the todo playlist.
    ///
    /// Per-item failures never abort the cycle; each item runs in its own
    /// task so even a panic is contained as an `UnexpectedError` outcome.
    /// Setup failures (download directory creation) propagate to the caller.
    pub async fn run_once(self: &Arc<Self>) -> anyhow::Result<CycleSummary> {
        {
            let mut quota = self.quota.lock().await;
            let remaining = quota.remaining();
            tracing::info!(
                todo = %self.todo_playlist_id,
                done = %self.done_playlist_id,
                download_path = %self.download_path.display(),
                quota_used = quota.used(),
                quota_remaining = remaining,
                "Starting playlist processing cycle"
            );
        }

        let cycle_start = Instant::now();

        tokio::fs::create_dir_all(&self.download_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create download directory: {}",
                    self.download_path.display()
                )
            })?;

        let videos = self.api.list_items(&self.todo_playlist_id).await;
        if videos.is_empty() {
            tracing::info!("No videos in todo playlist");
            crate::metrics::mark_cycle_complete();
            return Ok(CycleSummary::default());
        }

        tracing::info!("Found {} videos to process", videos.len());
        let mut summary = CycleSummary {
            listed: videos.len(),
            ..CycleSummary::default()
        };

        for video in videos {
            let item_start = Instant::now();
            let manager = Arc::clone(self);
            let item = video.clone();
            let outcome =
                match tokio::spawn(async move { manager.process_video(&item).await }).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!("Unexpected error processing {}: {}", video.title, e);
                        ProcessingOutcome::UnexpectedError
                    }
                };
            crate::metrics::record_duration("full_cycle", item_start.elapsed().as_secs_f64());
            crate::metrics::record_processed(outcome.as_label());
            summary.tally(outcome);
        }

        let cycle_secs = cycle_start.elapsed().as_secs_f64();
        crate::metrics::record_duration("cycle", cycle_secs);
        crate::metrics::mark_cycle_complete();
        tracing::info!(
            "Playlist processing cycle complete (took {:.1}s): {} ok, {} download failures, \
             {} partial API failures, {} unexpected",
            cycle_secs,
            summary.succeeded,
            summary.download_failed,
            summary.partial_api_failure,
            summary.unexpected
        );

        Ok(summary)
    }

    /// Poll forever with a fixed sleep between cycles.
    ///
    /// The shutdown token ends the loop cleanly; any `run_once` error is
    /// fatal and propagates — process supervision is external.
    pub async fn run_daemon(
        self: &Arc<Self>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        tracing::info!(
            "Starting daemon mode (checking every {} seconds)",
            poll_interval.as_secs()
        );

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("Daemon stopped by user");
                return Ok(());
            }

            self.run_once().await?;

            tracing::info!("Sleeping for {} seconds...", poll_interval.as_secs());
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("Daemon stopped by user");
                    return Ok(());
                }
            }
        }
    }
}
