//! Sequential submission loop with a fixed retry budget.
//!
//! Items are sent one at a time so progress for an item is complete before
//! the next begins. A terminal failure never stops the remaining items.

use crate::{ApiClient, ProgressFn, VideoUpload};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use streambox_core::models::MediaAssetResponse;

/// Lifecycle of one item in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Uploading,
    /// Waiting out the backoff before the next attempt.
    Retrying,
    Done,
    Error,
}

impl ItemStatus {
    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        use ItemStatus::*;
        matches!(
            (self, next),
            (Pending, Uploading)
                | (Uploading, Done)
                | (Uploading, Retrying)
                | (Uploading, Error)
                | (Retrying, Uploading)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Done | ItemStatus::Error)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Uploading => "uploading",
            ItemStatus::Retrying => "retrying",
            ItemStatus::Done => "done",
            ItemStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Queue entry tracked by the loop.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub upload: VideoUpload,
    status: ItemStatus,
    attempts: u32,
    progress: u8,
    error: Option<String>,
    asset: Option<MediaAssetResponse>,
}

impl BatchItem {
    pub fn new(upload: VideoUpload) -> Self {
        Self {
            upload,
            status: ItemStatus::Pending,
            attempts: 0,
            progress: 0,
            error: None,
            asset: None,
        }
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 100 once the item is done, 0 otherwise. Live percentages go to the
    /// observer.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Message of the most recent failed attempt.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn asset(&self) -> Option<&MediaAssetResponse> {
        self.asset.as_ref()
    }

    pub fn filename(&self) -> String {
        self.upload.filename()
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: ItemStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            anyhow::bail!(
                "Invalid status transition for {}: {} -> {}",
                self.filename(),
                self.status,
                next
            );
        }
        if next == ItemStatus::Uploading {
            self.attempts += 1;
            self.progress = 0;
        }
        self.status = next;
        Ok(())
    }
}

/// Retry budget and pacing.
#[derive(Debug, Clone)]
pub struct SubmissionPolicy {
    /// Total attempts per item, including the first.
    pub max_attempts: u32,
    pub backoff: Duration,
    /// Pause after each item before the next begins.
    pub inter_item_delay: Duration,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(1000),
            inter_item_delay: Duration::from_millis(300),
        }
    }
}

/// Sends one item to the server.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        upload: &VideoUpload,
        progress: ProgressFn,
    ) -> Result<MediaAssetResponse>;
}

#[async_trait]
impl Submitter for ApiClient {
    async fn submit(
        &self,
        upload: &VideoUpload,
        progress: ProgressFn,
    ) -> Result<MediaAssetResponse> {
        self.upload_video(upload, Some(progress)).await
    }
}

/// Receives lifecycle events for rendering.
pub trait SubmissionObserver: Send + Sync {
    /// Called after every status change. `position` is zero-based.
    fn on_status(&self, position: usize, total: usize, item: &BatchItem);

    /// Called while bytes stream, with a percentage of the current attempt.
    fn on_progress(&self, _position: usize, _percent: u8) {}
}

/// Observer that only logs.
pub struct TracingObserver;

impl SubmissionObserver for TracingObserver {
    fn on_status(&self, position: usize, total: usize, item: &BatchItem) {
        tracing::debug!(
            item = position + 1,
            total = total,
            file = %item.filename(),
            status = %item.status(),
            attempt = item.attempts(),
            "Submission status changed"
        );
    }
}

/// Aggregate outcome once the queue is drained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionSummary {
    pub succeeded: usize,
    /// `(filename, last error)` for every item that ended in `Error`.
    pub failed: Vec<(String, String)>,
    /// Attempts made across all items.
    pub attempts: u32,
}

fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) * 100) / total) as u8
}

/// Drives a queue of items through a [`Submitter`].
pub struct SubmissionLoop<S> {
    submitter: S,
    policy: SubmissionPolicy,
    observer: Arc<dyn SubmissionObserver>,
}

impl<S: Submitter> SubmissionLoop<S> {
    pub fn new(submitter: S, policy: SubmissionPolicy) -> Self {
        Self {
            submitter,
            policy,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SubmissionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Submit every pending item in order and summarize.
    ///
    /// Items that are not `Pending` are left untouched and excluded from the
    /// summary.
    pub async fn run(&self, items: &mut [BatchItem]) -> Result<SubmissionSummary> {
        let total = items.len();
        let mut summary = SubmissionSummary::default();

        for (position, item) in items.iter_mut().enumerate() {
            if item.status() != ItemStatus::Pending {
                tracing::debug!(file = %item.filename(), status = %item.status(), "Skipping item");
                continue;
            }

            self.submit_item(position, total, item).await?;
            summary.attempts += item.attempts();
            match item.status() {
                ItemStatus::Done => summary.succeeded += 1,
                _ => summary.failed.push((
                    item.filename(),
                    item.error().unwrap_or("unknown error").to_string(),
                )),
            }

            if !self.policy.inter_item_delay.is_zero() {
                tokio::time::sleep(self.policy.inter_item_delay).await;
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            attempts = summary.attempts,
            "Submission finished"
        );
        Ok(summary)
    }

    async fn submit_item(&self, position: usize, total: usize, item: &mut BatchItem) -> Result<()> {
        let max_attempts = self.policy.max_attempts.max(1);

        loop {
            item.transition(ItemStatus::Uploading)?;
            self.observer.on_status(position, total, item);

            let observer = self.observer.clone();
            let progress: ProgressFn = Arc::new(move |sent, total_bytes| {
                observer.on_progress(position, percent(sent, total_bytes));
            });

            match self.submitter.submit(&item.upload, progress).await {
                Ok(asset) => {
                    item.progress = 100;
                    item.asset = Some(asset);
                    item.transition(ItemStatus::Done)?;
                    self.observer.on_status(position, total, item);
                    return Ok(());
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    tracing::warn!(
                        file = %item.filename(),
                        attempt = item.attempts(),
                        error = %message,
                        "Upload attempt failed"
                    );

                    item.error = Some(message);
                    if item.attempts() < max_attempts {
                        item.transition(ItemStatus::Retrying)?;
                        self.observer.on_status(position, total, item);
                        tokio::time::sleep(self.policy.backoff).await;
                        continue;
                    }

                    item.transition(ItemStatus::Error)?;
                    self.observer.on_status(position, total, item);
                    return Ok(());
                }
            }
        }
    }
}
