//! Streaming coordinator: submit one task per unique key, then hand results
//! to the caller in completion order as they arrive.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::data::{FetchResult, FetchTask, OperationContext, RequestBatch, StreamOptions, StreamSummary};
use crate::effects::pool::WorkerPool;
use crate::error::PipelineError;

/// Receives the results of one streaming operation.
///
/// `on_item` is awaited inline for every non-empty result, so it sees items
/// one at a time in download-completion order. Its errors are logged and the
/// operation carries on.
pub trait StreamObserver: Send {
    type Error: std::fmt::Display + Send;

    /// Called with the item, its 1-based position among successful downloads,
    /// and the number of results the operation is waiting for.
    fn on_item(
        &mut self,
        item: FetchResult,
        index: usize,
        total: usize,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Called every `progress_every` downloads and once more on the last one.
    fn on_progress(&mut self, _downloaded: usize, _total: usize) -> impl Future<Output = ()> + Send {
        async {}
    }
}

const MIN_HEARTBEAT: Duration = Duration::from_millis(10);

pub struct StreamingCoordinator {
    pool: Arc<WorkerPool>,
    options: StreamOptions,
}

impl StreamingCoordinator {
    pub fn new(pool: Arc<WorkerPool>, options: StreamOptions) -> Self {
        Self { pool, options }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Start a new operation whose deadline begins now.
    ///
    /// `cancel` is the caller's stop signal. Tasks get their own token, tied to
    /// the pool, which is cancelled when the operation ends.
    pub fn operation(&self, cancel: &CancellationToken) -> OperationContext {
        OperationContext::new(
            Instant::now() + self.options.deadline,
            cancel.clone(),
            self.pool.operation_token(),
        )
    }

    /// Download every key in `batch`, streaming results to `observer`.
    ///
    /// The operation completes once a result arrived for every task the pool
    /// accepted. Keys the pool rejected are skipped and counted in
    /// [`StreamSummary::rejected`].
    pub async fn run<O: StreamObserver>(
        &self,
        op: OperationContext,
        batch: RequestBatch,
        observer: &mut O,
    ) -> Result<StreamSummary, PipelineError> {
        if batch.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }

        let requested = batch.len();
        let _task_guard = op.task_cancel.clone().drop_guard();
        let deadline = tokio::time::sleep_until(op.deadline);
        tokio::pin!(deadline);

        let (result_sink, mut results) = mpsc::channel(requested);
        let mut accepted = 0usize;
        let mut rejected = 0usize;

        for (resource_key, source_id) in batch {
            let task = FetchTask {
                resource_key,
                source_id,
                result_sink: result_sink.clone(),
                cancel: op.task_cancel.clone(),
            };

            let submitted = tokio::select! {
                biased;
                _ = op.cancel.cancelled() => None,
                _ = &mut deadline => None,
                submitted = self.pool.submit(task) => Some(submitted),
            };

            match submitted {
                Some(Ok(())) => accepted += 1,
                Some(Err(err)) => {
                    rejected += 1;
                    debug!(%err, "task skipped");
                }
                None => {
                    warn!(accepted, total = requested, "processing timeout during submission");
                    return Err(PipelineError::ProcessingTimeout {
                        downloaded: 0,
                        total: requested,
                    });
                }
            }
        }
        drop(result_sink);

        info!(total = requested, accepted, rejected, "tasks submitted");

        if accepted == 0 {
            return Err(PipelineError::NoSuccessfulDownloads { total: 0 });
        }

        let total = accepted;
        let stats = op.stats();
        let progress_every = self.options.progress_every.max(1);
        let heartbeat_period = self.options.heartbeat.max(MIN_HEARTBEAT);
        let started = Instant::now();
        let mut heartbeat = tokio::time::interval_at(started + heartbeat_period, heartbeat_period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = op.cancel.cancelled() => {
                    let downloaded = stats.downloaded();
                    warn!(downloaded, total, "operation cancelled");
                    return Err(PipelineError::ProcessingTimeout { downloaded, total });
                }
                _ = &mut deadline => {
                    let downloaded = stats.downloaded();
                    warn!(downloaded, total, "processing timeout");
                    return Err(PipelineError::ProcessingTimeout { downloaded, total });
                }
                received = results.recv() => {
                    let Some(result) = received else {
                        let downloaded = stats.downloaded();
                        warn!(downloaded, total, "result channel closed before all downloads finished");
                        return Err(PipelineError::ProcessingTimeout { downloaded, total });
                    };

                    let downloaded = stats.record_download();
                    if result.is_success() {
                        let index = stats.record_success();
                        debug!(source_id = %result.source_id, size = result.byte_size, index, "image ready");
                        let source_id = result.source_id.clone();
                        if let Err(err) = observer.on_item(result, index, total).await {
                            warn!(%source_id, %err, "item callback failed");
                        }
                    } else {
                        debug!(source_id = %result.source_id, "skipping failed download");
                    }

                    if downloaded % progress_every == 0 || downloaded == total {
                        observer.on_progress(downloaded, total).await;
                    }

                    if downloaded == total {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    info!(
                        downloaded = stats.downloaded(),
                        succeeded = stats.succeeded(),
                        total,
                        elapsed = ?started.elapsed(),
                        "progress"
                    );
                }
            }
        }

        let downloaded = stats.downloaded();
        let succeeded = stats.succeeded();
        if succeeded == 0 {
            warn!(total, "no downloads succeeded");
            return Err(PipelineError::NoSuccessfulDownloads { total });
        }

        info!(total, succeeded, elapsed = ?started.elapsed(), "download completed");

        Ok(StreamSummary {
            total,
            downloaded,
            succeeded,
            rejected,
        })
    }
}
