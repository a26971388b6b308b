//! Fixed-size worker pool draining a bounded task queue.
//!
//! The pool is shared: any number of concurrent operations may submit tasks
//! to it, each carrying its own result sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::data::{FetchResult, FetchTask, PoolOptions};
use crate::effects::fetcher::Fetcher;
use crate::effects::http::HttpClient;
use crate::error::SubmitError;

type SharedQueue = Arc<Mutex<mpsc::Receiver<FetchTask>>>;

pub struct WorkerPool {
    queue: mpsc::Sender<FetchTask>,
    receiver: SharedQueue,
    cancel: CancellationToken,
    tracker: TaskTracker,
    active: Arc<AtomicUsize>,
    options: PoolOptions,
}

impl WorkerPool {
    /// Start `options.workers` workers on the current tokio runtime.
    pub fn new<C: HttpClient + 'static>(fetcher: Fetcher<C>, options: PoolOptions) -> Self {
        let workers = options.workers.max(1);
        let capacity = options.queue_capacity();
        let (queue, receiver) = mpsc::channel(capacity);
        let receiver: SharedQueue = Arc::new(Mutex::new(receiver));
        let fetcher = Arc::new(fetcher);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let active = Arc::new(AtomicUsize::new(0));

        for id in 0..workers {
            tracker.spawn(worker_loop(
                id,
                Arc::clone(&fetcher),
                Arc::clone(&receiver),
                cancel.clone(),
                Arc::clone(&active),
                options.result_send_timeout,
            ));
        }

        info!(
            workers,
            queue_size = capacity,
            fetch_timeout = ?fetcher.options().timeout,
            "worker pool initialized"
        );

        Self {
            queue,
            receiver,
            cancel,
            tracker,
            active,
            options,
        }
    }

    /// Enqueue a task, waiting while the queue is full.
    ///
    /// Returns [`SubmitError::Rejected`] once the pool is shutting down; the
    /// caller must treat the resource as skipped.
    pub async fn submit(&self, task: FetchTask) -> Result<(), SubmitError> {
        if self.cancel.is_cancelled() {
            debug!(source_id = %task.source_id, "task rejected: pool cancelled");
            return Err(SubmitError::Rejected);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("task rejected: pool cancelled");
                Err(SubmitError::Rejected)
            }
            sent = self.queue.send(task) => sent.map_err(|rejected| {
                debug!(source_id = %rejected.0.source_id, "task rejected: queue closed");
                SubmitError::Rejected
            }),
        }
    }

    /// A token that fires when the pool shuts down, for one operation's tasks.
    pub fn operation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Tasks waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Stop accepting tasks, cancel in-flight retries and wait for every
    /// worker to finish its current task.
    ///
    /// Tasks still queued are dropped, closing their result sinks.
    pub async fn shutdown(&self) {
        info!("shutting down worker pool");
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut dropped = 0usize;
        while let Ok(task) = receiver.try_recv() {
            debug!(source_id = %task.source_id, "dropping queued task");
            dropped += 1;
        }
        info!(dropped, "worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn worker_loop<C: HttpClient>(
    id: usize,
    fetcher: Arc<Fetcher<C>>,
    queue: SharedQueue,
    cancel: CancellationToken,
    active: Arc<AtomicUsize>,
    result_send_timeout: Duration,
) {
    active.fetch_add(1, Ordering::AcqRel);
    debug!(worker_id = id, "worker started");

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(worker_id = id, "worker stopped");
                break;
            }
            next = async { queue.lock().await.recv().await } => next,
        };

        let Some(task) = next else {
            debug!(worker_id = id, "worker stopped (queue closed)");
            break;
        };

        process_task(&fetcher, task, result_send_timeout).await;
    }

    active.fetch_sub(1, Ordering::AcqRel);
}

async fn process_task<C: HttpClient>(fetcher: &Fetcher<C>, task: FetchTask, result_send_timeout: Duration) {
    let FetchTask {
        resource_key,
        source_id,
        result_sink,
        cancel,
    } = task;

    let payload = fetcher.fetch(&cancel, &resource_key).await;

    if cancel.is_cancelled() {
        debug!(%source_id, "operation cancelled, discarding result");
        return;
    }

    if payload.is_empty() {
        warn!(%source_id, url = %resource_key, "download exhausted, reporting empty result");
    }

    let result = FetchResult::new(resource_key, source_id.clone(), payload);

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(%source_id, "operation cancelled, discarding result");
        }
        sent = tokio::time::timeout(result_send_timeout, result_sink.send(result)) => match sent {
            Ok(Ok(())) => {}
            Ok(Err(_)) => debug!(%source_id, "result receiver gone, discarding result"),
            Err(_) => warn!(%source_id, "timeout sending result"),
        },
    }
}
