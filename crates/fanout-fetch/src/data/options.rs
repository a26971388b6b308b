use std::sync::Arc;
use std::time::Duration;

/// Largest body a single fetch will accept (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for a single resource fetch.
///
/// # Examples
///
/// ```
/// use fanout_fetch::FetchOptions;
/// use std::time::Duration;
///
/// let options = FetchOptions::default()
///     .max_attempts(5)
///     .retry_backoff(Duration::from_millis(200))
///     .header("Accept", "image/*");
/// ```
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Total attempts per resource, including the first one.
    ///
    /// Default: 4 (1 try + 3 retries)
    pub max_attempts: u32,

    /// Base delay for linear backoff between attempts.
    ///
    /// The delay before attempt N (1-indexed retry) is `retry_backoff * N`.
    ///
    /// Default: 2s
    pub retry_backoff: Duration,

    /// Hard budget for one attempt, from request to last body byte.
    ///
    /// Default: 15s
    pub timeout: Duration,

    /// Bodies larger than this are treated as failed attempts.
    ///
    /// Default: 10 MiB
    pub max_body_bytes: usize,

    /// HTTP headers sent with every attempt.
    ///
    /// Default: a browser-like `User-Agent` and an image `Accept` header
    pub headers: Arc<[(String, String)]>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            retry_backoff: Duration::from_secs(2),
            timeout: Duration::from_secs(15),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            headers: Arc::from(vec![
                (
                    "User-Agent".to_string(),
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
                ),
                (
                    "Accept".to_string(),
                    "image/webp,image/apng,image/*,*/*;q=0.8".to_string(),
                ),
            ]),
        }
    }
}

impl FetchOptions {
    /// Set the total number of attempts. Values below 1 are raised to 1.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the base retry backoff duration.
    #[must_use]
    pub fn retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the body size cap.
    #[must_use]
    pub fn max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Add a single HTTP header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers: Vec<_> = self.headers.iter().cloned().collect();
        headers.push((key.into(), value.into()));
        self.headers = Arc::from(headers);
        self
    }

    /// Replace all HTTP headers.
    #[must_use]
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Arc::from(headers);
        self
    }
}

/// Configuration for the shared worker pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Number of concurrent workers.
    ///
    /// Default: 100
    pub workers: usize,

    /// Queue depth as a multiple of `workers`.
    ///
    /// Default: 10
    pub queue_factor: usize,

    /// How long a worker waits to hand a result to a slow consumer before
    /// dropping it.
    ///
    /// Default: 5s
    pub result_send_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: 100,
            queue_factor: 10,
            result_send_timeout: Duration::from_secs(5),
        }
    }
}

impl PoolOptions {
    /// Set the worker count. Values below 1 are raised to 1.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the queue depth multiplier. Values below 1 are raised to 1.
    #[must_use]
    pub fn queue_factor(mut self, queue_factor: usize) -> Self {
        self.queue_factor = queue_factor.max(1);
        self
    }

    /// Set the bounded wait for publishing a result.
    #[must_use]
    pub fn result_send_timeout(mut self, timeout: Duration) -> Self {
        self.result_send_timeout = timeout;
        self
    }

    /// Capacity of the shared task queue.
    pub fn queue_capacity(&self) -> usize {
        self.workers.saturating_mul(self.queue_factor).max(1)
    }
}

/// Configuration for one streaming operation.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Overall deadline for the operation.
    ///
    /// Default: 30 minutes
    pub deadline: Duration,

    /// Interval of the progress heartbeat log line.
    ///
    /// Default: 2s
    pub heartbeat: Duration,

    /// The progress observer is notified every this many results, and on the
    /// final one.
    ///
    /// Default: 10
    pub progress_every: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30 * 60),
            heartbeat: Duration::from_secs(2),
            progress_every: 10,
        }
    }
}

impl StreamOptions {
    /// Set the overall deadline.
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the heartbeat interval. Zero is raised to one millisecond.
    #[must_use]
    pub fn heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat.max(Duration::from_millis(1));
        self
    }

    /// Set the progress cadence. Values below 1 are raised to 1.
    #[must_use]
    pub fn progress_every(mut self, every: usize) -> Self {
        self.progress_every = every.max(1);
        self
    }
}
