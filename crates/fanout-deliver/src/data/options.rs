use std::time::Duration;

/// Items above this size are skipped instead of uploaded (20 MiB).
pub const DEFAULT_MAX_ITEM_BYTES: usize = 20 * 1024 * 1024;

/// Configuration for the delivery dispatcher and its agent pool.
///
/// # Examples
///
/// ```
/// use fanout_deliver::DeliveryOptions;
///
/// let options = DeliveryOptions::default().messages_per_second(30).attempts(5);
/// assert_eq!(options.send_interval.as_millis(), 33);
/// ```
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    /// Attempts per stage (mirror upload, forward).
    ///
    /// Default: 3
    pub attempts: u32,

    /// Consecutive failures after which an agent is skipped by selection.
    ///
    /// Default: 3
    pub failure_threshold: u32,

    /// Minimum interval between two sends on the same channel.
    ///
    /// Default: 1s / 15
    pub send_interval: Duration,

    /// Throttle wait when the receiver gives no hint, multiplied by attempt + 1.
    ///
    /// Default: 3s
    pub throttle_step: Duration,

    /// Pause after a non-throttle failure, multiplied by attempt + 1.
    ///
    /// Default: 1s
    pub failure_step: Duration,

    /// Default: 20 MiB
    pub max_item_bytes: usize,

    /// Every item with `index % caption_every == 1` carries an `index/total` caption.
    ///
    /// Default: 10
    pub caption_every: usize,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            failure_threshold: 3,
            send_interval: Duration::from_secs(1) / 15,
            throttle_step: Duration::from_secs(3),
            failure_step: Duration::from_secs(1),
            max_item_bytes: DEFAULT_MAX_ITEM_BYTES,
            caption_every: 10,
        }
    }
}

impl DeliveryOptions {
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    #[must_use]
    pub fn send_interval(mut self, interval: Duration) -> Self {
        self.send_interval = interval;
        self
    }

    /// Derive the send interval from a per-channel message rate.
    #[must_use]
    pub fn messages_per_second(mut self, rate: u32) -> Self {
        self.send_interval = Duration::from_secs(1) / rate.max(1);
        self
    }

    #[must_use]
    pub fn throttle_step(mut self, step: Duration) -> Self {
        self.throttle_step = step;
        self
    }

    #[must_use]
    pub fn failure_step(mut self, step: Duration) -> Self {
        self.failure_step = step;
        self
    }

    #[must_use]
    pub fn max_item_bytes(mut self, max_item_bytes: usize) -> Self {
        self.max_item_bytes = max_item_bytes;
        self
    }

    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn caption_every(mut self, every: usize) -> Self {
        self.caption_every = every.max(1);
        self
    }
}
