use std::time::Duration;

/// Calculate the delay before a retry attempt using linear backoff.
///
/// The delay formula is: `base * attempt`
///
/// # Arguments
///
/// * `attempt` - The attempt about to be made (1 = first retry)
/// * `base` - The base delay duration
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use fanout_fetch::retry_delay;
///
/// // The initial attempt is never delayed
/// assert_eq!(retry_delay(0, Duration::from_secs(2)), Duration::ZERO);
///
/// // First retry: base * 1
/// assert_eq!(retry_delay(1, Duration::from_secs(2)), Duration::from_secs(2));
///
/// // Third retry: base * 3
/// assert_eq!(retry_delay(3, Duration::from_secs(2)), Duration::from_secs(6));
/// ```
pub fn retry_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(attempt)
}
