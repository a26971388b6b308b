use std::time::Duration;

use crate::error::ChannelError;

const RETRY_AFTER: &str = "retry after ";

/// Extract the `N` of a "retry after N" hint as seconds.
///
/// # Examples
///
/// ```
/// use fanout_deliver::parse_retry_after;
/// use std::time::Duration;
///
/// let hint = parse_retry_after("telegram: Too Many Requests: retry after 5 (429)");
/// assert_eq!(hint, Some(Duration::from_secs(5)));
/// assert_eq!(parse_retry_after("bad request"), None);
/// ```
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let start = message.find(RETRY_AFTER)? + RETRY_AFTER.len();
    let digits: String = message[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok().map(Duration::from_secs)
}

/// How long to wait after a throttle failure on `attempt` (0-based).
///
/// A non-zero hint wins; otherwise the wait escalates as `(attempt + 1) * step`.
pub fn throttle_wait(hint: Option<Duration>, attempt: u32, step: Duration) -> Duration {
    match hint {
        Some(hint) if !hint.is_zero() => hint,
        _ => step.saturating_mul(attempt + 1),
    }
}

/// Pause after a non-throttle failure on `attempt` (0-based).
pub fn failure_wait(attempt: u32, step: Duration) -> Duration {
    step.saturating_mul(attempt + 1)
}

/// Classify a free-form failure message from a channel.
///
/// Messages mentioning HTTP 429 or a "retry after" hint are throttle signals.
pub fn classify(message: &str) -> ChannelError {
    if message.contains("429") || message.contains("retry after") {
        ChannelError::throttled(parse_retry_after(message))
    } else {
        ChannelError::Transient(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("retry after 12"), Some(Duration::from_secs(12)));
        assert_eq!(parse_retry_after("flood: retry after 7s"), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after("retry after soon"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn test_throttle_wait_prefers_hint() {
        let step = Duration::from_secs(3);
        assert_eq!(throttle_wait(Some(Duration::from_secs(5)), 2, step), Duration::from_secs(5));
        assert_eq!(throttle_wait(None, 0, step), Duration::from_secs(3));
        assert_eq!(throttle_wait(None, 2, step), Duration::from_secs(9));
        assert_eq!(throttle_wait(Some(Duration::ZERO), 1, step), Duration::from_secs(6));
    }

    #[test]
    fn test_failure_wait_escalates() {
        assert_eq!(failure_wait(0, Duration::from_secs(1)), Duration::from_secs(1));
        assert_eq!(failure_wait(2, Duration::from_secs(1)), Duration::from_secs(3));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("Too Many Requests: retry after 4"),
            ChannelError::throttled(Some(Duration::from_secs(4)))
        );
        assert_eq!(classify("HTTP 429"), ChannelError::throttled(None));
        assert!(!classify("chat not found").is_throttle());
    }
}
