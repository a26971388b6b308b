use crate::error::FetchError;

/// Returns `true` if the HTTP status code indicates success (2xx).
///
/// # Examples
///
/// ```
/// use fanout_fetch::core::is_success;
///
/// assert!(is_success(200));
/// assert!(is_success(204));
/// assert!(!is_success(301));
/// assert!(!is_success(503));
/// ```
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Decide whether a completed response is usable.
///
/// A body is accepted only when the status is a success, the body is
/// non-empty, and it does not exceed `limit` bytes. Anything else is an
/// attempt failure for the caller to retry.
pub fn accept_body(status: u16, len: usize, limit: usize) -> Result<(), FetchError> {
    if !is_success(status) {
        return Err(FetchError::Status(status));
    }
    if len == 0 {
        return Err(FetchError::EmptyBody);
    }
    if len > limit {
        return Err(FetchError::TooLarge { limit });
    }
    Ok(())
}
