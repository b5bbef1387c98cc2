use std::time::Duration;

/// Calculate the backoff delay after a failed attempt.
///
/// The delay formula is `base^attempt` seconds, saturating on overflow.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use warcmirror_fetch::retry_delay;
///
/// // First failed attempt: base^1
/// assert_eq!(retry_delay(1, 4), Duration::from_secs(4));
///
/// // Second failed attempt: base^2
/// assert_eq!(retry_delay(2, 4), Duration::from_secs(16));
/// ```
pub fn retry_delay(attempt: u32, base: u32) -> Duration {
    Duration::from_secs(u64::from(base).saturating_pow(attempt))
}
