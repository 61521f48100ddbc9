//! Retry policy for transient API failures.
//!
//! The policy mirrors the behavior of a standard HTTP retry adapter: a fixed
//! retry budget, exponential backoff scaled by a configurable factor, and a
//! fixed set of retryable status codes. When a throttled response carries a
//! `Retry-After` header, that delay takes precedence over the computed
//! backoff (capped at `max_backoff`).

use std::time::{Duration, SystemTime};

use http::{HeaderMap, StatusCode};
use rand::Rng;

/// Status codes retried by default: throttling plus transient server errors.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Controls when and how failed requests are retried.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use uspto_odp::RetryPolicy;
///
/// // Default: 3 retries, backoff factor 1.0, retry on 429/500/502/503/504.
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.delay_for_attempt(1, None), Some(Duration::from_secs(1)));
/// assert_eq!(policy.delay_for_attempt(2, None), Some(Duration::from_secs(2)));
/// assert_eq!(policy.delay_for_attempt(4, None), None);
///
/// // No retries at all.
/// let none = RetryPolicy::none();
/// assert_eq!(none.delay_for_attempt(1, None), None);
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Scales the exponential backoff: delay = `backoff_factor * 2^(n-1)` seconds.
    pub backoff_factor: f64,
    /// Upper bound on any single delay, including `Retry-After` values.
    pub max_backoff: Duration,
    /// HTTP status codes that trigger a retry.
    pub retry_statuses: Vec<u16>,
    /// Randomize each delay to 50-100% of the computed value.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 1.0,
            max_backoff: Duration::from_secs(120),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Returns `true` if the given response status should be retried.
    pub fn should_retry_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    /// Returns the delay before retry attempt `attempt` (1-indexed), or
    /// `None` once the retry budget is exhausted.
    ///
    /// `retry_after` is the server-requested delay from a `Retry-After`
    /// header; when present it replaces the computed backoff, still capped at
    /// `max_backoff`.
    pub fn delay_for_attempt(
        &self,
        attempt: usize,
        retry_after: Option<Duration>,
    ) -> Option<Duration> {
        if attempt > self.max_retries {
            return None;
        }

        if let Some(requested) = retry_after {
            return Some(requested.min(self.max_backoff));
        }

        let exponent = attempt.saturating_sub(1).min(u32::MAX as usize) as u32;
        let multiplier = 2f64.powi(exponent as i32);
        let delay = Duration::from_secs_f64((self.backoff_factor * multiplier).max(0.0))
            .min(self.max_backoff);

        if self.jitter {
            let factor = rand::thread_rng().gen_range(0.5..=1.0);
            Some(delay.mul_f64(factor))
        } else {
            Some(delay)
        }
    }
}

/// Parses a `Retry-After` header value into a delay.
///
/// Supports both delta-seconds (`Retry-After: 60`) and the HTTP-date form
/// (`Retry-After: Wed, 21 Oct 2026 07:28:00 GMT`).
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;

    if let Ok(seconds) = header.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date) = httpdate::parse_http_date(header) {
        if let Ok(until) = date.duration_since(SystemTime::now()) {
            return Some(until);
        }
    }

    None
}
