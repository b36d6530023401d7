pub mod provider;

use std::future::Future;
use std::time::Duration;

/// Stable error codes surfaced to callers. Authentication, permission,
/// and unknown failures are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Quota or rate limit exhausted.
    E001,
    /// Authentication failure.
    E002,
    /// Permission denied.
    E003,
    /// Deadline exceeded.
    E004,
    /// Network failure.
    E005,
    /// Unknown / unclassified.
    E099,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001 => "E001",
            Self::E002 => "E002",
            Self::E003 => "E003",
            Self::E004 => "E004",
            Self::E005 => "E005",
            Self::E099 => "E099",
        }
    }

    /// The bland, client-safe message for this code.
    pub fn public_message(self) -> &'static str {
        match self {
            Self::E001 => "Service temporarily unavailable",
            Self::E002 => "Service configuration error [E002]",
            Self::E003 => "Service configuration error [E003]",
            Self::E004 => "Timeout, try a smaller document",
            Self::E005 => "Network connection error",
            Self::E099 => "Unable to process document [E099]",
        }
    }

    fn is_retryable(self) -> bool {
        matches!(self, Self::E001 | Self::E004 | Self::E005)
    }
}

/// A classified failure from a vision provider call. `detail` carries the
/// full upstream error text for logs; only `code`/`public_message` ever
/// crosses the process boundary.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {detail}", code = self.code.as_str())]
pub struct ClassifiedError {
    pub code: ErrorCode,
    pub detail: String,
}

impl ClassifiedError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self { code, detail: detail.into() }
    }

    pub fn public_message(&self) -> &'static str {
        self.code.public_message()
    }
}

/// Retry bounds for vision calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_wait_ms: u64, max_wait_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_wait: Duration::from_millis(min_wait_ms),
            max_wait: Duration::from_millis(max_wait_ms),
        }
    }

    /// Exponential backoff bounded to `[min_wait, max_wait]`, deterministic
    /// (no jitter) so the schedule itself is a pure, testable function.
    /// `attempt` is 0-indexed: the wait taken *after* that attempt failed.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let scaled = self.min_wait.saturating_mul(1u32 << attempt.min(16));
        scaled.min(self.max_wait).max(self.min_wait)
    }
}

/// Run `f` up to `policy.max_attempts` times, retrying only on a
/// retryable [`ClassifiedError`], sleeping `backoff_for(attempt)` between
/// attempts. Non-retryable errors return immediately after one attempt.
pub async fn call_with_retry<F, Fut>(
    policy: &RetryPolicy,
    mut f: F,
) -> Result<String, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, ClassifiedError>>,
{
    let mut last_err = None;
    for attempt in 0..policy.max_attempts {
        match f().await {
            Ok(text) => return Ok(text),
            Err(e) => {
                let retryable = e.code.is_retryable();
                last_err = Some(e);
                if !retryable || attempt + 1 >= policy.max_attempts {
                    break;
                }
                tokio::time::sleep(policy.backoff_for(attempt)).await;
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_is_bounded_and_monotonic_until_cap() {
        let policy = RetryPolicy::new(5, 2_000, 10_000);
        assert_eq!(policy.backoff_for(0), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(4_000));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(8_000));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(10_000));
        assert_eq!(policy.backoff_for(10), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn retries_transient_errors_up_to_budget() {
        let policy = RetryPolicy::new(3, 1, 2);
        let calls = AtomicU32::new(0);
        let result = call_with_retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ClassifiedError::new(ErrorCode::E004, "timeout"))
                } else {
                    Ok("done".to_string())
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_after_one_attempt() {
        let policy = RetryPolicy::new(5, 1, 2);
        let calls = AtomicU32::new(0);
        let result = call_with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClassifiedError::new(ErrorCode::E002, "bad key")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_budget_and_returns_last_error() {
        let policy = RetryPolicy::new(2, 1, 2);
        let calls = AtomicU32::new(0);
        let result = call_with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ClassifiedError::new(ErrorCode::E001, "rate limited")) }
        })
        .await;
        assert_eq!(result.unwrap_err().code, ErrorCode::E001);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
