//! Retry policy for idempotent GET calls.
//!
//! Only failures for which [`FusionError::is_transient`] holds are retried.
//! The wait before each retry doubles from the base, is spread by ±25 %
//! jitter, and never exceeds [`MAX_DELAY`]. With the default 500 ms base:
//!
//! | retry | nominal wait | jittered range   |
//! |-------|--------------|------------------|
//! | 1     | 500 ms       | 375 – 625 ms     |
//! | 2     | 1 s          | 750 ms – 1.25 s  |
//! | 3     | 2 s          | 1.5 – 2.5 s      |
//! | 4     | 4 s          | 3 – 5 s          |
//! | 7+    | 30 s (cap)   | 22.5 – 30 s      |
//!
//! A `Retry-After` header on the failed response replaces the computed wait
//! (still capped). Cancellation ends the wait immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::FusionError;

/// Upper bound on any single wait, whether computed or server-requested.
pub(crate) const MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    max_retries: u32,
    base: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            base: Duration::from_millis(backoff_base_ms),
        }
    }

    /// Nominal wait before retry number `retry` (1-based), before jitter.
    fn nominal_wait(&self, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(16);
        self.base.saturating_mul(1 << doublings).min(MAX_DELAY)
    }

    fn wait_before(&self, retry: u32, err: &FusionError) -> Duration {
        if let Some(requested) = err.retry_after() {
            return requested.min(MAX_DELAY);
        }
        let spread = rand::rng().random_range(0.75..=1.25);
        self.nominal_wait(retry).mul_f64(spread).min(MAX_DELAY)
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the retry
    /// allowance is spent.
    ///
    /// # Errors
    ///
    /// The last error from `attempt`, or [`FusionError::Cancelled`] when
    /// `cancel` fires during a wait.
    pub(crate) async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<T, FusionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FusionError>>,
    {
        let mut retry = 0;
        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retry == self.max_retries || !err.is_transient() {
                return Err(err);
            }
            retry += 1;

            let wait = self.wait_before(retry, &err);
            tracing::warn!(
                retry,
                of = self.max_retries,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                server_requested = err.retry_after().is_some(),
                error = %err,
                "transient Fusion API failure"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(FusionError::Cancelled),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;

    fn unavailable(retry_after: Option<Duration>) -> FusionError {
        FusionError::UnexpectedStatus {
            status: 503,
            url: "https://api.example.com/v3/businesses/search".to_owned(),
            retry_after,
        }
    }

    #[test]
    fn schedule_doubles_from_base_and_caps() {
        let policy = RetryPolicy::new(10, 500);
        let waits: Vec<_> = (1..=8).map(|n| policy.nominal_wait(n)).collect();
        assert_eq!(
            waits,
            [
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(16),
                MAX_DELAY,
                MAX_DELAY,
            ]
        );
    }

    #[test]
    fn huge_retry_counts_do_not_overflow() {
        let policy = RetryPolicy::new(u32::MAX, u64::MAX);
        assert_eq!(policy.nominal_wait(u32::MAX), MAX_DELAY);
    }

    #[test]
    fn jitter_stays_within_a_quarter_of_nominal() {
        let policy = RetryPolicy::new(3, 1_000);
        for _ in 0..100 {
            let wait = policy.wait_before(2, &unavailable(None));
            assert!(wait >= Duration::from_millis(1_500), "{wait:?}");
            assert!(wait <= Duration::from_millis(2_500), "{wait:?}");
        }
    }

    #[test]
    fn server_requested_wait_replaces_backoff_but_is_capped() {
        let policy = RetryPolicy::new(3, 500);
        let asked = unavailable(Some(Duration::from_secs(7)));
        assert_eq!(policy.wait_before(1, &asked), Duration::from_secs(7));
        let greedy = unavailable(Some(Duration::from_secs(3_600)));
        assert_eq!(policy.wait_before(1, &greedy), MAX_DELAY);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::new(3, 0)
            .run(&CancellationToken::new(), || {
                let c = Arc::clone(&c);
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(unavailable(None))
                    } else {
                        Ok("found")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "found");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn allowance_is_one_first_try_plus_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::new(2, 0)
            .run(&CancellationToken::new(), || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(unavailable(None))
                }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(FusionError::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn permanent_failures_are_returned_at_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = RetryPolicy::new(3, 0)
            .run(&CancellationToken::new(), || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
                    Err::<(), _>(FusionError::Deserialize {
                        context: "GET /v3/businesses/x".to_owned(),
                        source,
                    })
                }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(FusionError::Deserialize { .. })));
    }

    #[tokio::test]
    async fn cancellation_cuts_the_wait_short() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let started = Instant::now();
        let result = RetryPolicy::new(5, 20_000)
            .run(&cancel, || {
                let c = Arc::clone(&c);
                let trigger = trigger.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    trigger.cancel();
                    Err::<(), _>(unavailable(None))
                }
            })
            .await;

        assert!(matches!(result, Err(FusionError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
