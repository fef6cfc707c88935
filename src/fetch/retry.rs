use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::TranscriptError;

/// Classification of a single failed upstream attempt
#[derive(Debug)]
pub enum FetchFailure {
    /// Worth another attempt: timeouts, connection errors, 5xx responses
    Transient(String),
    /// Not retryable; surfaced to the caller unchanged
    Fatal(TranscriptError),
}

/// Exponential backoff with jitter, bounded by an attempt ceiling
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay before the next attempt, after `attempt` failures
    ///
    /// Doubles from the base up to the cap; jitter lands in the upper half of
    /// the window so concurrent retries spread out.
    fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self
            .base_delay
            .saturating_mul(1u32 << (attempt - 1).min(16));
        let capped_ms = doubled.min(self.max_delay).as_millis() as u64;
        if capped_ms == 0 {
            return Duration::ZERO;
        }
        let half = capped_ms / 2;
        Duration::from_millis(half + rand::rng().random_range(0..=capped_ms - half))
    }

    /// Run `op` until it succeeds, fails fatally, or exhausts the ceiling
    ///
    /// `op` receives the 1-based attempt number. Transient failures past the
    /// last attempt surface as `UpstreamUnavailable`.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, TranscriptError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchFailure>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(FetchFailure::Fatal(err)) => return Err(err),
                Err(FetchFailure::Transient(reason)) if attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{reason}; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(FetchFailure::Transient(reason)) => {
                    return Err(TranscriptError::UpstreamUnavailable(reason));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(10),
            Duration::from_millis(100),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn always_transient_stops_at_the_ceiling() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = policy(3)
            .run(move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(FetchFailure::Transient("boom".to_string()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(TranscriptError::UpstreamUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = policy(5)
            .run(move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(FetchFailure::Fatal(TranscriptError::RateLimited(
                        "slow down".to_string(),
                    )))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            result,
            Err(TranscriptError::RateLimited("slow down".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = policy(3)
            .run(move |attempt| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err(FetchFailure::Transient("flaky".to_string()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
