use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::TranscriptError;

/// Token bucket shared by every outbound caption fetch
///
/// Tokens refill continuously at `rate` per second up to `burst`. A caller
/// that cannot acquire a token within `max_wait` fails with `RateLimited`
/// instead of blocking indefinitely. State is process-wide and safe for
/// concurrent acquisition; the lock is never held across an await.
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    max_wait: Duration,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    refreshed_at: Instant,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: u32, max_wait: Duration) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            rate: rate.max(0.001),
            burst,
            max_wait,
            state: Mutex::new(BucketState {
                tokens: burst,
                refreshed_at: Instant::now(),
            }),
        }
    }

    /// Acquire one token, waiting at most the configured bound
    pub async fn acquire(&self) -> Result<(), TranscriptError> {
        let deadline = Instant::now() + self.max_wait;
        loop {
            let wait = {
                let mut state = self.state.lock();
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.rate)
            };

            if Instant::now() + wait > deadline {
                return Err(TranscriptError::RateLimited(format!(
                    "no rate-limit token available within {:?}",
                    self.max_wait
                )));
            }
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.refreshed_at).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
        state.refreshed_at = now;
    }
}
