//! Sliding-window rate limiting shared by every worker.
//!
//! The limiter keeps the start instants of the most recent calls. A caller
//! may proceed once fewer than `max_calls` of them fall inside the trailing
//! `period`; otherwise it sleeps until the oldest one ages out and tries
//! again. Wake order across waiting workers is unspecified.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Global call budget: at most `max_calls` per trailing `period`.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_calls` calls per `period`.
    ///
    /// A `max_calls` of zero is treated as one.
    pub fn new(max_calls: usize, period: Duration) -> Self {
        let max_calls = max_calls.max(1);
        Self {
            max_calls,
            period,
            window: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until one more call fits in the window, then reserve it.
    ///
    /// Never fails; the only effect is the delay.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                self.evict_expired(&mut window, now);

                if window.len() < self.max_calls {
                    window.push_back(now);
                    return;
                }

                match window.front() {
                    // tokio clamps sleeps past the far future.
                    Some(&oldest) => oldest
                        .checked_add(self.period)
                        .map_or(self.period, |expiry| expiry.saturating_duration_since(now)),
                    None => Duration::ZERO,
                }
            };

            tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            sleep(wait).await;
        }
    }

    /// Number of calls currently counted against the window.
    pub async fn in_window(&self) -> usize {
        let mut window = self.window.lock().await;
        self.evict_expired(&mut window, Instant::now());
        window.len()
    }

    fn evict_expired(&self, window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= self.period {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_limit_does_not_wait() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_window().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_over_limit_waits_for_oldest_to_expire() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();

        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(4)).await;
        limiter.acquire().await;

        limiter.acquire().await;
        // Third call may only start once the first has left the window.
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_never_exceed_window() {
        let max_calls = 3;
        let period = Duration::from_secs(1);
        let limiter = Arc::new(RateLimiter::new(max_calls, period));
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            let stamps = Arc::clone(&stamps);
            handles.push(tokio::spawn(async move {
                for _ in 0..3 {
                    limiter.acquire().await;
                    stamps.lock().unwrap().push(Instant::now());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut stamps = stamps.lock().unwrap().clone();
        stamps.sort();
        assert_eq!(stamps.len(), 24);

        // Any max_calls + 1 consecutive calls must span at least one period.
        for pair in stamps.windows(max_calls + 1) {
            let span = pair[max_calls].duration_since(pair[0]);
            assert!(span >= period, "{} calls within {:?}", max_calls + 1, span);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_acquire_is_pending_until_window_frees() {
        let limiter = RateLimiter::new(1, Duration::from_secs(5));
        limiter.acquire().await;

        let mut blocked = tokio_test::task::spawn(limiter.acquire());
        tokio_test::assert_pending!(blocked.poll());

        tokio::time::advance(Duration::from_secs(4)).await;
        tokio_test::assert_pending!(blocked.poll());

        tokio::time::advance(Duration::from_secs(1)).await;
        tokio_test::assert_ready!(blocked.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_drains_after_period() {
        let limiter = RateLimiter::new(5, Duration::from_millis(500));
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.in_window().await, 2);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(limiter.in_window().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_limits_do_not_panic() {
        let limiter = RateLimiter::new(usize::MAX / 2, Duration::from_secs(60));
        limiter.acquire().await;
        assert_eq!(limiter.in_window().await, 1);

        let limiter = RateLimiter::new(1, Duration::from_secs(u64::MAX));
        limiter.acquire().await;

        let mut blocked = tokio_test::task::spawn(limiter.acquire());
        tokio_test::assert_pending!(blocked.poll());
    }

    #[test]
    fn test_zero_calls_treated_as_one() {
        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        assert_eq!(limiter.max_calls(), 1);
        assert_eq!(limiter.period(), Duration::from_secs(1));
    }
}
