//! Per-job request pacing
//!
//! Each job owns one limiter that spaces page navigations to the interval
//! implied by its speed tier. `check` gives an immediate Allow/Deny decision;
//! `acquire` sleeps until the next slot and is what the executor uses.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Rate limit decision for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Request may proceed now
    Allow,
    /// Request is too early; retry after the given duration
    Deny { retry_after: Duration },
}

#[derive(Debug)]
pub struct RequestRateLimiter {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestRateLimiter {
    /// Limiter spacing requests evenly over the given per-minute budget
    #[must_use]
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        Self {
            interval: Duration::from_secs_f64(60.0 / f64::from(rpm)),
            last_request: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Non-blocking decision; consumes the slot when allowed
    pub async fn check(&self) -> RateLimitDecision {
        let mut last = self.last_request.lock().await;
        let now = Instant::now();
        match *last {
            Some(previous) if now.duration_since(previous) < self.interval => {
                RateLimitDecision::Deny {
                    retry_after: self.interval - now.duration_since(previous),
                }
            }
            _ => {
                *last = Some(now);
                RateLimitDecision::Allow
            }
        }
    }

    /// Wait for the next request slot
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let now = Instant::now();
        let ready_at = match *last {
            Some(previous) => previous + self.interval,
            None => now,
        };
        if ready_at > now {
            tokio::time::sleep(ready_at - now).await;
        }
        *last = Some(ready_at.max(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_request_is_allowed() {
        let limiter = RequestRateLimiter::per_minute(60);
        assert_eq!(limiter.check().await, RateLimitDecision::Allow);
    }

    #[tokio::test]
    async fn immediate_second_request_is_denied() {
        let limiter = RequestRateLimiter::per_minute(30);
        assert_eq!(limiter.check().await, RateLimitDecision::Allow);
        match limiter.check().await {
            RateLimitDecision::Deny { retry_after } => {
                assert!(retry_after <= Duration::from_secs(2));
            }
            RateLimitDecision::Allow => panic!("expected denial"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_spaces_requests_to_the_tier_interval() {
        let limiter = RequestRateLimiter::per_minute(120);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        // 120 rpm means one slot every 500ms; third acquire lands at +1s.
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[test]
    fn interval_matches_speed_tiers() {
        assert_eq!(
            RequestRateLimiter::per_minute(30).interval(),
            Duration::from_secs(2)
        );
        assert_eq!(
            RequestRateLimiter::per_minute(60).interval(),
            Duration::from_secs(1)
        );
        assert_eq!(
            RequestRateLimiter::per_minute(120).interval(),
            Duration::from_millis(500)
        );
    }
}
