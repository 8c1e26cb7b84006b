use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Seconds until the window reopens, rounded up
    Limited { retry_after: u64 },
}

/// Fixed-window counter per client key, kept in process memory
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    limit: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            limit,
            window,
        }
    }

    pub async fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut windows = self.windows.lock().await;
        // expired windows are dropped so the map tracks only active clients
        windows.retain(|_, w| w.reset_at > now);

        match windows.get_mut(key) {
            None => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                Decision::Allowed
            }
            Some(w) if w.count >= self.limit => {
                let remaining = w.reset_at.saturating_duration_since(now);
                let retry_after = remaining.as_millis().div_ceil(1000) as u64;
                Decision::Limited {
                    retry_after: retry_after.max(1),
                }
            }
            Some(w) => {
                w.count += 1;
                Decision::Allowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn eleventh_request_in_window_is_limited() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        for _ in 0..10 {
            assert_eq!(limiter.check_at("1.2.3.4", start).await, Decision::Allowed);
        }
        assert_eq!(
            limiter.check_at("1.2.3.4", start + Duration::from_millis(500)).await,
            Decision::Limited { retry_after: 60 }
        );
        // other clients are unaffected
        assert_eq!(limiter.check_at("5.6.7.8", start).await, Decision::Allowed);
    }

    #[tokio::test]
    async fn window_reopens_after_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert_eq!(limiter.check_at("k", start).await, Decision::Allowed);
        assert!(matches!(
            limiter.check_at("k", start + Duration::from_secs(59)).await,
            Decision::Limited { retry_after: 1 }
        ));
        assert_eq!(
            limiter.check_at("k", start + Duration::from_secs(60)).await,
            Decision::Allowed
        );
    }
}
