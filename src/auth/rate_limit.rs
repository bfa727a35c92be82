use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use chrono::{DateTime, Utc, Duration};

use crate::config::RateLimitSettings;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_size: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_size: Duration::minutes(1),
            max_requests: 10,  // 10 login attempts per window
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            window_size: Duration::seconds(settings.window_seconds),
            max_requests: settings.login_attempts,
        }
    }
}

#[derive(Debug)]
struct RequestWindow {
    timestamps: Vec<DateTime<Utc>>,
}

impl RequestWindow {
    fn new() -> Self {
        Self {
            timestamps: Vec::new(),
        }
    }

    fn cleanup_old_requests(&mut self, window_size: Duration) {
        let cutoff = Utc::now() - window_size;
        self.timestamps.retain(|ts| *ts > cutoff);
    }
}

/// Sliding-window limiter keyed by an arbitrary string (login email).
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, RequestWindow>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Records a request for `key` and returns whether it is within the limit.
    pub async fn check(&self, key: &str) -> bool {
        let mut windows = self.windows.write().await;

        let window = windows.entry(key.to_string()).or_insert_with(RequestWindow::new);
        window.cleanup_old_requests(self.config.window_size);

        if window.timestamps.len() < self.config.max_requests as usize {
            window.timestamps.push(Utc::now());
            true
        } else {
            false
        }
    }

    pub async fn cleanup(&self) {
        let mut windows = self.windows.write().await;

        // Remove windows with no recent requests
        windows.retain(|_, window| {
            window.cleanup_old_requests(self.config.window_size);
            !window.timestamps.is_empty()
        });
    }

    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration as TokioDuration};

    #[tokio::test]
    async fn test_rate_limiter() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_size: Duration::seconds(1),
            max_requests: 3,
        });

        for _ in 0..3 {
            assert!(limiter.check("ada@example.com").await);
        }
        assert!(!limiter.check("ada@example.com").await);

        // Other keys are unaffected
        assert!(limiter.check("bob@example.com").await);

        sleep(TokioDuration::from_millis(1100)).await;

        assert!(limiter.check("ada@example.com").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_windows() {
        let limiter = RateLimiter::new(RateLimitConfig {
            window_size: Duration::milliseconds(200),
            max_requests: 5,
        });
        limiter.check("ada@example.com").await;
        assert_eq!(limiter.tracked_keys().await, 1);

        sleep(TokioDuration::from_millis(300)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_keys().await, 0);
    }
}
