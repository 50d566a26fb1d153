use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::infra::cache::RedisCache;

/// Time window for rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    Minute,
    Hour,
    Day,
}

impl RateWindow {
    pub fn seconds(&self) -> u64 {
        match self {
            RateWindow::Minute => 60,
            RateWindow::Hour => 3600,
            RateWindow::Day => 86400,
        }
    }
}

/// Index of the fixed window containing `now_seconds`.
pub fn window_index(now_seconds: u64, window_seconds: u64) -> u64 {
    now_seconds / window_seconds
}

fn current_window(window_seconds: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    window_index(now, window_seconds)
}

#[derive(Clone)]
pub struct RateLimiter {
    cache: RedisCache,
}

impl RateLimiter {
    pub fn new(cache: RedisCache) -> Self {
        Self { cache }
    }

    /// Counts one attempt for `user_id` and reports whether it went over.
    pub async fn hit_user(
        &self,
        user_id: Uuid,
        action: &str,
        limit: u32,
        window: RateWindow,
    ) -> redis::RedisResult<bool> {
        let key = format!(
            "ratelimit:{}:{}:{}",
            user_id,
            action,
            current_window(window.seconds())
        );
        self.hit(&key, limit, window).await
    }

    /// IP-keyed variant for unauthenticated endpoints.
    pub async fn hit_ip(
        &self,
        ip: &str,
        action: &str,
        limit: u32,
        window: RateWindow,
    ) -> redis::RedisResult<bool> {
        let key = format!(
            "ratelimit:ip:{}:{}:{}",
            ip,
            action,
            current_window(window.seconds())
        );
        self.hit(&key, limit, window).await
    }

    async fn hit(&self, key: &str, limit: u32, window: RateWindow) -> redis::RedisResult<bool> {
        let count = self.cache.incr_with_ttl(key, window.seconds()).await?;
        let limited = count > limit;
        if limited {
            tracing::debug!(key = key, count = count, limit = limit, "Rate limit exceeded");
        }
        Ok(limited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_roll_over_on_boundaries() {
        let minute = RateWindow::Minute.seconds();
        assert_eq!(window_index(0, minute), 0);
        assert_eq!(window_index(59, minute), 0);
        assert_eq!(window_index(60, minute), 1);
        assert_eq!(window_index(86_399, RateWindow::Day.seconds()), 0);
    }
}
