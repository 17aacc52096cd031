use crate::rate_limit::{status::Status, store::Store};
use std::sync::Arc;
use std::time::Duration;

/// Fixed window rate limiter: at most `limit` requests per key in each `window`
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn Store>,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    /// Bind a store to a policy. Arguments are not validated: a zero window
    /// starts a new window on every check.
    pub fn new(store: Arc<dyn Store>, limit: u64, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current status of `key`
    pub async fn get_status(&self, key: &str) -> Status {
        self.store.get(key).await
    }

    /// Decide whether the request identified by `key` must be throttled.
    ///
    /// Allowed requests are counted; throttled ones are not. The sequence
    /// get, reset and increment is not atomic, so concurrent requests for the
    /// same key may overshoot the limit.
    pub async fn should_limit(&self, key: &str) -> bool {
        let mut status = self.store.get(key).await;
        if status.is_expired(self.window) {
            status = self.store.reset(key).await;
        }

        if status.reached_limit(self.limit) {
            tracing::debug!(
                key = %key,
                count = status.count,
                limit = self.limit,
                "Rate limit reached"
            );
            return true;
        }

        self.store.increment(key).await;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::memory::MemoryStore;

    fn limiter(store: &Arc<MemoryStore>, limit: u64, window: Duration) -> RateLimiter {
        RateLimiter::new(store.clone(), limit, window)
    }

    #[test]
    fn test_new_limiter_keeps_policy() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(&store, 5, Duration::from_secs(1));
        assert_eq!(limiter.limit(), 5);
        assert_eq!(limiter.window(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_get_status_of_unknown_key() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(&store, 5, Duration::from_secs(1));

        let status = limiter.get_status("new").await;
        assert_eq!(status.count, 0);
    }

    #[tokio::test]
    async fn test_get_status_of_existing_keys() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(&store, 5, Duration::from_secs(1));

        store.increment("count1").await;
        store.increment("count2").await;
        store.increment("count2").await;

        assert_eq!(limiter.get_status("count1").await.count, 1);
        assert_eq!(limiter.get_status("count2").await.count, 2);
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_limited() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(&store, 5, Duration::from_secs(1));

        assert!(!limiter.should_limit("nonexistent").await);
        assert_eq!(limiter.get_status("nonexistent").await.count, 1);
    }

    #[tokio::test]
    async fn test_below_limit_is_allowed_and_counted() {
        let store = Arc::new(MemoryStore::new());
        store.increment("count1").await;
        let limiter = limiter(&store, 5, Duration::from_secs(60));

        assert!(!limiter.should_limit("count1").await);
        assert_eq!(limiter.get_status("count1").await.count, 2);
    }

    #[tokio::test]
    async fn test_reached_limit_is_not_counted() {
        let store = Arc::new(MemoryStore::new());
        store.increment("count2").await;
        store.increment("count2").await;
        let limiter = limiter(&store, 2, Duration::from_secs(60));

        assert!(limiter.should_limit("count2").await);
        assert_eq!(limiter.get_status("count2").await.count, 2);
    }

    #[tokio::test]
    async fn test_limit_trips_on_the_request_after_the_nth() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(&store, 3, Duration::from_secs(3600));

        for _ in 0..3 {
            assert!(!limiter.should_limit("fresh").await);
        }
        assert_eq!(limiter.get_status("fresh").await.count, 3);

        assert!(limiter.should_limit("fresh").await);
        assert_eq!(limiter.get_status("fresh").await.count, 3);
    }

    #[tokio::test]
    async fn test_expired_window_is_reset_then_counted() {
        let store = Arc::new(MemoryStore::new());
        store.increment("count3").await;
        store.increment("count3").await;
        store.increment("count3").await;
        let limiter = limiter(&store, 2, Duration::ZERO);

        assert!(!limiter.should_limit("count3").await);
        assert_eq!(limiter.get_status("count3").await.count, 1);
    }

    #[tokio::test]
    async fn test_zero_window_starts_a_new_window_every_call() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(&store, 2, Duration::ZERO);

        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
            assert!(!limiter.should_limit("rolling").await);
            assert_eq!(store.get("rolling").await.count, 1);
        }
    }

    #[tokio::test]
    async fn test_keys_are_counted_independently() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(&store, 1, Duration::from_secs(3600));

        assert!(!limiter.should_limit("IP:10.0.0.1").await);
        assert!(!limiter.should_limit("IP:10.0.0.2").await);
        assert!(limiter.should_limit("IP:10.0.0.1").await);
    }
}
