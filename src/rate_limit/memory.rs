use crate::rate_limit::{status::Status, store::Store};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// In-process store.
///
/// A single lock guards the whole map, so operations on different keys are
/// serialized too.
#[derive(Default)]
pub struct MemoryStore {
    statuses: Mutex<HashMap<String, Status>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub async fn len(&self) -> usize {
        self.statuses.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.statuses.lock().await.is_empty()
    }

    /// Remove keys whose window started more than `idle` ago.
    ///
    /// Pick `idle` no shorter than the longest window served by this store,
    /// otherwise a key could lose its count before its window ends.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let Ok(idle) = chrono::Duration::from_std(idle) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(idle) else {
            return 0;
        };

        let mut statuses = self.statuses.lock().await;
        let before = statuses.len();
        statuses.retain(|_, status| status.window_start >= cutoff);
        before - statuses.len()
    }

    /// Run [`MemoryStore::evict_idle`] every `interval` on a background task
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, idle: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(idle).await;
                if evicted > 0 {
                    tracing::debug!(evicted = evicted, "Evicted idle rate limit keys");
                }
            }
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Status {
        let mut statuses = self.statuses.lock().await;
        *statuses.entry(key.to_string()).or_insert_with(Status::new)
    }

    async fn increment(&self, key: &str) -> Status {
        let mut statuses = self.statuses.lock().await;
        let status = statuses.entry(key.to_string()).or_insert_with(Status::new);
        status.record_request();
        *status
    }

    async fn reset(&self, key: &str) -> Status {
        let status = Status::new();
        self.statuses.lock().await.insert(key.to_string(), status);
        status
    }
}
