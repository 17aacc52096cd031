// Rate limit statuses kept in a shared Redis instance

use crate::observability::MetricsRecorder;
use crate::rate_limit::{status::Status, store::Store};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;

const VALUE_SEPARATOR: &str = "::";
const BACKEND: &str = "redis";

/// Store backed by Redis string values of the form `<count>::<RFC3339>`.
///
/// Values are written without a TTL; window expiry is decided by the limiter.
/// `increment` is a read-modify-write and is not atomic against concurrent
/// writers of the same key.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    /// Create a store; every command is abandoned after `timeout`
    pub fn new(manager: ConnectionManager, timeout: Duration) -> Self {
        Self { manager, timeout }
    }

    async fn read(&self, key: &str) -> Result<Option<String>, &'static str> {
        let mut manager = self.manager.clone();
        match tokio::time::timeout(self.timeout, manager.get::<_, Option<String>>(key)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "Failed to read rate limit status");
                Err("read_error")
            }
            Err(_) => {
                tracing::warn!(key = %key, "Timed out reading rate limit status");
                Err("timeout")
            }
        }
    }

    async fn write(&self, key: &str, status: &Status) -> bool {
        let mut manager = self.manager.clone();
        let value = format_status(status);
        let reason = match tokio::time::timeout(self.timeout, manager.set::<_, _, ()>(key, value))
            .await
        {
            Ok(Ok(())) => return true,
            Ok(Err(e)) => {
                tracing::warn!(key = %key, error = %e, "Failed to write rate limit status");
                "write_error"
            }
            Err(_) => {
                tracing::warn!(key = %key, "Timed out writing rate limit status");
                "timeout"
            }
        };
        MetricsRecorder::record_store_fallback(BACKEND, reason);
        false
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Status {
        match self.read(key).await {
            Ok(Some(value)) => parse_status(&value),
            Ok(None) => self.reset(key).await,
            Err(reason) => {
                MetricsRecorder::record_store_fallback(BACKEND, reason);
                self.reset(key).await
            }
        }
    }

    async fn increment(&self, key: &str) -> Status {
        let mut status = self.get(key).await;
        status.record_request();
        if !self.write(key, &status).await {
            return status;
        }
        self.get(key).await
    }

    async fn reset(&self, key: &str) -> Status {
        let status = Status::new();
        self.write(key, &status).await;
        status
    }
}

/// Serialize a status as `<count>::<RFC3339 timestamp>`
pub fn format_status(status: &Status) -> String {
    format!(
        "{}{}{}",
        status.count,
        VALUE_SEPARATOR,
        status
            .window_start
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Parse a stored value; fields that fail to parse keep their fresh defaults
pub fn parse_status(value: &str) -> Status {
    let mut status = Status::new();
    let (count, window_start) = match value.split_once(VALUE_SEPARATOR) {
        Some((count, window_start)) => (count, Some(window_start)),
        None => (value, None),
    };

    match count.parse::<u64>() {
        Ok(count) => status.count = count,
        Err(e) => {
            tracing::warn!(value = %value, error = %e, "Malformed count in stored status");
            MetricsRecorder::record_store_fallback(BACKEND, "malformed_count");
        }
    }

    match window_start.map(DateTime::parse_from_rfc3339) {
        Some(Ok(window_start)) => status.window_start = window_start.with_timezone(&Utc),
        Some(Err(e)) => {
            tracing::warn!(value = %value, error = %e, "Malformed timestamp in stored status");
            MetricsRecorder::record_store_fallback(BACKEND, "malformed_timestamp");
        }
        None => {
            tracing::warn!(value = %value, "Missing separator in stored status");
            MetricsRecorder::record_store_fallback(BACKEND, "malformed_timestamp");
        }
    }

    status
}
