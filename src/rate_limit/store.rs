use crate::rate_limit::status::Status;
use async_trait::async_trait;

/// Key-value persistence for rate limit statuses.
///
/// Every operation is total: backend failures are logged and answered with a
/// fresh [`Status`] instead of an error, so a limiter never blocks a request
/// on store unavailability.
#[async_trait]
pub trait Store: Send + Sync {
    /// Current status of `key`, created fresh when the key is unknown
    async fn get(&self, key: &str) -> Status;

    /// Count one request against `key`, creating it with a count of 1 when unknown
    async fn increment(&self, key: &str) -> Status;

    /// Replace the status of `key` with a fresh one
    async fn reset(&self, key: &str) -> Status;
}
