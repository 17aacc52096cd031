use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub store: ComponentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub backend: String,
    pub status: String,
    pub message: Option<String>,
}

/// Reports whether the rate limit store can serve requests
pub struct HealthChecker {
    redis_manager: Option<ConnectionManager>,
}

impl HealthChecker {
    /// `redis_manager` is `None` when statuses live in process memory
    pub fn new(redis_manager: Option<ConnectionManager>) -> Self {
        Self { redis_manager }
    }

    /// Liveness check - is the service running?
    pub async fn liveness(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: ComponentStatus {
                backend: self.backend().to_string(),
                status: "unknown".to_string(),
                message: None,
            },
        }
    }

    /// Readiness check - can the service handle requests?
    pub async fn readiness(&self) -> HealthStatus {
        let store = self.check_store().await;
        let status = if store.status == "ok" { "ok" } else { "degraded" };

        HealthStatus {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store,
        }
    }

    fn backend(&self) -> &'static str {
        if self.redis_manager.is_some() {
            "redis"
        } else {
            "memory"
        }
    }

    async fn check_store(&self) -> ComponentStatus {
        let Some(manager) = &self.redis_manager else {
            return ComponentStatus {
                backend: self.backend().to_string(),
                status: "ok".to_string(),
                message: None,
            };
        };

        let mut manager = manager.clone();
        match crate::redis::health_check(&mut manager).await {
            Ok(_) => ComponentStatus {
                backend: self.backend().to_string(),
                status: "ok".to_string(),
                message: None,
            },
            Err(e) => ComponentStatus {
                backend: self.backend().to_string(),
                status: "error".to_string(),
                message: Some(format!("Redis check failed: {}", e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_is_always_ready() {
        let checker = HealthChecker::new(None);

        let status = checker.readiness().await;
        assert_eq!(status.status, "ok");
        assert_eq!(status.store.backend, "memory");

        let status = checker.liveness().await;
        assert_eq!(status.status, "ok");
        assert_eq!(status.store.status, "unknown");
    }
}
