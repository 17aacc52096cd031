use crate::{
    config::RedisConfig,
    errors::{AppError, Result},
};
use redis::{aio::ConnectionManager, Client, IntoConnectionInfo};

/// Create a Redis client and connection manager
pub async fn create_client(config: &RedisConfig) -> Result<ConnectionManager> {
    tracing::info!(address = %config.address, "Creating Redis client");

    let mut info = format!("redis://{}/0", config.address).into_connection_info()?;
    info.redis.password = config.password.clone().filter(|p| !p.is_empty());

    let client = Client::open(info)?;

    let manager = tokio::time::timeout(config.connection_timeout(), ConnectionManager::new(client))
        .await
        .map_err(|_| {
            AppError::Internal(format!(
                "Timed out connecting to Redis at {}",
                config.address
            ))
        })??;

    tracing::info!("Redis client connected");

    Ok(manager)
}

/// Health check for Redis connection
pub async fn health_check(manager: &mut ConnectionManager) -> Result<()> {
    let _: String = redis::cmd("PING").query_async(manager).await?;
    Ok(())
}
