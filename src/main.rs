use rate_guard::{
    api::{create_router, RateLimitPolicies},
    config::{Config, StoreBackend},
    observability::{init_tracing, HealthChecker},
    rate_limit::{api_key_mapper, MemoryStore, RateLimitState, RateLimiter, Store},
    redis::{create_client, RedisStore},
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    // Initialize tracing/logging
    init_tracing(&config.observability)?;

    tracing::info!("Starting Rate Guard service");
    tracing::info!("Configuration loaded: {:?}", config.rate_limit);

    // Select the store shared by every policy
    let (store, redis_manager): (Arc<dyn Store>, _) = match config.store.backend {
        StoreBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            if let Some(interval) = config.store.sweep_interval() {
                store.spawn_sweeper(interval, config.store.idle());
                tracing::info!(
                    interval_seconds = config.store.sweep_interval_seconds,
                    idle_seconds = config.store.idle_seconds,
                    "Idle key sweeper started"
                );
            }
            tracing::info!("Using in-memory rate limit store");
            (store as Arc<dyn Store>, None)
        }
        StoreBackend::Redis => {
            let manager = create_client(&config.redis).await?;
            tracing::info!(address = %config.redis.address, "Using Redis rate limit store");
            let store = RedisStore::new(manager.clone(), config.redis.command_timeout());
            (Arc::new(store) as Arc<dyn Store>, Some(manager))
        }
    };

    let policies = RateLimitPolicies {
        ip: RateLimitState::new(
            "ip",
            RateLimiter::new(
                store.clone(),
                config.rate_limit.ip_limit,
                config.rate_limit.ip_window(),
            ),
            None,
        ),
        api_key: RateLimitState::new(
            "api_key",
            RateLimiter::new(
                store,
                config.rate_limit.api_key_limit,
                config.rate_limit.api_key_window(),
            ),
            Some(api_key_mapper(&config.rate_limit.api_key_header)),
        ),
    };

    // Create router
    let health_checker = Arc::new(HealthChecker::new(redis_manager));
    let app = create_router(
        health_checker,
        policies,
        config.observability.metrics_enabled,
    );

    // Bind server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Client addresses feed the default rate limit key
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    tracing::info!("Server stopped");

    Ok(())
}
