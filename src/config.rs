use crate::errors::{AppError, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub redis: RedisConfig,
    pub rate_limit: RateLimitConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Period of the in-memory idle key sweep, 0 disables it
    pub sweep_interval_seconds: u64,
    pub idle_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub address: String,
    pub password: Option<String>,
    pub connection_timeout_seconds: u64,
    pub command_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub ip_limit: u64,
    pub ip_window_seconds: u64,
    pub api_key_limit: u64,
    pub api_key_window_seconds: u64,
    pub api_key_header: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl StoreConfig {
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_seconds > 0).then(|| Duration::from_secs(self.sweep_interval_seconds))
    }

    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_seconds)
    }
}

impl RedisConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl RateLimitConfig {
    pub fn ip_window(&self) -> Duration {
        Duration::from_secs(self.ip_window_seconds)
    }

    pub fn api_key_window(&self) -> Duration {
        Duration::from_secs(self.api_key_window_seconds)
    }
}

// Flat variable names accepted for compatibility with existing deployments
const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("IP_LIMIT", "rate_limit.ip_limit"),
    ("IP_LIMIT_DURATION", "rate_limit.ip_window_seconds"),
    ("API_KEY_LIMIT", "rate_limit.api_key_limit"),
    ("API_KEY_LIMIT_DURATION", "rate_limit.api_key_window_seconds"),
    ("REDIS_ADDRESS", "redis.address"),
    ("REDIS_PASSWORD", "redis.password"),
];

impl Config {
    /// Load configuration from defaults, files and environment variables
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        if dotenvy::dotenv().is_err() {
            tracing::debug!("No .env file found, using environment variables");
        }

        let environment = env::var("RATE_GUARD_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("store.backend", "memory")?
            .set_default("store.sweep_interval_seconds", 0)?
            .set_default("store.idle_seconds", 3600)?
            .set_default("redis.address", "localhost:6379")?
            .set_default("redis.connection_timeout_seconds", 5)?
            .set_default("redis.command_timeout_ms", 500)?
            .set_default("rate_limit.ip_limit", 10)?
            .set_default("rate_limit.ip_window_seconds", 1)?
            .set_default("rate_limit.api_key_limit", 100)?
            .set_default("rate_limit.api_key_window_seconds", 1)?
            .set_default("rate_limit.api_key_header", "API_KEY")?
            .set_default("observability.log_level", "info")?
            .set_default("observability.log_format", "pretty")?
            .set_default("observability.metrics_enabled", true)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::File::with_name(&format!("config/{}", environment)).required(false),
            )
            // e.g., RATE_GUARD__RATE_LIMIT__IP_LIMIT=5
            .add_source(
                config::Environment::with_prefix("RATE_GUARD")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV_OVERRIDES {
            let value = env::var(var).ok().filter(|v| !v.is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        let config = builder.build()?;
        config
            .try_deserialize()
            .map_err(|e| AppError::Configuration(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Configuration("Invalid port number".to_string()));
        }

        if self.rate_limit.ip_limit == 0 || self.rate_limit.api_key_limit == 0 {
            return Err(AppError::Configuration(
                "Rate limits must be positive".to_string(),
            ));
        }

        if self.rate_limit.api_key_header.is_empty() {
            return Err(AppError::Configuration(
                "API key header name is required".to_string(),
            ));
        }

        if self.store.backend == StoreBackend::Redis && self.redis.address.is_empty() {
            return Err(AppError::Configuration(
                "Redis address is required for the redis backend".to_string(),
            ));
        }

        Ok(())
    }
}
