use crate::errors::AppError;
use crate::observability::MetricsRecorder;
use crate::rate_limit::limiter::RateLimiter;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Derives the rate limit key of a request; an empty key disables limiting
pub type KeyMapper = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// Request extension set once a limiter in the chain has approved the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitApproved;

/// State of one rate limiting middleware instance
#[derive(Clone)]
pub struct RateLimitState {
    policy: Arc<str>,
    limiter: Arc<RateLimiter>,
    key_mapper: KeyMapper,
}

impl RateLimitState {
    /// `policy` names the instance in logs and metrics. Without a key mapper
    /// requests are keyed by client address.
    pub fn new(policy: &str, limiter: RateLimiter, key_mapper: Option<KeyMapper>) -> Self {
        Self {
            policy: Arc::from(policy),
            limiter: Arc::new(limiter),
            key_mapper: key_mapper.unwrap_or_else(|| Arc::new(client_ip_key) as KeyMapper),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

/// Key requests by client IP address, e.g. `IP:203.0.113.7`.
///
/// Needs the server to provide `ConnectInfo<SocketAddr>`; returns an empty
/// key when it is missing.
pub fn client_ip_key(request: &Request) -> String {
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("IP:{}", addr.ip()),
        None => {
            tracing::warn!(
                path = %request.uri().path(),
                "Missing client address, skipping rate limit"
            );
            String::new()
        }
    }
}

/// Key requests by the credential presented in `header`, e.g. `API_KEY:abc123`.
///
/// Requests without the header get an empty key.
pub fn api_key_mapper(header: &str) -> KeyMapper {
    let header = header.to_string();
    Arc::new(move |request: &Request| {
        request
            .headers()
            .get(header.as_str())
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| format!("API_KEY:{}", value))
            .unwrap_or_default()
    })
}

/// Rate limiting middleware, used with `axum::middleware::from_fn_with_state`.
///
/// Several instances can be stacked: once one approves a request the ones
/// further in do not charge it again. A request rejected by an outer instance
/// never reaches, and is never counted by, the inner ones.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = (state.key_mapper)(&request);
    if key.is_empty() {
        MetricsRecorder::record_rate_limit_decision(&state.policy, "bypassed");
        return Ok(next.run(request).await);
    }

    if request.extensions().get::<RateLimitApproved>().is_none() {
        if state.limiter.should_limit(&key).await {
            tracing::info!(policy = %state.policy, key = %key, "limited key");
            MetricsRecorder::record_rate_limit_decision(&state.policy, "limited");
            return Err(AppError::RateLimitExceeded);
        }

        tracing::debug!(policy = %state.policy, key = %key, "Request allowed");
        MetricsRecorder::record_rate_limit_decision(&state.policy, "allowed");
        request.extensions_mut().insert(RateLimitApproved);
    }

    Ok(next.run(request).await)
}
