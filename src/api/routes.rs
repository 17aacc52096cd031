use crate::{
    api::{health, hello},
    observability::HealthChecker,
    rate_limit::{rate_limit_middleware, RateLimitState},
};
use axum::{
    extract::{FromRef, Request},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use uuid::Uuid;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub health_checker: Arc<HealthChecker>,
}

/// Rate limit policies applied to the API routes
#[derive(Clone)]
pub struct RateLimitPolicies {
    /// Keyed by client address, checked after `api_key`
    pub ip: RateLimitState,
    /// Keyed by presented credential, checked first
    pub api_key: RateLimitState,
}

pub fn create_router(
    health_checker: Arc<HealthChecker>,
    policies: RateLimitPolicies,
    metrics_enabled: bool,
) -> Router {
    let state = AppState { health_checker };

    let mut router = Router::new()
        // Health endpoints are never throttled
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .merge(api_routes(policies));

    if metrics_enabled {
        router = router.route("/metrics", get(health::metrics));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "request",
                        id = %Uuid::new_v4(),
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

fn api_routes(policies: RateLimitPolicies) -> Router<AppState> {
    // The last layer added runs first
    Router::new()
        .route("/hello", get(hello::hello))
        .layer(from_fn_with_state(policies.ip, rate_limit_middleware))
        .layer(from_fn_with_state(policies.api_key, rate_limit_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::{api_key_mapper, MemoryStore, RateLimiter};
    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{self, StatusCode},
    };
    use std::net::SocketAddr;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let store = Arc::new(MemoryStore::new());
        let window = Duration::from_secs(3600);
        let policies = RateLimitPolicies {
            ip: RateLimitState::new("ip", RateLimiter::new(store.clone(), 1, window), None),
            api_key: RateLimitState::new(
                "api_key",
                RateLimiter::new(store, 2, window),
                Some(api_key_mapper("API_KEY")),
            ),
        };
        create_router(Arc::new(HealthChecker::new(None)), policies, true)
    }

    fn get_request(uri: &str) -> Request {
        let addr: SocketAddr = "198.51.100.4:40000".parse().unwrap();
        http::Request::builder()
            .uri(uri)
            .extension(ConnectInfo(addr))
            .body(Body::empty())
            .unwrap()
    }

    async fn status_of(app: &Router, request: Request) -> StatusCode {
        app.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_hello_is_rate_limited_by_ip() {
        let app = test_router();

        assert_eq!(status_of(&app, get_request("/hello")).await, StatusCode::OK);
        assert_eq!(
            status_of(&app, get_request("/hello")).await,
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_api_key_policy_takes_precedence() {
        let app = test_router();

        for _ in 0..2 {
            let mut request = get_request("/hello");
            request
                .headers_mut()
                .insert("api_key", "token".parse().unwrap());
            assert_eq!(status_of(&app, request).await, StatusCode::OK);
        }

        let mut request = get_request("/hello");
        request
            .headers_mut()
            .insert("api_key", "token".parse().unwrap());
        assert_eq!(status_of(&app, request).await, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_health_is_not_rate_limited() {
        let app = test_router();

        for _ in 0..3 {
            assert_eq!(status_of(&app, get_request("/health/live")).await, StatusCode::OK);
        }
        assert_eq!(status_of(&app, get_request("/health/ready")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = test_router();
        assert_eq!(status_of(&app, get_request("/metrics")).await, StatusCode::OK);
    }
}
