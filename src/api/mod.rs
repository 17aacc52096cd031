pub mod health;
pub mod hello;
pub mod routes;

pub use routes::{create_router, AppState, RateLimitPolicies};
