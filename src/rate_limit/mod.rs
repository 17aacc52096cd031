pub mod limiter;
pub mod memory;
pub mod middleware;
pub mod status;
pub mod store;

pub use limiter::RateLimiter;
pub use memory::MemoryStore;
pub use middleware::{
    api_key_mapper, client_ip_key, rate_limit_middleware, KeyMapper, RateLimitApproved,
    RateLimitState,
};
pub use status::Status;
pub use store::Store;
