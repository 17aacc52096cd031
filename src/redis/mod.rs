pub mod client;
pub mod store;

pub use client::{create_client, health_check};
pub use store::RedisStore;
