// Rate Guard Library

pub mod api;
pub mod config;
pub mod errors;
pub mod observability;
pub mod rate_limit;
pub mod redis;

pub use config::Config;
pub use errors::{AppError, Result};
