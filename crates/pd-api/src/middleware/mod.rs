//! Middleware modules
//!
//! User authentication and per-user rate limiting.

pub mod auth;
pub mod rate_limit;

pub use auth::{USER_ID_HEADER, UserId, require_user};
pub use rate_limit::{RateLimitConfig, RateLimiter, rate_limit_middleware};
