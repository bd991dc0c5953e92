//! Per-user rate limiting middleware

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::RwLock;
use tracing::warn;

use super::auth::UserId;
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window; 0 disables limiting
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(120)
    }
}

#[derive(Clone)]
struct UserWindow {
    request_count: u32,
    window_start: Instant,
}

/// Fixed-window request counter keyed by user id
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    users: Arc<RwLock<HashMap<String, UserWindow>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Count a request for `user_id`; false once the window is used up.
    pub async fn check(&self, user_id: &str) -> bool {
        self.check_at(user_id, Instant::now()).await
    }

    async fn check_at(&self, user_id: &str, now: Instant) -> bool {
        if self.config.max_requests == 0 {
            return true;
        }

        let mut users = self.users.write().await;
        let state = users.entry(user_id.to_string()).or_insert(UserWindow {
            request_count: 0,
            window_start: now,
        });

        if now.duration_since(state.window_start) >= self.config.window {
            state.request_count = 0;
            state.window_start = now;
        }

        if state.request_count >= self.config.max_requests {
            warn!("Rate limit exceeded for user: {}", user_id);
            return false;
        }

        state.request_count += 1;
        true
    }

    /// Drop windows that have expired
    pub async fn cleanup(&self) {
        let mut users = self.users.write().await;
        let now = Instant::now();
        users.retain(|_, state| now.duration_since(state.window_start) < self.config.window);
    }

    pub async fn tracked_users(&self) -> usize {
        self.users.read().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Runs after [`super::require_user`], which provides the [`UserId`].
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<UserId>()
        .map(|u| u.0.clone())
        .unwrap_or_default();

    if !limiter.check(&user).await {
        return Err(ApiError::RateLimited);
    }

    Ok(next.run(request).await)
}
