//! User authentication middleware
//!
//! The chat host proxies requests with the authenticated user's id in a
//! header. Requests without it are rejected.

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

use crate::error::ApiError;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "Mattermost-User-ID";

/// Authenticated user, inserted as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Non-empty user id from the request headers
pub fn user_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub async fn require_user(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let Some(user) = user_id(request.headers()).map(str::to_string) else {
        return Err(ApiError::Unauthorized);
    };

    request.extensions_mut().insert(UserId(user));
    Ok(next.run(request).await)
}
