//! Error types (pd-api)
//!
//! Every failure is answered with a JSON body `{ "id": ..., "message": ... }`
//! where `id` is a stable identifier clients can match on.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authorized")]
    Unauthorized,

    #[error("Too many requests")]
    RateLimited,

    #[error("Plugin not configured")]
    NotConfigured,

    #[error("{message}")]
    BadRequest { id: &'static str, message: String },

    #[error("{message}: {source}")]
    Upstream {
        id: &'static str,
        message: &'static str,
        #[source]
        source: pd_core::Error,
    },

    #[error("Core error: {0}")]
    Core(#[from] pd_core::Error),
}

impl ApiError {
    pub fn bad_request(id: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            id,
            message: message.into(),
        }
    }

    /// Wrap an upstream failure under an endpoint-specific id
    pub fn upstream(id: &'static str, message: &'static str) -> impl FnOnce(pd_core::Error) -> Self {
        move |source| ApiError::Upstream {
            id,
            message,
            source,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotConfigured => StatusCode::NOT_IMPLEMENTED,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } | ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "api.auth.unauthorized",
            ApiError::RateLimited => "api.rate_limit.exceeded",
            ApiError::NotConfigured => "api.pagerduty.config.invalid",
            ApiError::BadRequest { id, .. } | ApiError::Upstream { id, .. } => *id,
            ApiError::Core(_) => "api.internal.error",
        }
    }

    /// Message shown to clients; upstream details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Upstream { message, .. } => message.to_string(),
            ApiError::Core(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

/// JSON error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub id: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{} ({}): {}", self.id(), status, self);
        }

        if let ApiError::Unauthorized = self {
            return (status, "Not authorized").into_response();
        }

        let body = ErrorBody {
            id: self.id().to_string(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
