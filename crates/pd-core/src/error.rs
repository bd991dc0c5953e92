//! Error types for pd-core

use thiserror::Error;

/// Main error type for pd-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("PagerDuty API error: {message} (code: {code})")]
    PagerDuty { message: String, code: i64 },

    #[error("PagerDuty API error: HTTP {status} - {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid incident: {0}")]
    InvalidIncident(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for pd-core
pub type Result<T> = std::result::Result<T, Error>;
