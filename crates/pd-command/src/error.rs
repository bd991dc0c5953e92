//! Error types (pd-command)

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{0}")]
    Core(#[from] pd_core::Error),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("PagerDuty is not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, CommandError>;
