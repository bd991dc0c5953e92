//! pd-api: HTTP API for the PagerDuty gateway
//!
//! Serves schedules, on-calls, timelines and paging to the sidebar UI and
//! executes `/pagerduty` commands for the chat host. Built with axum.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{AppState, build_router, start_server};
