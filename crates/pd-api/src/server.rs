//! HTTP API Server
//!
//! Starts and manages the axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pd_command::CommandHandler;
use pd_core::config::ApiConfig;
use pd_core::{PagerDutyApi, ScheduleCache, SharedConfig};

use crate::middleware::{RateLimitConfig, RateLimiter};
use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: SharedConfig,
    pub pagerduty: Arc<dyn PagerDutyApi>,
    pub cache: ScheduleCache,
    pub commands: Arc<CommandHandler>,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: SharedConfig, pagerduty: Arc<dyn PagerDutyApi>, cache: ScheduleCache) -> Self {
        let limit = config.get().api.rate_limit_per_minute;
        let commands = Arc::new(CommandHandler::new(
            pagerduty.clone(),
            cache.clone(),
            config.clone(),
        ));

        Self {
            config,
            pagerduty,
            cache,
            commands,
            limiter: RateLimiter::new(RateLimitConfig::per_minute(limit)),
        }
    }
}

fn cors_layer(api: &ApiConfig) -> CorsLayer {
    let Some(allowed) = api.allowed_origins.as_ref().filter(|o| !o.is_empty()) else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = allowed
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Router with tracing and CORS applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.get().api);

    Router::new()
        .merge(routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP API server and run until `shutdown` resolves
pub async fn start_server<F>(state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = state.config.get().api.port;

    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.cleanup().await;
        }
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
