//! Route definitions

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::handlers::{
    create_incident, execute_command, get_incident_draft, get_oncalls, get_schedule,
    get_schedule_timeline, get_schedules, get_services, health,
};
use crate::middleware::{rate_limit_middleware, require_user};
use crate::server::AppState;

/// Create the API router
pub fn routes(state: &AppState) -> Router<AppState> {
    // route_layer: unknown paths stay 404 instead of 401
    let api = Router::new()
        .route("/schedules", get(get_schedules))
        .route("/oncalls", get(get_oncalls))
        .route("/schedule", get(get_schedule))
        .route("/schedule/timeline", get(get_schedule_timeline))
        .route("/services", get(get_services))
        .route("/incidents/draft", get(get_incident_draft))
        .route("/incidents", post(create_incident))
        .route("/command", post(execute_command))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn(require_user));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
}
