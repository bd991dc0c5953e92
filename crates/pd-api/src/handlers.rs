//! HTTP API handlers

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pd_command::{CommandArgs, CommandResponse};
use pd_core::pagerduty::{
    CreateIncidentResponse, ListResponse, OnCallsResponse, Schedule, SchedulesResponse, Service,
    ServicesResponse,
};
use pd_core::paging::{IncidentDraft, PageTarget};
use pd_core::schedule::{ShiftTimeline, TimelineView};

use crate::error::{ApiError, Result};
use crate::middleware::UserId;
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OnCallsQuery {
    pub schedule_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    pub id: Option<String>,
}

/// Target of the paging dialog
#[derive(Debug, Default, Deserialize)]
pub struct DraftQuery {
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub target_name: Option<String>,
    pub target_summary: Option<String>,
}

/// Prefilled paging dialog: the draft plus the services to choose from
#[derive(Debug, Serialize, Deserialize)]
pub struct DraftResponse {
    pub draft: IncidentDraft,
    pub services: Vec<Service>,
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

fn ensure_configured(state: &AppState) -> Result<()> {
    state.config.get().pagerduty.validate().map_err(|e| {
        debug!("PagerDuty configuration invalid: {}", e);
        ApiError::NotConfigured
    })
}

fn required(value: Option<String>, id: &'static str, message: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(id, message))
}

async fn fetch_schedule(state: &AppState, schedule_id: &str) -> Result<Schedule> {
    let now = Utc::now();
    let until = now + state.config.get().schedule.lookahead();

    debug!("Fetching schedule {} until {}", schedule_id, until);
    let response = state
        .pagerduty
        .get_schedule(schedule_id, now, until)
        .await
        .map_err(ApiError::upstream(
            "api.pagerduty.schedule.error",
            "Failed to retrieve schedule details",
        ))?;
    Ok(response.schedule)
}

async fn fetch_services(state: &AppState) -> Result<Vec<Service>> {
    let page_limit = state.config.get().schedule.page_limit;
    let response = state
        .pagerduty
        .get_services(page_limit, 0)
        .await
        .map_err(ApiError::upstream(
            "api.pagerduty.services.error",
            "Failed to retrieve services",
        ))?;
    Ok(response.services)
}

/// Schedule list, served from the cache while fresh
pub async fn get_schedules(State(state): State<AppState>) -> Result<Json<SchedulesResponse>> {
    ensure_configured(&state)?;

    let page_limit = state.config.get().schedule.page_limit;
    let schedules = state
        .cache
        .schedules(state.pagerduty.as_ref(), page_limit, Utc::now())
        .await
        .map_err(ApiError::upstream(
            "api.pagerduty.schedules.error",
            "Failed to retrieve schedules",
        ))?;

    info!("Returning {} schedules", schedules.len());
    Ok(Json(SchedulesResponse {
        page: ListResponse {
            limit: page_limit,
            offset: 0,
            more: false,
            total: Some(schedules.len() as u32),
        },
        schedules,
    }))
}

/// Current on-calls, optionally for one schedule
pub async fn get_oncalls(
    State(state): State<AppState>,
    Query(query): Query<OnCallsQuery>,
) -> Result<Json<OnCallsResponse>> {
    ensure_configured(&state)?;

    let response = match query.schedule_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            debug!("Fetching on-calls for schedule {}", id);
            state.pagerduty.get_oncalls_for_schedule(id).await
        }
        _ => state.pagerduty.get_current_oncalls().await,
    }
    .map_err(ApiError::upstream(
        "api.pagerduty.oncalls.error",
        "Failed to retrieve on-call users",
    ))?;

    Ok(Json(response))
}

/// Schedule with the lookahead window rendered
pub async fn get_schedule(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Schedule>> {
    ensure_configured(&state)?;
    let id = required(query.id, "api.pagerduty.schedule.id.missing", "Schedule ID is required")?;

    let schedule = fetch_schedule(&state, &id).await?;
    info!("Retrieved schedule {} ({})", schedule.id, schedule.name);
    Ok(Json(schedule))
}

/// Resolved shifts of a schedule: who is on call now and who is next
pub async fn get_schedule_timeline(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<TimelineView>> {
    ensure_configured(&state)?;
    let id = required(query.id, "api.pagerduty.schedule.id.missing", "Schedule ID is required")?;

    let schedule = fetch_schedule(&state, &id).await?;
    let timeline = ShiftTimeline::for_schedule(&schedule, Utc::now());
    Ok(Json(timeline.view(&schedule)))
}

pub async fn get_services(State(state): State<AppState>) -> Result<Json<ServicesResponse>> {
    ensure_configured(&state)?;
    let services = fetch_services(&state).await?;
    Ok(Json(ServicesResponse {
        page: ListResponse {
            total: Some(services.len() as u32),
            ..Default::default()
        },
        services,
    }))
}

/// Prefilled incident for a schedule or on-call user
pub async fn get_incident_draft(
    State(state): State<AppState>,
    Query(query): Query<DraftQuery>,
) -> Result<Json<DraftResponse>> {
    ensure_configured(&state)?;

    let id = required(
        query.target_id,
        "api.pagerduty.draft.target.missing",
        "Target ID is required",
    )?;
    let name = query.target_name.unwrap_or_default();
    let target = match query.target_type.as_deref() {
        Some("schedule") => PageTarget::Schedule { id, name },
        Some("user") => PageTarget::User {
            id,
            name,
            summary: query.target_summary.unwrap_or_default(),
        },
        _ => {
            return Err(ApiError::bad_request(
                "api.pagerduty.draft.target.invalid",
                "Target type must be schedule or user",
            ));
        }
    };

    let services = fetch_services(&state).await?;
    let draft = IncidentDraft::for_target(&target, &services);
    Ok(Json(DraftResponse { draft, services }))
}

pub async fn create_incident(
    State(state): State<AppState>,
    Extension(UserId(user)): Extension<UserId>,
    Json(draft): Json<IncidentDraft>,
) -> Result<(StatusCode, Json<CreateIncidentResponse>)> {
    ensure_configured(&state)?;
    draft
        .validate()
        .map_err(|_| ApiError::bad_request("api.pagerduty.incident.invalid", "Title and service are required"))?;

    let response = state
        .pagerduty
        .create_incident(&draft)
        .await
        .map_err(ApiError::upstream(
            "api.pagerduty.incident.error",
            "Failed to create incident",
        ))?;

    info!(
        "User {} created incident {} on service {}",
        user, response.incident.id, draft.service_id
    );
    Ok((StatusCode::CREATED, Json(response)))
}

/// Execute a `/pagerduty` slash command on behalf of the header user
pub async fn execute_command(
    State(state): State<AppState>,
    Extension(UserId(user)): Extension<UserId>,
    Json(mut args): Json<CommandArgs>,
) -> Json<CommandResponse> {
    args.user_id = user;
    Json(state.commands.handle(&args).await)
}
