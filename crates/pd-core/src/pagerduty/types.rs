//! PagerDuty REST API wire types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schedule as returned by the schedule listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub time_zone: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedule_layers: Vec<ScheduleLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_subcycle: Option<OverrideSubcycle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_schedule: Option<FinalSchedule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleLayer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    pub rotation_virtual_start: DateTime<Utc>,
    pub rotation_turn_length_seconds: i64,
    #[serde(default)]
    pub users: Vec<UserReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideSubcycle {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The rendered schedule after layers and overrides have been applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalSchedule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rendered_schedule_entries: Vec<RenderedScheduleEntry>,
}

/// One on-call entry: `user` is responsible during `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedScheduleEntry {
    pub user: User,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserReference {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub time_zone: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact_methods: Vec<ContactMethod>,
}

impl User {
    /// Name to show, falling back to the summary for reference-only users
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.summary
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactMethod {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub address: String,
}

/// A user currently on call for a schedule or escalation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnCall {
    pub user: User,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<EscalationPolicy>,
    #[serde(default)]
    pub escalation_level: u32,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub num_loops: u32,
}

/// Pagination envelope shared by list endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub more: bool,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulesResponse {
    #[serde(flatten)]
    pub page: ListResponse,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnCallsResponse {
    #[serde(flatten)]
    pub page: ListResponse,
    #[serde(default)]
    pub oncalls: Vec<OnCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub schedule: Schedule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicesResponse {
    #[serde(flatten)]
    pub page: ListResponse,
    #[serde(default)]
    pub services: Vec<Service>,
}

// ============================================================================
// Incident creation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Reference {
    pub fn service(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "service_reference".to_string(),
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "user_reference".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub assignee: Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<IncidentBody>,
    pub service: Reference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignments: Vec<Assignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIncidentRequest {
    pub incident: Incident,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIncidentResponse {
    pub incident: Incident,
}

/// Error envelope returned by the REST API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oncalls_response_parsing() {
        let json = r#"{
            "oncalls": [{
                "user": {"id": "U1", "name": "Ada", "email": "ada@example.com", "type": "user"},
                "schedule": {"id": "S1", "name": "Primary", "type": "schedule_reference"},
                "escalation_level": 1,
                "start": "2024-01-01T00:00:00-05:00",
                "end": null
            }],
            "limit": 25, "offset": 0, "more": false, "total": null
        }"#;

        let response: OnCallsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.page.limit, 25);
        assert_eq!(response.oncalls.len(), 1);

        let oncall = &response.oncalls[0];
        assert_eq!(oncall.user.kind, "user");
        assert_eq!(oncall.schedule.as_ref().unwrap().name, "Primary");
        assert_eq!(
            oncall.start.unwrap(),
            "2024-01-01T05:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert!(oncall.end.is_none());
    }

    #[test]
    fn test_schedule_response_with_final_schedule() {
        let json = r#"{"schedule": {
            "id": "S1",
            "name": "Primary",
            "time_zone": "UTC",
            "final_schedule": {
                "name": "Final Schedule",
                "rendered_schedule_entries": [
                    {"user": {"id": "U1", "summary": "Ada"}, "start": "2024-01-01T00:00:00Z", "end": "2024-01-02T00:00:00Z"}
                ]
            }
        }}"#;

        let response: ScheduleResponse = serde_json::from_str(json).unwrap();
        let entries = &response.schedule.final_schedule.unwrap().rendered_schedule_entries;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user.display_name(), "Ada");
    }

    #[test]
    fn test_incident_request_serialization_omits_empty_fields() {
        let request = CreateIncidentRequest {
            incident: Incident {
                id: String::new(),
                kind: "incident".to_string(),
                title: "Database down".to_string(),
                body: None,
                service: Reference::service("SVC1"),
                assignments: vec![],
                status: None,
                incident_number: None,
                created_at: None,
                html_url: None,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "incident": {
                    "type": "incident",
                    "title": "Database down",
                    "service": {"id": "SVC1", "type": "service_reference"}
                }
            })
        );
    }
}
