//! Incident drafting
//!
//! A page is an incident created against a service, optionally assigned to
//! the on-call user it was raised for.

use serde::{Deserialize, Serialize};

use crate::pagerduty::{
    Assignment, CreateIncidentRequest, Incident, IncidentBody, Reference, Service,
};
use crate::{Error, Result};

/// What a page is raised for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PageTarget {
    /// A whole schedule; nobody is assigned directly
    Schedule { id: String, name: String },
    /// A specific on-call user
    User {
        id: String,
        name: String,
        #[serde(default)]
        summary: String,
    },
}

impl PageTarget {
    /// Title used when the user does not type one
    pub fn default_title(&self) -> String {
        match self {
            PageTarget::Schedule { name, .. } => format!("Issue with {} schedule", name),
            PageTarget::User { name, summary, .. } => {
                let who = if name.is_empty() { summary } else { name };
                format!("Paging current on-call: {}", who)
            }
        }
    }

    pub fn assignee_ids(&self) -> Vec<String> {
        match self {
            PageTarget::Schedule { .. } => Vec::new(),
            PageTarget::User { id, .. } => vec![id.clone()],
        }
    }
}

/// Service preselected for a new page
pub fn default_service(services: &[Service]) -> Option<&Service> {
    services.first()
}

/// Incident fields as entered by a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub service_id: String,
    #[serde(default)]
    pub assignee_ids: Vec<String>,
}

impl IncidentDraft {
    pub fn new(title: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            service_id: service_id.into(),
            ..Default::default()
        }
    }

    /// Prefill a draft for `target`, using the first available service.
    pub fn for_target(target: &PageTarget, services: &[Service]) -> Self {
        Self {
            title: target.default_title(),
            description: String::new(),
            service_id: default_service(services)
                .map(|s| s.id.clone())
                .unwrap_or_default(),
            assignee_ids: target.assignee_ids(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_assignee(mut self, user_id: impl Into<String>) -> Self {
        self.assignee_ids.push(user_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.service_id.trim().is_empty() {
            return Err(Error::InvalidIncident(
                "Title and service are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the REST request body
    pub fn to_request(&self) -> CreateIncidentRequest {
        let body = if self.description.trim().is_empty() {
            None
        } else {
            Some(IncidentBody {
                kind: "incident_body".to_string(),
                details: self.description.clone(),
            })
        };

        CreateIncidentRequest {
            incident: Incident {
                id: String::new(),
                kind: "incident".to_string(),
                title: self.title.trim().to_string(),
                body,
                service: Reference::service(&self.service_id),
                assignments: self
                    .assignee_ids
                    .iter()
                    .filter(|id| !id.is_empty())
                    .map(|id| Assignment {
                        assignee: Reference::user(id),
                    })
                    .collect(),
                status: None,
                incident_number: None,
                created_at: None,
                html_url: None,
            },
        }
    }
}
