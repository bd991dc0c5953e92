//! PagerDuty REST API HTTP client

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{Config, PagerDutyConfig, SharedConfig};
use crate::error::{Error, Result};
use crate::paging::IncidentDraft;

use super::types::*;

const ACCEPT_VERSION: &str = "application/vnd.pagerduty+json;version=2";

/// Operations the gateway needs from PagerDuty
#[async_trait]
pub trait PagerDutyApi: Send + Sync {
    async fn get_schedules(&self, limit: u32, offset: u32) -> Result<SchedulesResponse>;

    /// Schedule with entries rendered for `[since, until]`
    async fn get_schedule(
        &self,
        schedule_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<ScheduleResponse>;

    async fn get_current_oncalls(&self) -> Result<OnCallsResponse>;

    async fn get_oncalls_for_schedule(&self, schedule_id: &str) -> Result<OnCallsResponse>;

    async fn get_services(&self, limit: u32, offset: u32) -> Result<ServicesResponse>;

    async fn create_incident(&self, draft: &IncidentDraft) -> Result<CreateIncidentResponse>;
}

/// PagerDuty REST client
///
/// Credentials are read from the shared configuration on every request.
#[derive(Clone)]
pub struct PagerDutyClient {
    client: Client,
    config: SharedConfig,
}

impl PagerDutyClient {
    pub fn new(config: SharedConfig) -> Result<Self> {
        let timeout = config.get().pagerduty.timeout_secs;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .build()
            .map_err(Error::Http)?;

        Ok(Self { client, config })
    }

    /// Client with a fixed token and base URL (empty base URL means the default)
    pub fn with_credentials(api_token: &str, base_url: &str) -> Result<Self> {
        let mut config = Config::default();
        config.pagerduty.api_token = api_token.to_string();
        config.pagerduty.api_base_url = base_url.to_string();
        Self::new(SharedConfig::new(config))
    }

    /// Effective base URL
    pub fn base_url(&self) -> String {
        self.config.get().pagerduty.base_url().to_string()
    }

    /// Raw `/oncalls` query
    pub async fn get_oncalls(&self, params: &[(&str, &str)]) -> Result<OnCallsResponse> {
        self.get(&["oncalls"], params).await
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str], params: &[(&str, &str)]) -> Result<T> {
        let pd = self.config.get().pagerduty;
        let url = endpoint(pd.base_url(), segments)?;

        debug!("GET {}", url);

        let request = self.client.get(url).query(params);
        self.execute(request, &pd).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, segments: &[&str], body: &B) -> Result<T> {
        let pd = self.config.get().pagerduty;
        let url = endpoint(pd.base_url(), segments)?;

        debug!("POST {}", url);

        let mut request = self.client.post(url).json(body);
        if let Some(ref email) = pd.from_email {
            request = request.header("From", email);
        }
        self.execute(request, &pd).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        pd: &PagerDutyConfig,
    ) -> Result<T> {
        let response = request
            .header(AUTHORIZATION, format!("Token token={}", pd.api_token))
            .header(ACCEPT, ACCEPT_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if status.as_u16() >= 400 {
            warn!("PagerDuty API error: {} - {}", status, body);
            return Err(api_error(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(Error::Json)
    }
}

/// Base URL with `segments` appended as encoded path segments.
///
/// `/` inside a segment becomes `%2F`, so ids cannot climb out of their resource.
fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| Error::Config(format!("Invalid API base URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("API base URL cannot have a path: {}", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map an error response to the most specific error available
fn api_error(status: u16, body: String) -> Error {
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(envelope) if !envelope.error.message.is_empty() => Error::PagerDuty {
            message: envelope.error.message,
            code: envelope.error.code,
        },
        _ => Error::UpstreamStatus { status, body },
    }
}

#[async_trait]
impl PagerDutyApi for PagerDutyClient {
    async fn get_schedules(&self, limit: u32, offset: u32) -> Result<SchedulesResponse> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let response: SchedulesResponse = self
            .get(&["schedules"], &[("limit", limit.as_str()), ("offset", offset.as_str())])
            .await?;

        info!("Fetched {} schedules", response.schedules.len());
        Ok(response)
    }

    async fn get_schedule(
        &self,
        schedule_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<ScheduleResponse> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let until = until.to_rfc3339_opts(SecondsFormat::Secs, true);

        self.get(
            &["schedules", schedule_id],
            &[("since", since.as_str()), ("until", until.as_str())],
        )
        .await
    }

    async fn get_current_oncalls(&self) -> Result<OnCallsResponse> {
        self.get_oncalls(&[
            ("time_zone", "UTC"),
            ("include[]", "users"),
            ("include[]", "schedules"),
            ("earliest", "true"),
        ])
        .await
    }

    async fn get_oncalls_for_schedule(&self, schedule_id: &str) -> Result<OnCallsResponse> {
        self.get_oncalls(&[
            ("schedule_ids[]", schedule_id),
            ("include[]", "users"),
            ("earliest", "true"),
        ])
        .await
    }

    async fn get_services(&self, limit: u32, offset: u32) -> Result<ServicesResponse> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        self.get(&["services"], &[("limit", limit.as_str()), ("offset", offset.as_str())])
            .await
    }

    async fn create_incident(&self, draft: &IncidentDraft) -> Result<CreateIncidentResponse> {
        draft.validate()?;

        let response: CreateIncidentResponse =
            self.post(&["incidents"], &draft.to_request()).await?;

        info!(
            "Created incident {} on service {}",
            response.incident.id, draft.service_id
        );
        Ok(response)
    }
}
