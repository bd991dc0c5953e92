//! `/pagerduty` command dispatch

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info, warn};

use pd_core::pagerduty::PagerDutyApi;
use pd_core::paging::{IncidentDraft, PageTarget};
use pd_core::schedule::ShiftTimeline;
use pd_core::{ScheduleCache, SharedConfig};

use crate::error::{CommandError, Result};
use crate::render;
use crate::types::{AutocompleteData, CommandArgs, CommandResponse};

/// Slash command trigger word
pub const TRIGGER: &str = "pagerduty";

/// Subcommands as `(name, argument hint, description)`
pub const SUBCOMMANDS: &[(&str, &str, &str)] = &[
    ("help", "", "Show this help message"),
    ("schedules", "", "List all PagerDuty schedules"),
    ("oncall", "", "Show who's currently on-call"),
    ("schedule", "<schedule_id>", "Show the current and upcoming shifts of a schedule"),
    ("services", "", "List PagerDuty services"),
    ("page", "<service_id> <title>", "Create an incident on a service"),
    ("page-oncall", "<schedule_id>", "Page whoever is on call for a schedule"),
];

/// Executes `/pagerduty` commands against PagerDuty
pub struct CommandHandler {
    pagerduty: Arc<dyn PagerDutyApi>,
    cache: ScheduleCache,
    config: SharedConfig,
}

impl CommandHandler {
    pub fn new(pagerduty: Arc<dyn PagerDutyApi>, cache: ScheduleCache, config: SharedConfig) -> Self {
        Self {
            pagerduty,
            cache,
            config,
        }
    }

    /// Autocomplete tree for registration with the chat host
    pub fn autocomplete_data() -> AutocompleteData {
        let names: Vec<&str> = SUBCOMMANDS.iter().map(|(name, _, _)| *name).collect();
        let mut data = AutocompleteData::new(
            TRIGGER,
            "[subcommand]",
            &format!("Available subcommands: {}", names.join(", ")),
        );
        for (name, hint, description) in SUBCOMMANDS {
            data.add_command(AutocompleteData::new(name, hint, description));
        }
        data
    }

    /// Run a command line. Failures are reported in the reply text.
    pub async fn handle(&self, args: &CommandArgs) -> CommandResponse {
        self.handle_at(args, Utc::now()).await
    }

    pub async fn handle_at(&self, args: &CommandArgs, now: DateTime<Utc>) -> CommandResponse {
        let fields: Vec<&str> = args.command.split_whitespace().collect();
        let Some(subcommand) = fields.get(1).copied() else {
            return CommandResponse::ephemeral(render::help_text());
        };
        let rest = &fields[2..];

        debug!("Executing /{} {} for user {}", TRIGGER, subcommand, args.user_id);

        let result = match subcommand {
            "help" => Ok(render::help_text()),
            "schedules" => self.schedules(now).await,
            "oncall" => self.oncall(now).await,
            "schedule" => self.schedule(rest, now).await,
            "services" => self.services().await,
            "page" => self.page(rest).await,
            "page-oncall" => self.page_oncall(rest).await,
            unknown => Ok(format!(
                "Unknown subcommand: {}\n\n{}",
                unknown,
                render::help_text()
            )),
        };

        match result {
            Ok(text) => CommandResponse::ephemeral(text),
            Err(e) => {
                warn!("/{} {} failed: {}", TRIGGER, subcommand, e);
                CommandResponse::ephemeral(failure_text(subcommand, &e))
            }
        }
    }

    fn ensure_configured(&self) -> Result<()> {
        self.config
            .get()
            .pagerduty
            .validate()
            .map_err(|e| CommandError::NotConfigured(e.to_string()))
    }

    async fn schedules(&self, now: DateTime<Utc>) -> Result<String> {
        self.ensure_configured()?;
        let page_limit = self.config.get().schedule.page_limit;
        let schedules = self
            .cache
            .schedules(self.pagerduty.as_ref(), page_limit, now)
            .await?;
        Ok(render::schedules(&schedules))
    }

    async fn oncall(&self, now: DateTime<Utc>) -> Result<String> {
        self.ensure_configured()?;
        let response = self.pagerduty.get_current_oncalls().await?;
        Ok(render::oncalls(&response.oncalls, &now.with_timezone(&Local)))
    }

    async fn schedule(&self, args: &[&str], now: DateTime<Utc>) -> Result<String> {
        let [schedule_id] = args else {
            return Err(CommandError::Usage(format!(
                "/{} schedule <schedule_id>",
                TRIGGER
            )));
        };
        self.ensure_configured()?;

        let lookahead = self.config.get().schedule.lookahead();
        let response = self
            .pagerduty
            .get_schedule(schedule_id, now, now + lookahead)
            .await?;
        let timeline = ShiftTimeline::for_schedule(&response.schedule, now);
        Ok(render::timeline(&response.schedule, &timeline, &Local))
    }

    async fn services(&self) -> Result<String> {
        self.ensure_configured()?;
        let page_limit = self.config.get().schedule.page_limit;
        let response = self.pagerduty.get_services(page_limit, 0).await?;
        Ok(render::services(&response.services))
    }

    async fn page(&self, args: &[&str]) -> Result<String> {
        let [service_id, title @ ..] = args else {
            return Err(CommandError::Usage(format!(
                "/{} page <service_id> <title>",
                TRIGGER
            )));
        };
        if title.is_empty() {
            return Err(CommandError::Usage(format!(
                "/{} page <service_id> <title>",
                TRIGGER
            )));
        }
        self.ensure_configured()?;

        let draft = IncidentDraft::new(title.join(" "), *service_id);
        let response = self.pagerduty.create_incident(&draft).await?;
        info!("Paged service {} via command", service_id);
        Ok(render::incident_created(&response.incident))
    }

    /// Page the first-level on-call of a schedule on the default service.
    async fn page_oncall(&self, args: &[&str]) -> Result<String> {
        let [schedule_id] = args else {
            return Err(CommandError::Usage(format!(
                "/{} page-oncall <schedule_id>",
                TRIGGER
            )));
        };
        self.ensure_configured()?;

        let oncalls = self
            .pagerduty
            .get_oncalls_for_schedule(schedule_id)
            .await?
            .oncalls;
        let oncall = oncalls
            .iter()
            .min_by_key(|o| o.escalation_level)
            .ok_or_else(|| {
                CommandError::NotFound(format!("No one is on call for schedule {}", schedule_id))
            })?;

        let page_limit = self.config.get().schedule.page_limit;
        let services = self.pagerduty.get_services(page_limit, 0).await?.services;

        let target = PageTarget::User {
            id: oncall.user.id.clone(),
            name: oncall.user.name.clone(),
            summary: oncall.user.summary.clone(),
        };
        let draft = IncidentDraft::for_target(&target, &services);
        let response = self.pagerduty.create_incident(&draft).await?;
        info!(
            "Paged on-call {} for schedule {} via command",
            oncall.user.id, schedule_id
        );
        Ok(render::incident_created(&response.incident))
    }
}

fn failure_text(subcommand: &str, error: &CommandError) -> String {
    match (subcommand, error) {
        (_, CommandError::Usage(_) | CommandError::NotConfigured(_) | CommandError::NotFound(_)) => {
            error.to_string()
        }
        ("schedules", _) => format!("Failed to retrieve schedules: {}", error),
        ("oncall", _) => format!("Failed to retrieve on-call users: {}", error),
        ("schedule", _) => format!("Failed to retrieve schedule: {}", error),
        ("services", _) => format!("Failed to retrieve services: {}", error),
        _ => format!("Failed to create incident: {}", error),
    }
}
