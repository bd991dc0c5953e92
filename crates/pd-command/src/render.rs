//! Markdown rendering of command replies

use std::fmt::{Display, Write};

use chrono::{DateTime, TimeZone, Utc};

use pd_core::pagerduty::{Incident, OnCall, Schedule, Service};
use pd_core::schedule::{Shift, ShiftTimeline, group_by_schedule, until_label};

use crate::handler::{SUBCOMMANDS, TRIGGER};

const SHIFT_FORMAT: &str = "%a %b %-d %-I:%M %p";

pub fn help_text() -> String {
    let mut text = String::from("### PagerDuty Plugin Commands\n\n");
    for (name, hint, description) in SUBCOMMANDS {
        if hint.is_empty() {
            let _ = writeln!(text, "* **/{} {}** - {}", TRIGGER, name, description);
        } else {
            let _ = writeln!(text, "* **/{} {} {}** - {}", TRIGGER, name, hint, description);
        }
    }
    text.push_str(
        "\nYou can also click the PagerDuty icon in the channel header to open the sidebar view for more detailed information.",
    );
    text
}

pub fn schedules(schedules: &[Schedule]) -> String {
    if schedules.is_empty() {
        return "No PagerDuty schedules found.".to_string();
    }

    let mut text = String::from("### PagerDuty Schedules\n\n");
    for schedule in schedules {
        let _ = write!(text, "**{}**", schedule.name);
        if !schedule.description.is_empty() {
            let _ = write!(text, " - {}", schedule.description);
        }
        let _ = write!(
            text,
            "\n_Timezone: {}_ `{}`\n\n",
            schedule.time_zone, schedule.id
        );
    }
    text.push_str(
        "\n_Use `/pagerduty oncall` to see who's currently on-call, or `/pagerduty schedule <id>` for the shifts of one schedule._",
    );
    text
}

/// Current on-calls grouped by schedule, end times shown in `now`'s zone
pub fn oncalls<Tz>(oncalls: &[OnCall], now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if oncalls.is_empty() {
        return "No one is currently on-call.".to_string();
    }

    let mut text = String::from("### Currently On-Call\n\n");
    for (schedule, entries) in group_by_schedule(oncalls) {
        let _ = writeln!(text, "**{}**", schedule);
        for oncall in entries {
            let _ = write!(text, "• {}", oncall.user.display_name());
            if !oncall.user.email.is_empty() {
                let _ = write!(text, " ({})", oncall.user.email);
            }
            if let Some(end) = &oncall.end {
                let end = end.with_timezone(&now.timezone());
                let _ = write!(text, " - {}", until_label(&end, now));
            }
            if oncall.escalation_level > 0 {
                let _ = write!(text, " _(escalation level {})_", oncall.escalation_level);
            }
            text.push('\n');
        }
        text.push('\n');
    }
    text.push_str(
        "_Click the PagerDuty icon in the channel header to see the full 24-hour schedule timeline._",
    );
    text
}

/// Who is on call for one schedule, who is next, and the remaining shifts
pub fn timeline<Tz>(schedule: &Schedule, timeline: &ShiftTimeline, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut text = format!("### {}\n\n", schedule.name);
    if !schedule.time_zone.is_empty() {
        let _ = writeln!(text, "_Timezone: {}_\n", schedule.time_zone);
    }

    match timeline.current() {
        Some(shift) => {
            let now = timeline.resolved_at().with_timezone(tz);
            let end = shift.entry.end.with_timezone(tz);
            let _ = writeln!(
                text,
                "**On call now:** {} - {}",
                shift.entry.user.display_name(),
                until_label(&end, &now)
            );
        }
        None => text.push_str("**On call now:** nobody\n"),
    }

    match timeline.next() {
        Some(shift) => {
            let _ = writeln!(
                text,
                "**Next:** {} from {}",
                shift.entry.user.display_name(),
                local(shift.entry.start, tz)
            );
        }
        None => text.push_str("**Next:** no upcoming shift in range\n"),
    }

    let upcoming: Vec<&Shift> = timeline.upcoming().collect();
    if !upcoming.is_empty() {
        text.push_str("\n**Upcoming shifts**\n");
        for shift in upcoming {
            let _ = writeln!(
                text,
                "• {} - {} to {}",
                shift.entry.user.display_name(),
                local(shift.entry.start, tz),
                local(shift.entry.end, tz)
            );
        }
    }
    text
}

pub fn services(services: &[Service]) -> String {
    if services.is_empty() {
        return "No PagerDuty services found.".to_string();
    }

    let mut text = String::from("### PagerDuty Services\n\n");
    for service in services {
        let _ = write!(text, "• **{}** `{}`", service.name, service.id);
        if !service.status.is_empty() {
            let _ = write!(text, " _{}_", service.status);
        }
        text.push('\n');
    }
    text
}

pub fn incident_created(incident: &Incident) -> String {
    let mut text = String::from("Incident created");
    if let Some(number) = incident.incident_number {
        let _ = write!(text, " #{}", number);
    }
    let _ = write!(text, ": **{}**", incident.title);
    if let Some(url) = &incident.html_url {
        let _ = write!(text, "\n{}", url);
    }
    text
}

fn local<Tz>(instant: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    instant.with_timezone(tz).format(SHIFT_FORMAT).to_string()
}
