//! Presentation helpers for current on-call entries

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, TimeZone};

use crate::pagerduty::OnCall;

/// Group name for on-calls that are not attached to a schedule
pub const UNKNOWN_SCHEDULE: &str = "Unknown Schedule";

/// Schedule name an on-call entry is listed under
pub fn schedule_name(oncall: &OnCall) -> &str {
    match &oncall.schedule {
        Some(schedule) if !schedule.name.is_empty() => &schedule.name,
        Some(schedule) if !schedule.summary.is_empty() => &schedule.summary,
        _ => UNKNOWN_SCHEDULE,
    }
}

/// Group on-calls by schedule name, names sorted, input order kept per group.
pub fn group_by_schedule(oncalls: &[OnCall]) -> BTreeMap<&str, Vec<&OnCall>> {
    let mut groups: BTreeMap<&str, Vec<&OnCall>> = BTreeMap::new();
    for oncall in oncalls {
        groups.entry(schedule_name(oncall)).or_default().push(oncall);
    }
    groups
}

/// Human label for the end of a shift, relative to `now` in the same zone.
pub fn until_label<Tz>(end: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let end_date = end.date_naive();
    let today = now.date_naive();

    if end_date == today {
        format!("until {} today", end.format("%-I:%M %p"))
    } else if today.succ_opt() == Some(end_date) {
        format!("until {} tomorrow", end.format("%-I:%M %p"))
    } else {
        format!("until {}", end.format("%a %-I:%M %p"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagerduty::{Schedule, User};
    use chrono::Utc;

    fn oncall(user: &str, schedule: Option<&str>) -> OnCall {
        OnCall {
            user: User {
                id: user.to_string(),
                name: user.to_string(),
                ..Default::default()
            },
            schedule: schedule.map(|name| Schedule {
                id: format!("id-{}", name),
                name: name.to_string(),
                ..Default::default()
            }),
            escalation_policy: None,
            escalation_level: 1,
            start: None,
            end: None,
        }
    }

    #[test]
    fn test_group_by_schedule() {
        let oncalls = vec![
            oncall("ada", Some("Secondary")),
            oncall("bob", None),
            oncall("cy", Some("Primary")),
            oncall("dee", Some("Secondary")),
        ];

        let groups = group_by_schedule(&oncalls);
        let names: Vec<_> = groups.keys().copied().collect();
        assert_eq!(names, vec!["Primary", "Secondary", UNKNOWN_SCHEDULE]);

        let secondary: Vec<_> = groups["Secondary"].iter().map(|o| o.user.id.as_str()).collect();
        assert_eq!(secondary, vec!["ada", "dee"]);
        assert_eq!(groups[UNKNOWN_SCHEDULE][0].user.id, "bob");
    }

    #[test]
    fn test_schedule_name_falls_back_to_summary() {
        let mut entry = oncall("ada", Some(""));
        if let Some(ref mut schedule) = entry.schedule {
            schedule.summary = "Primary (summary)".to_string();
        }
        assert_eq!(schedule_name(&entry), "Primary (summary)");
    }

    #[test]
    fn test_until_label() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        let today = Utc.with_ymd_and_hms(2024, 3, 1, 15, 4, 0).unwrap();
        assert_eq!(until_label(&today, &now), "until 3:04 PM today");

        let tomorrow = Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap();
        assert_eq!(until_label(&tomorrow, &now), "until 9:30 AM tomorrow");

        // 2024-03-04 is a Monday
        let later = Utc.with_ymd_and_hms(2024, 3, 4, 15, 4, 0).unwrap();
        assert_eq!(until_label(&later, &now), "until Mon 3:04 PM");
    }

    #[test]
    fn test_until_label_crosses_month_end() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 22, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(until_label(&end, &now), "until 8:00 AM tomorrow");
    }
}
