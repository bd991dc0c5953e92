//! On-call interval resolution
//!
//! Every rendered entry covers the half-open interval `[start, end)`. Relative
//! to a reference instant an entry is past, current or upcoming; the timeline
//! keeps the entries in start order and remembers who is on call now and whose
//! shift comes next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pagerduty::{RenderedScheduleEntry, Schedule};

/// Position of a shift relative to the reference instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftPhase {
    Past,
    Current,
    Upcoming,
}

impl ShiftPhase {
    /// Classify `[start, end)` against `now`. Empty intervals are never current.
    pub fn at(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if end <= now {
            ShiftPhase::Past
        } else if start <= now {
            ShiftPhase::Current
        } else {
            ShiftPhase::Upcoming
        }
    }
}

/// A rendered entry with its phase
#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    pub entry: RenderedScheduleEntry,
    pub phase: ShiftPhase,
}

/// Entries of one schedule ordered by start and classified against one instant
#[derive(Debug, Clone)]
pub struct ShiftTimeline {
    shifts: Vec<Shift>,
    current: Option<usize>,
    next: Option<usize>,
    resolved_at: DateTime<Utc>,
}

/// Order `entries` by start (stable) and classify them against `now`.
pub fn resolve(entries: &[RenderedScheduleEntry], now: DateTime<Utc>) -> ShiftTimeline {
    let mut ordered: Vec<&RenderedScheduleEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.start);

    let mut shifts = Vec::with_capacity(ordered.len());
    let mut current = None;
    let mut next = None;

    for (index, entry) in ordered.into_iter().enumerate() {
        let phase = ShiftPhase::at(entry.start, entry.end, now);
        match phase {
            ShiftPhase::Current if current.is_none() => current = Some(index),
            ShiftPhase::Upcoming if next.is_none() => next = Some(index),
            _ => {}
        }
        shifts.push(Shift {
            entry: entry.clone(),
            phase,
        });
    }

    ShiftTimeline {
        shifts,
        current,
        next,
        resolved_at: now,
    }
}

impl ShiftTimeline {
    /// Resolve the rendered final schedule; a schedule without one is empty.
    pub fn for_schedule(schedule: &Schedule, now: DateTime<Utc>) -> Self {
        let entries = schedule
            .final_schedule
            .as_ref()
            .map(|f| f.rendered_schedule_entries.as_slice())
            .unwrap_or_default();
        resolve(entries, now)
    }

    /// Earliest-starting entry that contains the reference instant
    pub fn current(&self) -> Option<&Shift> {
        self.current.map(|i| &self.shifts[i])
    }

    /// Earliest entry that starts after the reference instant
    pub fn next(&self) -> Option<&Shift> {
        self.next.map(|i| &self.shifts[i])
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    pub fn past(&self) -> impl Iterator<Item = &Shift> {
        self.in_phase(ShiftPhase::Past)
    }

    pub fn upcoming(&self) -> impl Iterator<Item = &Shift> {
        self.in_phase(ShiftPhase::Upcoming)
    }

    fn in_phase(&self, phase: ShiftPhase) -> impl Iterator<Item = &Shift> {
        self.shifts.iter().filter(move |s| s.phase == phase)
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// Serializable projection for API responses
    pub fn view(&self, schedule: &Schedule) -> TimelineView {
        TimelineView {
            schedule_id: schedule.id.clone(),
            schedule_name: schedule.name.clone(),
            time_zone: schedule.time_zone.clone(),
            resolved_at: self.resolved_at,
            current: self.current().map(ShiftView::from),
            next: self.next().map(ShiftView::from),
            shifts: self.shifts.iter().map(ShiftView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftView {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub avatar_url: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub phase: ShiftPhase,
}

impl From<&Shift> for ShiftView {
    fn from(shift: &Shift) -> Self {
        let user = &shift.entry.user;
        Self {
            user_id: user.id.clone(),
            user_name: user.display_name().to_string(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
            start: shift.entry.start,
            end: shift.entry.end,
            phase: shift.phase,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineView {
    pub schedule_id: String,
    pub schedule_name: String,
    pub time_zone: String,
    pub resolved_at: DateTime<Utc>,
    pub current: Option<ShiftView>,
    pub next: Option<ShiftView>,
    pub shifts: Vec<ShiftView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagerduty::{FinalSchedule, User};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn entry(user: &str, start: u32, end: u32) -> RenderedScheduleEntry {
        RenderedScheduleEntry {
            user: User {
                id: user.to_string(),
                name: user.to_uppercase(),
                ..Default::default()
            },
            start: at(start),
            end: at(end),
        }
    }

    fn ids<'a>(shifts: impl Iterator<Item = &'a Shift>) -> Vec<&'a str> {
        shifts.map(|s| s.entry.user.id.as_str()).collect()
    }

    #[test]
    fn test_phase_boundaries_are_half_open() {
        assert_eq!(ShiftPhase::at(at(8), at(16), at(8)), ShiftPhase::Current);
        assert_eq!(ShiftPhase::at(at(8), at(16), at(16)), ShiftPhase::Past);
        assert_eq!(ShiftPhase::at(at(8), at(16), at(7)), ShiftPhase::Upcoming);
    }

    #[test]
    fn test_empty_interval_is_never_current() {
        assert_eq!(ShiftPhase::at(at(8), at(8), at(8)), ShiftPhase::Past);
        assert_eq!(ShiftPhase::at(at(9), at(8), at(8)), ShiftPhase::Upcoming);
        assert_eq!(ShiftPhase::at(at(9), at(8), at(10)), ShiftPhase::Past);
    }

    #[test]
    fn test_resolve_empty() {
        let timeline = resolve(&[], at(12));
        assert!(timeline.is_empty());
        assert!(timeline.current().is_none());
        assert!(timeline.next().is_none());
    }

    #[test]
    fn test_resolve_current_and_next() {
        let entries = vec![
            entry("a", 0, 8),
            entry("b", 8, 16),
            entry("c", 16, 23),
        ];

        let timeline = resolve(&entries, at(10));
        assert_eq!(timeline.current().unwrap().entry.user.id, "b");
        assert_eq!(timeline.next().unwrap().entry.user.id, "c");
        assert_eq!(ids(timeline.past()), vec!["a"]);
        assert_eq!(ids(timeline.upcoming()), vec!["c"]);
        assert_eq!(timeline.resolved_at(), at(10));
    }

    #[test]
    fn test_resolve_orders_unsorted_input() {
        let entries = vec![
            entry("c", 16, 23),
            entry("a", 0, 8),
            entry("b", 8, 16),
        ];

        let timeline = resolve(&entries, at(4));
        assert_eq!(ids(timeline.shifts().iter()), vec!["a", "b", "c"]);
        assert_eq!(timeline.current().unwrap().entry.user.id, "a");
        assert_eq!(timeline.next().unwrap().entry.user.id, "b");
    }

    #[test]
    fn test_resolve_gap_has_next_but_no_current() {
        let entries = vec![entry("a", 0, 8), entry("b", 12, 20)];

        let timeline = resolve(&entries, at(10));
        assert!(timeline.current().is_none());
        assert_eq!(timeline.next().unwrap().entry.user.id, "b");
    }

    #[test]
    fn test_resolve_all_past() {
        let entries = vec![entry("a", 0, 8), entry("b", 8, 16)];

        let timeline = resolve(&entries, at(20));
        assert!(timeline.current().is_none());
        assert!(timeline.next().is_none());
        assert_eq!(timeline.past().count(), 2);
    }

    #[test]
    fn test_resolve_overlap_prefers_earliest_start() {
        let entries = vec![entry("override", 9, 11), entry("base", 8, 16)];

        let timeline = resolve(&entries, at(10));
        assert_eq!(timeline.current().unwrap().entry.user.id, "base");
        assert_eq!(
            timeline
                .shifts()
                .iter()
                .filter(|s| s.phase == ShiftPhase::Current)
                .count(),
            2
        );
    }

    #[test]
    fn test_resolve_ties_keep_input_order() {
        let entries = vec![entry("first", 8, 16), entry("second", 8, 12)];

        let timeline = resolve(&entries, at(10));
        assert_eq!(timeline.current().unwrap().entry.user.id, "first");
    }

    #[test]
    fn test_for_schedule_without_final_schedule() {
        let schedule = Schedule {
            id: "S1".to_string(),
            name: "Primary".to_string(),
            ..Default::default()
        };

        let timeline = ShiftTimeline::for_schedule(&schedule, at(10));
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_view_projection() {
        let schedule = Schedule {
            id: "S1".to_string(),
            name: "Primary".to_string(),
            time_zone: "UTC".to_string(),
            final_schedule: Some(FinalSchedule {
                name: "Final Schedule".to_string(),
                rendered_schedule_entries: vec![entry("a", 0, 8), entry("b", 8, 16)],
            }),
            ..Default::default()
        };

        let view = ShiftTimeline::for_schedule(&schedule, at(2)).view(&schedule);
        assert_eq!(view.schedule_id, "S1");
        assert_eq!(view.current.as_ref().unwrap().user_name, "A");
        assert_eq!(view.next.as_ref().unwrap().user_id, "b");
        assert_eq!(view.shifts.len(), 2);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["current"]["phase"], "current");
        assert_eq!(json["shifts"][1]["phase"], "upcoming");
    }
}
