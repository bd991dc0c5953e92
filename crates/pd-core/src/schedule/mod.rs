//! Schedule views: on-call interval resolution and on-call grouping

mod oncall;
mod timeline;

pub use oncall::{UNKNOWN_SCHEDULE, group_by_schedule, schedule_name, until_label};
pub use timeline::{Shift, ShiftPhase, ShiftTimeline, ShiftView, TimelineView, resolve};
