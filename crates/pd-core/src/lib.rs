//! pd-core: PagerDuty gateway core library
//!
//! REST client for PagerDuty, on-call timeline resolution, incident drafting
//! and the schedule cache shared by the command and HTTP front ends.

pub mod config;
pub mod error;
pub mod pagerduty;
pub mod paging;
pub mod schedule;
pub mod store;

pub use config::{ApiConfig, CacheConfig, Config, PagerDutyConfig, ScheduleConfig, SharedConfig};
pub use error::{Error, Result};
pub use pagerduty::{PagerDutyApi, PagerDutyClient};
pub use paging::{IncidentDraft, PageTarget};
pub use schedule::{ShiftPhase, ShiftTimeline, TimelineView};
pub use store::{InMemoryKvStore, KvStore, ScheduleCache, SqliteKvStore};
