//! Key-value storage and the schedule list cache

mod memory;
mod sqlite;

pub use memory::InMemoryKvStore;
pub use sqlite::SqliteKvStore;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::Result;
use crate::pagerduty::{PagerDutyApi, Schedule};

/// Key the schedule list is cached under
pub const SCHEDULES_CACHE_KEY: &str = "pagerduty_schedules_cache";

/// A stored value and when it was written
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub data: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl CachedValue {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.stored_at
    }
}

/// Byte-oriented key-value storage
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CachedValue>>;

    fn set_at(&self, key: &str, data: &[u8], stored_at: DateTime<Utc>) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        self.set_at(key, data, Utc::now())
    }
}

/// Schedule list cache with a freshness window.
///
/// Fresh entries are served without calling PagerDuty. When the upstream call
/// fails, whatever is stored is served regardless of age; the error surfaces
/// only if nothing was ever cached. Storage errors never hide upstream data.
#[derive(Clone)]
pub struct ScheduleCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl ScheduleCache {
    pub fn new(store: Arc<dyn KvStore>, ttl_secs: u64) -> Self {
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        Self {
            store,
            ttl: Duration::seconds(secs),
        }
    }

    /// Cached schedules and whether they are still fresh at `now`
    pub fn cached(&self, now: DateTime<Utc>) -> Result<Option<(Vec<Schedule>, bool)>> {
        let Some(value) = self.store.get(SCHEDULES_CACHE_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_slice::<Vec<Schedule>>(&value.data) {
            Ok(schedules) => Ok(Some((schedules, value.age(now) < self.ttl))),
            Err(e) => {
                warn!("Discarding unreadable schedule cache: {}", e);
                self.store.delete(SCHEDULES_CACHE_KEY)?;
                Ok(None)
            }
        }
    }

    pub fn store(&self, schedules: &[Schedule], now: DateTime<Utc>) -> Result<()> {
        let data = serde_json::to_vec(schedules)?;
        self.store.set_at(SCHEDULES_CACHE_KEY, &data, now)
    }

    pub fn invalidate(&self) -> Result<()> {
        self.store.delete(SCHEDULES_CACHE_KEY)
    }

    /// All schedules, from the cache when fresh, otherwise from PagerDuty.
    pub async fn schedules(
        &self,
        api: &dyn PagerDutyApi,
        page_limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<Schedule>> {
        let cached = match self.cached(now) {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Schedule cache unreadable, refetching: {}", e);
                if let Err(e) = self.invalidate() {
                    warn!("Failed to clear schedule cache: {}", e);
                }
                None
            }
        };
        if let Some((schedules, true)) = &cached {
            debug!("Serving {} schedules from cache", schedules.len());
            return Ok(schedules.clone());
        }

        match fetch_all_schedules(api, page_limit).await {
            Ok(schedules) => {
                if let Err(e) = self.store(&schedules, now) {
                    warn!("Failed to cache schedules: {}", e);
                }
                Ok(schedules)
            }
            Err(e) => match cached {
                Some((schedules, _)) => {
                    warn!("Schedule refresh failed, serving stale cache: {}", e);
                    Ok(schedules)
                }
                None => Err(e),
            },
        }
    }
}

/// Follow `more` through every page of the schedule list.
pub async fn fetch_all_schedules(api: &dyn PagerDutyApi, page_limit: u32) -> Result<Vec<Schedule>> {
    let limit = page_limit.max(1);
    let mut offset = 0;
    let mut schedules = Vec::new();

    loop {
        let page = api.get_schedules(limit, offset).await?;
        let received = page.schedules.len() as u32;
        schedules.extend(page.schedules);

        if !page.page.more || received == 0 {
            break;
        }
        offset += received;
    }

    Ok(schedules)
}
