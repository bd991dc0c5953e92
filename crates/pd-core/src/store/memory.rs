//! In-memory KV store backed by DashMap

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{CachedValue, KvStore};
use crate::Result;

#[derive(Clone, Default)]
pub struct InMemoryKvStore {
    entries: Arc<DashMap<String, CachedValue>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    fn set_at(&self, key: &str, data: &[u8], stored_at: DateTime<Utc>) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            CachedValue {
                data: data.to_vec(),
                stored_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
