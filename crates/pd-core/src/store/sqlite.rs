//! KV storage using SQLite

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use super::{CachedValue, KvStore};
use crate::{Error, Result};

/// SQLite-backed KV store
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Open (or create) the database at `db_path`
    pub fn new(db_path: &str) -> Result<Self> {
        debug!("Opening KV database at: {}", db_path);
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        info!("KV store initialized at {}", db_path);
        Ok(store)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<()> {
        self.lock()?.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                stored_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Other("KV store lock poisoned".to_string()))
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<CachedValue>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT value, stored_at FROM kv_store WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((data, stored_at)) => {
                let stored_at = DateTime::parse_from_rfc3339(&stored_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| Error::Other(format!("Corrupt timestamp for {}: {}", key, e)))?;
                Ok(Some(CachedValue { data, stored_at }))
            }
            None => Ok(None),
        }
    }

    fn set_at(&self, key: &str, data: &[u8], stored_at: DateTime<Utc>) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, stored_at) VALUES (?1, ?2, ?3)",
            params![key, data, stored_at.to_rfc3339()],
        )?;
        debug!("Stored {} bytes under {}", data.len(), key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_delete() {
        let store = SqliteKvStore::in_memory().unwrap();
        assert!(store.get("missing").unwrap().is_none());

        store.set("key", b"value").unwrap();
        let value = store.get("key").unwrap().unwrap();
        assert_eq!(value.data, b"value");

        store.set("key", b"replaced").unwrap();
        assert_eq!(store.get("key").unwrap().unwrap().data, b"replaced");

        store.delete("key").unwrap();
        assert!(store.get("key").unwrap().is_none());
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteKvStore::new(path).unwrap();
            store.set("schedules", b"[]").unwrap();
        }

        let store = SqliteKvStore::new(path).unwrap();
        assert_eq!(store.get("schedules").unwrap().unwrap().data, b"[]");
    }
}
