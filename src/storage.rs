//! Key-value storage capability. The game core only sees the `Store` trait,
//! so session and stats logic stay testable without a real database; the
//! binary plugs in the sqlite-backed store.

use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemStore {
    map: HashMap<String, String>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_store_roundtrip() {
        let mut store = MemStore::new();
        assert!(store.get("missing").unwrap().is_none());
        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.sqlite");
        let mut store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        assert!(store.get("session").unwrap().is_none());
        store.set("session", "{\"attempt\":1}").unwrap();
        store.set("session", "{\"attempt\":2}").unwrap();
        assert_eq!(
            store.get("session").unwrap().as_deref(),
            Some("{\"attempt\":2}")
        );
    }

    #[test]
    fn test_sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.sqlite");
        {
            let mut store = SqliteStore::open(path.to_str().unwrap()).unwrap();
            store.set("stats", "persisted").unwrap();
        }
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        assert_eq!(store.get("stats").unwrap().as_deref(), Some("persisted"));
    }
}
