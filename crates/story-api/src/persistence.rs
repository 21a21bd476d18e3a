//! Trivial key→string preference store (display name, theme) backed by
//! SQLite. Narrative state is deliberately not persisted; a session lives
//! and dies with its process.

use std::fmt;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    NotAttached,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::NotAttached => write!(f, "preference store is not attached"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[derive(Debug)]
pub struct SqlitePrefsStore {
    conn: Connection,
}

impl SqlitePrefsStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), PersistenceError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let store = SqlitePrefsStore::open_in_memory().expect("store opens");
        assert_eq!(store.get("display_name").expect("get"), None);

        store.set("display_name", "Robin Vega").expect("set");
        assert_eq!(
            store.get("display_name").expect("get"),
            Some("Robin Vega".to_string())
        );

        store.set("display_name", "Quinn Marlowe").expect("overwrite");
        assert_eq!(
            store.get("display_name").expect("get"),
            Some("Quinn Marlowe".to_string())
        );
    }

    #[test]
    fn keys_are_independent() {
        let store = SqlitePrefsStore::open_in_memory().expect("store opens");
        store.set("display_name", "Robin").expect("set");
        store.set("theme", "dark").expect("set");
        assert_eq!(store.get("theme").expect("get"), Some("dark".to_string()));
        assert_eq!(
            store.get("display_name").expect("get"),
            Some("Robin".to_string())
        );
    }
}
