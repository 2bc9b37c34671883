use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Storage key holding the serialized recipe collection.
pub const RECIPES_KEY: &str = "recipes";
/// Storage key holding the serialized meal-plan collection.
pub const MEAL_PLAN_KEY: &str = "mealPlan";

/// Local key/value storage. Each key holds one serialized blob that is
/// always written whole.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS local_storage (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
            tracing::debug!("local storage schema created");
        }

        Ok(())
    }

    pub fn read_blob(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM local_storage WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn write_blob(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO local_storage (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn delete_blob(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    /// Deserialize the blob under `key`. A missing key yields `None`; a blob
    /// that does not parse is an error.
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.read_blob(key)? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("Stored data under '{key}' is not valid"))?;
        Ok(Some(value))
    }

    pub fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize data for '{key}'"))?;
        self.write_blob(key, &raw)?;
        tracing::debug!(key, bytes = raw.len(), "blob written");
        Ok(())
    }
}
