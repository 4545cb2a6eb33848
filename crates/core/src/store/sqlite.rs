//! SQLite-backed store implementation.
//!
//! A single `kv` table holds every namespaced key. Database operations run
//! on a background thread via tokio-rusqlite; WAL mode keeps readers and
//! the writer from blocking each other.

use super::{PersistentStore, StoreError, migrations};
use async_trait::async_trait;
use std::path::Path;
use tokio_rusqlite::{Connection, params};

/// Durable key-value store with an optional byte quota.
///
/// Usage is accounted as the sum of key and value lengths across the `kv`
/// table, checked inside the same call that performs the write.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Connection,
    quota_bytes: Option<u64>,
}

impl SqliteStore {
    /// Open (or create) a database at the given path.
    ///
    /// Applies performance pragmas and runs pending migrations.
    pub async fn open(path: impl AsRef<Path>, quota_bytes: Option<u64>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Self::init(conn, quota_bytes).await
    }

    /// Open an in-memory database with the same pragma configuration.
    pub async fn open_in_memory(quota_bytes: Option<u64>) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Self::init(conn, quota_bytes).await
    }

    async fn init(conn: Connection, quota_bytes: Option<u64>) -> Result<Self, StoreError> {
        conn.call(|conn| -> Result<(), StoreError> {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;",
            )?;
            Ok(())
        })
        .await
        .map_err(StoreError::from)?;

        migrations::run(&conn).await?;

        Ok(Self { conn, quota_bytes })
    }
}

#[async_trait]
impl PersistentStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, StoreError> {
                let result = conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(StoreError::from)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        let quota_bytes = self.quota_bytes;
        let updated_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), StoreError> {
                if let Some(quota) = quota_bytes {
                    let used: i64 = conn.query_row(
                        "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM kv",
                        [],
                        |row| row.get(0),
                    )?;
                    let existing: i64 = conn.query_row(
                        "SELECT COALESCE((SELECT LENGTH(key) + LENGTH(value) FROM kv WHERE key = ?1), 0)",
                        params![key],
                        |row| row.get(0),
                    )?;

                    let needed = (used - existing) as u64 + (key.len() + value.len()) as u64;
                    if needed > quota {
                        return Err(StoreError::QuotaExceeded { needed, quota });
                    }
                }

                conn.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), StoreError> {
                conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(StoreError::from)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.conn
            .call(|conn| -> Result<Vec<String>, StoreError> {
                let mut stmt = conn.prepare("SELECT key FROM kv")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                let mut keys = Vec::new();
                for row in rows {
                    keys.push(row?);
                }
                Ok(keys)
            })
            .await
            .map_err(StoreError::from)
    }
}
