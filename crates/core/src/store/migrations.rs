//! Store schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.
//! All migrations are idempotent using CREATE IF NOT EXISTS.

use super::StoreError;
use std::num::ParseIntError;
use tokio_rusqlite::{Connection, params};

/// Migration list: (version, SQL). Applied in order.
const MIGRATIONS: &[(&str, &str)] = &[("1", include_str!("../../migrations/001_kv.sql"))];

/// Run any pending migrations.
///
/// Creates the `_migrations` table if needed, checks the current version,
/// and applies anything newer.
pub(super) async fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.call(|conn| -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for (version, sql) in MIGRATIONS {
            let version_num: i64 = version
                .parse()
                .map_err(|e: ParseIntError| StoreError::Migration(e.to_string()))?;
            if version_num > current {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version_num, chrono::Utc::now().to_rfc3339()],
                )?;
            }
        }

        Ok(())
    })
    .await
    .map_err(StoreError::from)
}
