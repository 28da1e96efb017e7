//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
            tracing::info!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: per-entry records, daily log, subject index.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per entry; the commit point
        CREATE TABLE entries (
            entry_id TEXT PRIMARY KEY,
            issued_at TEXT NOT NULL,
            subject_ref TEXT NOT NULL,
            key_id TEXT NOT NULL,
            sealed TEXT NOT NULL              -- canonical form plus signature
        );

        -- Append-only log bucketed by issuance day
        CREATE TABLE daily_log (
            position INTEGER PRIMARY KEY AUTOINCREMENT,
            day TEXT NOT NULL,                -- YYYY-MM-DD of issued_at
            entry_id TEXT NOT NULL UNIQUE REFERENCES entries(entry_id),
            line TEXT NOT NULL
        );

        -- Subject reference index
        CREATE TABLE subject_index (
            position INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_hash TEXT NOT NULL,       -- lowercase hex SHA-256 of subject_ref
            subject_ref TEXT NOT NULL,
            entry_id TEXT NOT NULL REFERENCES entries(entry_id),

            UNIQUE(subject_hash, entry_id)
        );

        CREATE INDEX idx_daily_log_day ON daily_log(day, position);
        CREATE INDEX idx_subject_index_hash ON subject_index(subject_hash, position);
        CREATE INDEX idx_entries_key_id ON entries(key_id);
        "#,
    )?;

    Ok(())
}
