//! SQLite implementation of the LedgerStore trait.
//!
//! The record, log line and index membership are written in one transaction,
//! so this backend never reports a partial commit. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use ledgerseal_core::{EntryId, SealedEntry};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::subject::subject_ref_hash;
use crate::traits::{placement, AppendResult, LedgerStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await?
    }
}

fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn parse_sealed(text: &str) -> Result<SealedEntry> {
    Ok(SealedEntry::from_json(text)?)
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn append(&self, entry: &SealedEntry) -> Result<AppendResult> {
        let day = placement(entry)?;
        let entry = entry.clone();

        self.with_conn(move |conn| {
            let entry_id = entry.entry_id().as_str().to_string();
            let line = entry.to_json();
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO entries (entry_id, issued_at, subject_ref, key_id, sealed)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry_id,
                    entry.issued_at(),
                    entry.subject_ref(),
                    entry.key_id(),
                    line
                ],
            )?;
            if inserted == 0 {
                tracing::debug!(%entry_id, "duplicate entry id, nothing written");
                return Ok(AppendResult::Duplicate);
            }

            tx.execute(
                "INSERT INTO daily_log (day, entry_id, line) VALUES (?1, ?2, ?3)",
                params![format_day(day), entry_id, line],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO subject_index (subject_hash, subject_ref, entry_id)
                 VALUES (?1, ?2, ?3)",
                params![subject_ref_hash(entry.subject_ref()), entry.subject_ref(), entry_id],
            )?;
            tx.commit()?;

            tracing::debug!(%entry_id, %day, "committed entry");
            Ok(AppendResult::Committed)
        })
        .await
    }

    async fn get(&self, entry_id: &EntryId) -> Result<Option<SealedEntry>> {
        let entry_id = entry_id.as_str().to_string();
        self.with_conn(move |conn| {
            let sealed: Option<String> = conn
                .query_row(
                    "SELECT sealed FROM entries WHERE entry_id = ?1",
                    params![entry_id],
                    |row| row.get(0),
                )
                .optional()?;
            sealed.as_deref().map(parse_sealed).transpose()
        })
        .await
    }

    async fn lookup_by_subject_ref(&self, subject_ref: &str) -> Result<Vec<EntryId>> {
        let subject_ref = subject_ref.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT entry_id FROM subject_index
                 WHERE subject_hash = ?1 AND subject_ref = ?2
                 ORDER BY position",
            )?;
            let ids = stmt
                .query_map(params![subject_ref_hash(&subject_ref), subject_ref], |row| {
                    row.get::<_, String>(0)
                })?
                .map(|id| id.map(EntryId::new))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
        .await
    }

    async fn contains(&self, entry_id: &EntryId) -> Result<bool> {
        let entry_id = entry_id.as_str().to_string();
        self.with_conn(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM entries WHERE entry_id = ?1",
                    params![entry_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn entries_for_day(&self, day: NaiveDate) -> Result<Vec<SealedEntry>> {
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare("SELECT line FROM daily_log WHERE day = ?1 ORDER BY position")?;
            let lines = stmt
                .query_map(params![format_day(day)], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            lines.iter().map(|line| parse_sealed(line)).collect()
        })
        .await
    }

    async fn entry_ids(&self) -> Result<Vec<EntryId>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT entry_id FROM entries ORDER BY entry_id")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .map(|id| id.map(EntryId::new))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }
}
