//! The `LedgerStore` trait: the abstract interface for entry persistence.
//!
//! Implementations include the filesystem layout (primary), SQLite, and
//! in-memory (for tests).

use async_trait::async_trait;
use chrono::NaiveDate;
use ledgerseal_core::{EntryId, SealedEntry};

use crate::error::{Result, StoreError};

/// Result of appending an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    /// The entry was written to the record, log and index.
    Committed,
    /// An entry with this id already exists. Nothing was written.
    Duplicate,
}

impl AppendResult {
    pub fn is_committed(self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Append-only persistence for sealed entries.
///
/// # Design Notes
///
/// - **No overwrite**: appending an existing `entry_id` returns `Duplicate`
///   and leaves the stored entry untouched, even if the new one differs.
/// - **Commit point**: the per-entry record is authoritative. If it is written
///   but a later write fails the error is [`StoreError::PartialCommit`].
/// - **Issuance day**: the daily log bucket comes from `issued_at`, never
///   from the wall clock at write time.
/// - **No verification**: stores persist what they are given. Callers verify.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a sealed entry.
    async fn append(&self, entry: &SealedEntry) -> Result<AppendResult>;

    /// Get an entry by id.
    async fn get(&self, entry_id: &EntryId) -> Result<Option<SealedEntry>>;

    /// Ids of every entry about `subject_ref`, in append order.
    ///
    /// Reads only the index, never the per-entry records.
    async fn lookup_by_subject_ref(&self, subject_ref: &str) -> Result<Vec<EntryId>>;

    /// Whether an entry with this id exists.
    async fn contains(&self, entry_id: &EntryId) -> Result<bool>;

    /// Entries in the daily log for `day`, in append order.
    async fn entries_for_day(&self, day: NaiveDate) -> Result<Vec<SealedEntry>>;

    /// Ids of every stored entry, sorted.
    async fn entry_ids(&self) -> Result<Vec<EntryId>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<u64>;
}

/// Check that an entry can be placed and return its log day.
pub(crate) fn placement(entry: &SealedEntry) -> Result<NaiveDate> {
    if !entry.entry_id().is_path_safe() {
        return Err(StoreError::InvalidData(format!(
            "entry id `{}` is not a safe record name",
            entry.entry_id()
        )));
    }
    entry.issued_day().ok_or_else(|| {
        StoreError::InvalidData(format!(
            "entry {} has unparseable issued_at `{}`",
            entry.entry_id(),
            entry.issued_at()
        ))
    })
}
