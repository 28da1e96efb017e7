//! Error types for the store module.

use std::fmt;

use ledgerseal_core::{CoreError, EntryId};
use thiserror::Error;

/// Which write failed after the per-entry record was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    /// Appending the line to the daily log.
    DailyLog,
    /// Adding the entry id to the subject index.
    SubjectIndex,
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DailyLog => f.write_str("daily log"),
            Self::SubjectIndex => f.write_str("subject index"),
        }
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Entry or index serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage, or an entry the store cannot place.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The record was committed but a secondary write failed.
    ///
    /// The entry exists and is authoritative. The named structure is stale
    /// until reconciled from the per-entry records.
    #[error("entry {entry_id} committed but {stage} write failed: {source}")]
    PartialCommit {
        entry_id: EntryId,
        stage: CommitStage,
        #[source]
        source: Box<StoreError>,
    },

    /// Error decoding a stored entry or registry.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub(crate) fn partial(entry_id: &EntryId, stage: CommitStage, source: StoreError) -> Self {
        Self::PartialCommit {
            entry_id: entry_id.clone(),
            stage,
            source: Box::new(source),
        }
    }

    /// Whether the entry was durably committed despite this error.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::PartialCommit { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
