//! Error types for the Ledger.

use ledgerseal_core::{ConfigError, CoreError, EntryId, ValidationError};
use ledgerseal_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The candidate entry is malformed. Nothing was signed or written.
    #[error("structural error: {0}")]
    Validation(#[from] ValidationError),

    /// Key registry or signing secret needs operator attention.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Encoding or decoding failure in the core.
    #[error("core error: {0}")]
    Core(CoreError),

    /// Storage error, including partial commits.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// An entry with this id already exists. Nothing was written.
    #[error("duplicate entry id: {0}")]
    DuplicateEntryId(EntryId),

    /// No entry with this id.
    #[error("entry not found: {0}")]
    NotFound(EntryId),

    /// The ledger was opened without signing key material.
    #[error("no signing key loaded; ledger is verify-only")]
    NoSigningKey,

    /// Unreadable or inconsistent ledger configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<CoreError> for LedgerError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(e) => Self::Validation(e),
            CoreError::Config(e) => Self::Config(e),
            other => Self::Core(other),
        }
    }
}

impl LedgerError {
    /// Whether the entry was durably committed despite this error.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_committed())
    }
}

/// Result type for Ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
