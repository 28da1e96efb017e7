//! Error types for the ledgerseal core.

use thiserror::Error;

/// Core errors raised while building, signing or decoding entries.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("structural error: {0}")]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// A required field is missing or malformed.
///
/// Raised before signing; a request that fails here never reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("entry is already sealed")]
    AlreadySealed,
}

impl ValidationError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Operator-fixable problems with the key registry or signing secret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("key registry has no active key")]
    NoActiveKey,

    #[error("active key `{0}` is not present in the registry")]
    ActiveKeyMissing(String),

    #[error("key `{0}` is not present in the registry")]
    UnknownKey(String),

    #[error("key id must not be empty")]
    EmptyKeyId,

    #[error("key id `{0}` already exists in the registry")]
    DuplicateKeyId(String),

    #[error("private key must be 32 (seed) or 64 (expanded) bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("expanded private key does not match its embedded public key")]
    InconsistentKeypair,

    #[error("signing key does not match registry record for `{0}`")]
    KeyMismatch(String),

    #[error("key `{key_id}` uses unsupported algorithm `{algorithm}`")]
    UnsupportedAlgorithm { key_id: String, algorithm: String },

    #[error("invalid public key for `{0}`")]
    InvalidPublicKey(String),

    #[error("signing key not configured: {0}")]
    MissingSigningKey(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
