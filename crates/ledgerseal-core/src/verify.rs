//! Verifier: recompute the canonical form and check the signature.
//!
//! Uses exactly the same [`canonical_bytes`] as the signer. Any drift between
//! the two would make every legitimate entry look tampered.

use std::fmt;

use serde::Serialize;

use crate::canonical::canonical_bytes;
use crate::crypto::Ed25519Signature;
use crate::entry::{LedgerEntry, SealedEntry};
use crate::keys::KeyRegistry;
use crate::types::EntryId;

/// Why an entry failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum VerifyFailure {
    /// `signature` or `key_id` absent.
    MissingField(&'static str),
    /// `key_id` does not resolve in the registry.
    UnknownKey(String),
    /// The key record's algorithm tag is not supported.
    UnsupportedAlgorithm(String),
    /// The key record does not hold a usable public key.
    InvalidPublicKey(String),
    /// `signature` is not Base64 of a 64-byte signature.
    MalformedSignature,
    /// The signature does not match the canonical bytes.
    SignatureMismatch,
}

impl VerifyFailure {
    /// True only for a well-formed request whose content was altered.
    pub fn is_tampering(&self) -> bool {
        matches!(self, Self::SignatureMismatch)
    }
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing field `{field}`"),
            Self::UnknownKey(id) => write!(f, "unknown key `{id}`"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "unsupported algorithm `{alg}`"),
            Self::InvalidPublicKey(id) => write!(f, "invalid public key for `{id}`"),
            Self::MalformedSignature => f.write_str("malformed signature"),
            Self::SignatureMismatch => f.write_str("signature mismatch"),
        }
    }
}

/// Outcome of verifying one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub valid: bool,
    pub entry_id: EntryId,
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<VerifyFailure>,
}

impl VerificationReport {
    fn valid(entry: &LedgerEntry) -> Self {
        Self {
            valid: true,
            entry_id: entry.entry_id.clone(),
            key_id: entry.key_id.clone(),
            reason: None,
        }
    }

    fn invalid(entry: &LedgerEntry, reason: VerifyFailure) -> Self {
        Self {
            valid: false,
            entry_id: entry.entry_id.clone(),
            key_id: entry.key_id.clone(),
            reason: Some(reason),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The failure, if any.
    pub fn failure(&self) -> Option<&VerifyFailure> {
        self.reason.as_ref()
    }
}

/// Verify a (supposedly) sealed entry against the registry.
pub fn verify(entry: &LedgerEntry, registry: &KeyRegistry) -> VerificationReport {
    match check(entry, registry) {
        Ok(()) => VerificationReport::valid(entry),
        Err(reason) => {
            tracing::debug!(entry_id = %entry.entry_id, %reason, "entry failed verification");
            VerificationReport::invalid(entry, reason)
        }
    }
}

/// Verify a [`SealedEntry`].
pub fn verify_sealed(entry: &SealedEntry, registry: &KeyRegistry) -> VerificationReport {
    verify(entry.as_entry(), registry)
}

fn check(entry: &LedgerEntry, registry: &KeyRegistry) -> Result<(), VerifyFailure> {
    let signature = entry
        .signature
        .as_deref()
        .ok_or(VerifyFailure::MissingField("signature"))?;
    let key_id = entry
        .key_id
        .as_deref()
        .ok_or(VerifyFailure::MissingField("key_id"))?;

    let record = registry
        .resolve(key_id)
        .ok_or_else(|| VerifyFailure::UnknownKey(key_id.to_string()))?;
    if !record.is_supported() {
        return Err(VerifyFailure::UnsupportedAlgorithm(record.key_type.clone()));
    }
    let public_key = record
        .ed25519_key()
        .filter(|pk| pk.is_valid_point())
        .ok_or_else(|| VerifyFailure::InvalidPublicKey(key_id.to_string()))?;

    let signature =
        Ed25519Signature::from_base64(signature).ok_or(VerifyFailure::MalformedSignature)?;

    // canonical_bytes never includes `signature`
    let message = canonical_bytes(entry);
    if public_key.verify(&message, &signature) {
        Ok(())
    } else {
        Err(VerifyFailure::SignatureMismatch)
    }
}
