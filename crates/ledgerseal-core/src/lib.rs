//! # Ledgerseal Core
//!
//! Pure primitives for ledgerseal: verification entries, their canonical
//! form, Ed25519 signing and verification, and the key registry.
//!
//! This crate performs no I/O. Persistence lives in `ledgerseal-store`.
//!
//! ## Key Types
//!
//! - [`LedgerEntry`] - A verification entry, sealed or not
//! - [`SealedEntry`] - An entry with `key_id` and `signature` attached
//! - [`KeyRegistry`] - Every key ever used, plus the active pointer
//! - [`Signer`] - Seals entries under the active key
//! - [`VerificationReport`] - Outcome of [`verify`]
//!
//! ## Canonicalization
//!
//! Signatures cover compact JSON in a fixed field order with the signature
//! removed. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod keys;
pub mod signer;
pub mod types;
pub mod validation;
pub mod verify;

pub use canonical::{canonical_bytes, canonical_string, sealed_bytes, FIELD_ORDER};
pub use crypto::{report_hash_of, Ed25519PublicKey, Ed25519Signature, Keypair, Sha256Hash};
pub use entry::{LedgerEntry, SealedEntry};
pub use error::{ConfigError, CoreError, ValidationError};
pub use keys::{generate_key, KeyRecord, KeyRegistry, ALGORITHM_ED25519};
pub use signer::Signer;
pub use types::{format_timestamp, now_timestamp, parse_timestamp, utc_day, EntryId, Outcome, SubjectType};
pub use validation::validate_entry;
pub use verify::{verify, verify_sealed, VerificationReport, VerifyFailure};
