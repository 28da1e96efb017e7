//! # Ledgerseal
//!
//! A signed, append-only ledger of verification entries.
//!
//! ## Overview
//!
//! Each entry records the outcome of verifying some subject (a commit, an
//! app build, a business) under a policy version. Entries are:
//!
//! - **Canonicalized**: fixed field order, compact JSON, signature excluded
//! - **Signed**: Ed25519 under the registry's active key
//! - **Appended**: never overwritten; a reused id is rejected
//! - **Verifiable forever**: key rotation only adds keys
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ledgerseal::{Ledger, LedgerConfig};
//! use ledgerseal::core::{report_hash_of, LedgerEntry, Outcome, SubjectType};
//!
//! async fn example() {
//!     // Reads the signing key from LEDGERSEAL_SIGNING_KEY
//!     let ledger = Ledger::open(LedgerConfig::at("/var/lib/ledger")).unwrap();
//!
//!     let entry = LedgerEntry::draft(
//!         SubjectType::Code,
//!         "github.com/acme/widget@4f2a9c1",
//!         "sv-0.1",
//!         Outcome::Pass,
//!         report_hash_of(b"full report"),
//!     )
//!     .with_score("security", 8);
//!
//!     let sealed = ledger.issue(entry).await.unwrap();
//!     let report = ledger.verify(sealed.entry_id()).await.unwrap();
//!     assert!(report.is_valid());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `ledgerseal::core` - Entries, canonicalization, signing, verification
//! - `ledgerseal::store` - Storage backends

pub mod config;
pub mod error;
pub mod ledger;

// Re-export component crates
pub use ledgerseal_core as core;
pub use ledgerseal_store as store;

pub use config::{LedgerConfig, DEFAULT_SIGNING_KEY_ENV};
pub use error::{LedgerError, Result};
pub use ledger::Ledger;

// Re-export commonly used core types
pub use ledgerseal_core::{
    EntryId, KeyRecord, KeyRegistry, Keypair, LedgerEntry, Outcome, SealedEntry, SubjectType,
    VerificationReport, VerifyFailure,
};
pub use ledgerseal_store::{FsStore, LedgerStore, MemoryStore, SqliteStore};
