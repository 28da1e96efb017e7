//! # Ledgerseal Store
//!
//! Append-only persistence for sealed ledger entries. Provides a trait-based
//! interface with filesystem, SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! Each accepted entry lands in three structures:
//!
//! - a per-entry record addressed by `entry_id` (the commit point)
//! - a daily log bucketed by the UTC day of `issued_at`
//! - a subject index mapping `subject_ref` to entry ids
//!
//! ## Key Types
//!
//! - [`LedgerStore`] - The async trait for all storage operations
//! - [`FsStore`] - Filesystem layout, the primary backend
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`AppendResult`] - Result of appending an entry
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ledgerseal_store::{FsOptions, FsStore, LedgerStore};
//!
//! async fn example() {
//!     let store = FsStore::open("ledger", FsOptions::default()).unwrap();
//!     let ids = store.lookup_by_subject_ref("github.com/acme/widget@abc123").await.unwrap();
//!     println!("{} entries", ids.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: an existing `entry_id` is never overwritten
//! - **Partial commits are reported**: see [`StoreError::PartialCommit`]
//! - **Index is a cache**: rebuildable from the per-entry records

pub mod error;
pub mod fs;
pub mod memory;
pub mod migration;
pub mod registry;
pub mod sqlite;
pub mod subject;
pub mod traits;

pub use error::{CommitStage, Result, StoreError};
pub use fs::{FsOptions, FsStore, ReconcileReport};
pub use memory::MemoryStore;
pub use registry::{load_registry, save_registry};
pub use sqlite::SqliteStore;
pub use subject::{subject_ref_hash, SubjectIndexRecord, DEFAULT_INDEX_PREFIX_LEN};
pub use traits::{AppendResult, LedgerStore};
