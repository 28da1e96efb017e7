//! # Ledgerseal Testkit
//!
//! Testing utilities for ledgerseal.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known inputs with the exact canonical form and signature
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the canonical encoding and signatures:
//!
//! ```rust
//! use ledgerseal_testkit::vectors::verify_all_vectors;
//!
//! for check in verify_all_vectors() {
//!     assert!(check.passed(), "{}: {}", check.name, check.actual);
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ledgerseal_core::canonical_bytes;
//! use ledgerseal_testkit::generators::{entry_from_params, EntryParams};
//!
//! proptest! {
//!     #[test]
//!     fn canonical_is_deterministic(params: EntryParams) {
//!         let e1 = entry_from_params(&params);
//!         let e2 = entry_from_params(&params);
//!         prop_assert_eq!(canonical_bytes(&e1), canonical_bytes(&e2));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use ledgerseal_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let sealed = fixture.seal(&fixture.entry("E1", "abc"));
//! assert_eq!(sealed.key_id(), "K1");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_key_fixtures, TestFixture};
pub use generators::{entry_from_params, EntryParams};
pub use vectors::{all_vectors, seal_vector, verify_all_vectors, GoldenVector, VectorCheck};
