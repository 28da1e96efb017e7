//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;

use ledgerseal::{Ledger, LedgerConfig, LedgerError};
use ledgerseal_core::{
    report_hash_of, Ed25519PublicKey, KeyRecord, KeyRegistry, Keypair, LedgerEntry, Outcome,
    SealedEntry, Signer, SubjectType,
};
use ledgerseal_store::{FsOptions, FsStore, MemoryStore};

/// Registry creation time used by fixtures.
pub const FIXTURE_EPOCH: &str = "2026-01-01T00:00:00.000Z";

/// Issuance time of fixture entries.
pub const FIXTURE_ISSUED_AT: &str = "2026-02-01T05:00:00.000Z";

/// A signing key registered as `K1`.
pub struct TestFixture {
    pub keypair: Keypair,
    pub registry: KeyRegistry,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self::from_keypair(Keypair::generate())
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::from_keypair(Keypair::from_seed(&seed))
    }

    fn from_keypair(keypair: Keypair) -> Self {
        let registry = KeyRegistry::new("K1", KeyRecord::ed25519(keypair.public_key(), FIXTURE_EPOCH));
        Self { keypair, registry }
    }

    /// Get the keypair's public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    pub fn signer(&self) -> Signer {
        Signer::new(self.keypair.clone())
    }

    /// An unsigned, valid code entry issued at [`FIXTURE_ISSUED_AT`].
    pub fn entry(&self, id: &str, subject_ref: &str) -> LedgerEntry {
        LedgerEntry::new(
            id,
            FIXTURE_ISSUED_AT,
            SubjectType::Code,
            subject_ref,
            "sv-0.1",
            Outcome::Pass,
            report_hash_of(format!("{id}:{subject_ref}").as_bytes()),
        )
    }

    /// Seal `entry` under the active key.
    ///
    /// # Panics
    ///
    /// If the entry is already sealed or names a key the fixture lacks.
    pub fn seal(&self, entry: &LedgerEntry) -> SealedEntry {
        self.signer()
            .sign(entry, &self.registry)
            .expect("fixture entry should seal")
    }

    /// A signing ledger over a fresh memory store.
    pub fn memory_ledger(&self) -> Ledger<MemoryStore> {
        Ledger::new(
            LedgerConfig::default(),
            MemoryStore::new(),
            self.registry.clone(),
            Some(self.signer()),
        )
    }

    /// A signing ledger over a filesystem store rooted at `root`.
    ///
    /// The registry is kept in memory only; rotation does not write a file.
    pub fn fs_ledger(&self, root: &Path) -> Result<Ledger<FsStore>, LedgerError> {
        let config = LedgerConfig {
            root: root.to_path_buf(),
            ..LedgerConfig::default()
        };
        let store = FsStore::open(root, FsOptions::default())?;
        Ok(Ledger::new(
            config,
            store,
            self.registry.clone(),
            Some(self.signer()),
        ))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixtures with distinct deterministic keys.
pub fn multi_key_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = (i >> 8) as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}
