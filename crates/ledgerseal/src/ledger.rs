//! The Ledger: unified API for issuing and verifying entries.
//!
//! The Ledger brings together the key registry, the signer and a store.
//! Signing and persisting stay separate steps underneath; `issue` just runs
//! them in order.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use ledgerseal_core::{
    now_timestamp, validate_entry, verify, verify_sealed, ConfigError, EntryId, KeyRecord,
    KeyRegistry, Keypair, LedgerEntry, SealedEntry, Signer, VerificationReport,
};
use ledgerseal_store::{load_registry, save_registry, AppendResult, FsStore, LedgerStore};
use tokio::sync::RwLock;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// Registry and signing material, swapped together on rotation.
struct KeyState {
    registry: KeyRegistry,
    signer: Option<Signer>,
}

/// The main Ledger struct.
///
/// Provides a unified API for:
/// - Issuing (validate, sign, append) entries
/// - Verifying stored or supplied entries
/// - Looking up entries by subject
/// - Rotating the signing key
pub struct Ledger<S: LedgerStore> {
    config: LedgerConfig,
    store: Arc<S>,
    keys: RwLock<KeyState>,
}

impl Ledger<FsStore> {
    /// Open the filesystem ledger described by `config`.
    ///
    /// The signing key is read from `config.signing_key_env`. If that
    /// variable is unset the ledger opens verify-only; if it is set but
    /// malformed, opening fails.
    pub fn open(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let registry_path = config
            .registry_path
            .as_ref()
            .ok_or_else(|| LedgerError::InvalidConfig("registry_path is not set".into()))?;
        let registry = load_registry(registry_path)?;

        let signer = match Keypair::from_env(&config.signing_key_env) {
            Ok(keypair) => Some(Signer::new(keypair)),
            Err(ConfigError::MissingSigningKey(var)) => {
                tracing::info!(%var, "no signing key in environment, opening verify-only");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let store = FsStore::open(&config.root, config.fs_options())?;
        tracing::info!(
            root = %config.root.display(),
            active_key = registry.active_key_id(),
            can_sign = signer.is_some(),
            "opened ledger"
        );
        Ok(Self::new(config, store, registry, signer))
    }

    /// Repair daily-log lines and index memberships from per-entry records.
    pub async fn reconcile(&self) -> Result<ledgerseal_store::ReconcileReport> {
        Ok(self.store.reconcile().await?)
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Create a ledger over an already-open store.
    pub fn new(
        config: LedgerConfig,
        store: S,
        registry: KeyRegistry,
        signer: Option<Signer>,
    ) -> Self {
        Self {
            config,
            store: Arc::new(store),
            keys: RwLock::new(KeyState { registry, signer }),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of the current key registry.
    pub async fn registry(&self) -> KeyRegistry {
        self.keys.read().await.registry.clone()
    }

    /// Whether signing key material is loaded.
    pub async fn can_sign(&self) -> bool {
        self.keys.read().await.signer.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Issue
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate, seal and append a candidate entry.
    ///
    /// Returns the sealed entry as stored. A duplicate `entry_id` is
    /// [`LedgerError::DuplicateEntryId`] and writes nothing.
    pub async fn issue(&self, entry: LedgerEntry) -> Result<SealedEntry> {
        if self.config.validate_on_issue {
            validate_entry(&entry)?;
        }

        let sealed = {
            let keys = self.keys.read().await;
            let signer = keys.signer.as_ref().ok_or(LedgerError::NoSigningKey)?;
            signer.sign(&entry, &keys.registry)?
        };

        match self.store.append(&sealed).await? {
            AppendResult::Committed => {
                tracing::info!(
                    entry_id = %sealed.entry_id(),
                    key_id = sealed.key_id(),
                    subject_ref = sealed.subject_ref(),
                    "issued entry"
                );
                Ok(sealed)
            }
            AppendResult::Duplicate => {
                tracing::warn!(entry_id = %sealed.entry_id(), "rejected duplicate entry id");
                Err(LedgerError::DuplicateEntryId(sealed.entry_id().clone()))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verify
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify a stored entry against the current registry.
    pub async fn verify(&self, entry_id: &EntryId) -> Result<VerificationReport> {
        let entry = self
            .store
            .get(entry_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(entry_id.clone()))?;
        let keys = self.keys.read().await;
        Ok(verify_sealed(&entry, &keys.registry))
    }

    /// Verify an entry supplied by the caller.
    pub async fn verify_entry(&self, entry: &LedgerEntry) -> VerificationReport {
        let keys = self.keys.read().await;
        verify(entry, &keys.registry)
    }

    /// Verify every entry in a day's log, in log order.
    pub async fn audit_day(&self, day: NaiveDate) -> Result<Vec<VerificationReport>> {
        let entries = self.store.entries_for_day(day).await?;
        let keys = self.keys.read().await;
        let reports: Vec<_> = entries
            .iter()
            .map(|entry| verify_sealed(entry, &keys.registry))
            .collect();

        let invalid = reports.iter().filter(|r| !r.is_valid()).count();
        if invalid > 0 {
            tracing::warn!(%day, entries = reports.len(), invalid, "daily log has invalid entries");
        }
        Ok(reports)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a stored entry.
    pub async fn get(&self, entry_id: &EntryId) -> Result<Option<SealedEntry>> {
        Ok(self.store.get(entry_id).await?)
    }

    /// Ids of every entry about `subject_ref`, in append order.
    pub async fn lookup_subject(&self, subject_ref: &str) -> Result<Vec<EntryId>> {
        Ok(self.store.lookup_by_subject_ref(subject_ref).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Add `keypair` under `key_id`, make it active and sign with it from now on.
    ///
    /// The registry file, when configured, is written before the in-memory
    /// state changes; if the write fails nothing changes.
    pub async fn rotate_key(&self, key_id: &str, keypair: Keypair) -> Result<KeyRecord> {
        let record = KeyRecord::ed25519(keypair.public_key(), now_timestamp());

        let mut keys = self.keys.write().await;
        let mut registry = keys.registry.clone();
        registry.rotate(key_id, record.clone())?;

        if let Some(path) = self.config.registry_path.clone() {
            persist_registry(path, registry.clone()).await?;
        }

        keys.registry = registry;
        keys.signer = Some(Signer::new(keypair));
        tracing::info!(key_id, fingerprint = %record.fingerprint(), "rotated signing key");
        Ok(record)
    }
}

async fn persist_registry(path: PathBuf, registry: KeyRegistry) -> Result<()> {
    tokio::task::spawn_blocking(move || save_registry(path, &registry))
        .await
        .map_err(|e| LedgerError::Store(e.into()))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerseal_core::{report_hash_of, Outcome, SubjectType, ValidationError, VerifyFailure};
    use ledgerseal_store::MemoryStore;

    const T0: &str = "2026-01-01T00:00:00.000Z";

    fn ledger() -> Ledger<MemoryStore> {
        let keypair = Keypair::from_seed(&[0x11; 32]);
        let registry = KeyRegistry::new("K1", KeyRecord::ed25519(keypair.public_key(), T0));
        Ledger::new(
            LedgerConfig::default(),
            MemoryStore::new(),
            registry,
            Some(Signer::new(keypair)),
        )
    }

    fn candidate(id: &str, subject_ref: &str) -> LedgerEntry {
        LedgerEntry::new(
            id,
            "2026-02-01T05:00:00.000Z",
            SubjectType::Code,
            subject_ref,
            "sv-0.1",
            Outcome::Pass,
            report_hash_of(id.as_bytes()),
        )
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let ledger = ledger();
        let sealed = ledger.issue(candidate("E1", "abc")).await.unwrap();
        assert_eq!(sealed.key_id(), "K1");

        let report = ledger.verify(&"E1".into()).await.unwrap();
        assert!(report.is_valid());
        assert_eq!(ledger.lookup_subject("abc").await.unwrap(), vec![EntryId::new("E1")]);
        assert_eq!(ledger.get(&"E1".into()).await.unwrap(), Some(sealed));
    }

    #[tokio::test]
    async fn test_duplicate_issue_rejected() {
        let ledger = ledger();
        ledger.issue(candidate("E1", "abc")).await.unwrap();
        let err = ledger.issue(candidate("E1", "other")).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateEntryId(id) if id.as_str() == "E1"));
        assert!(ledger.lookup_subject("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_runs_before_signing() {
        let ledger = ledger();
        let mut entry = candidate("E1", "abc");
        entry.report_hash = "sha256:nothex".into();

        let err = ledger.issue(entry).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::InvalidField { field: "report_hash", .. })
        ));
        assert_eq!(ledger.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_validation_can_be_disabled() {
        let keypair = Keypair::from_seed(&[0x11; 32]);
        let registry = KeyRegistry::new("K1", KeyRecord::ed25519(keypair.public_key(), T0));
        let config = LedgerConfig {
            validate_on_issue: false,
            ..LedgerConfig::default()
        };
        let ledger = Ledger::new(config, MemoryStore::new(), registry, Some(Signer::new(keypair)));

        let mut entry = candidate("E1", "abc");
        entry.report_hash = "sha256:nothex".into();
        ledger.issue(entry).await.unwrap();
        assert!(ledger.verify(&"E1".into()).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_verify_missing_entry() {
        let ledger = ledger();
        assert!(matches!(
            ledger.verify(&"E404".into()).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_only_ledger() {
        let keypair = Keypair::from_seed(&[0x11; 32]);
        let registry = KeyRegistry::new("K1", KeyRecord::ed25519(keypair.public_key(), T0));
        let signing = Ledger::new(
            LedgerConfig::default(),
            MemoryStore::new(),
            registry.clone(),
            Some(Signer::new(keypair)),
        );
        let sealed = signing.issue(candidate("E1", "abc")).await.unwrap();

        let readonly = Ledger::new(LedgerConfig::default(), MemoryStore::new(), registry, None);
        assert!(!readonly.can_sign().await);
        assert!(matches!(
            readonly.issue(candidate("E2", "abc")).await,
            Err(LedgerError::NoSigningKey)
        ));
        assert!(readonly.verify_entry(sealed.as_entry()).await.is_valid());
    }

    #[tokio::test]
    async fn test_rotation_keeps_history_verifiable() {
        let ledger = ledger();
        ledger.issue(candidate("E1", "abc")).await.unwrap();

        let record = ledger
            .rotate_key("K2", Keypair::from_seed(&[0x22; 32]))
            .await
            .unwrap();
        assert_eq!(record.fingerprint().len(), 16);

        let e2 = ledger.issue(candidate("E2", "abc")).await.unwrap();
        assert_eq!(e2.key_id(), "K2");

        assert!(ledger.verify(&"E1".into()).await.unwrap().is_valid());
        assert!(ledger.verify(&"E2".into()).await.unwrap().is_valid());
        assert_eq!(ledger.registry().await.active_key_id(), "K2");
    }

    #[tokio::test]
    async fn test_rotation_rejects_reused_id() {
        let ledger = ledger();
        let err = ledger
            .rotate_key("K1", Keypair::from_seed(&[0x22; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Config(ConfigError::DuplicateKeyId(_))));

        // old signer still active
        assert_eq!(ledger.issue(candidate("E1", "abc")).await.unwrap().key_id(), "K1");
    }

    #[tokio::test]
    async fn test_audit_day_and_forged_entry() {
        let ledger = ledger();
        ledger.issue(candidate("E1", "abc")).await.unwrap();
        ledger.issue(candidate("E2", "abc")).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let reports = ledger.audit_day(day).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(VerificationReport::is_valid));

        let mut forged = ledger.get(&"E1".into()).await.unwrap().unwrap().into_entry();
        forged.result = Outcome::Fail;
        let report = ledger.verify_entry(&forged).await;
        assert_eq!(report.reason, Some(VerifyFailure::SignatureMismatch));
    }
}
