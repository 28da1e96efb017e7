//! Signer: seal a candidate entry under a registry key.
//!
//! Signing computes bytes and nothing else. Persisting the result is the
//! store's job, so the two can be tested and retried independently.

use crate::canonical::canonical_bytes;
use crate::crypto::{Ed25519PublicKey, Keypair};
use crate::entry::{LedgerEntry, SealedEntry};
use crate::error::{ConfigError, CoreError, ValidationError};
use crate::keys::KeyRegistry;

/// Holds private key material and seals entries with it.
#[derive(Debug, Clone)]
pub struct Signer {
    keypair: Keypair,
}

impl Signer {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Build from a 32-byte seed or 64-byte expanded key.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        Keypair::from_secret_bytes(bytes).map(Self::new)
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// Seal `entry`.
    ///
    /// - `entry_id` and `issued_at` must be non-empty; the entry must not
    ///   already carry a signature.
    /// - The registry must have a resolvable active key.
    /// - An unset `key_id` is stamped with the active key id. A preset one
    ///   must resolve in the registry.
    /// - The resolved record must hold this signer's public key.
    ///
    /// Field-level schema checks are not performed here; see
    /// [`crate::validation::validate_entry`].
    pub fn sign(&self, entry: &LedgerEntry, registry: &KeyRegistry) -> Result<SealedEntry, CoreError> {
        if entry.signature.is_some() {
            return Err(ValidationError::AlreadySealed.into());
        }
        if entry.entry_id.as_str().is_empty() {
            return Err(ValidationError::MissingField("entry_id").into());
        }
        if entry.issued_at.is_empty() {
            return Err(ValidationError::MissingField("issued_at").into());
        }

        let (active_id, _) = registry.active_key()?;
        let key_id = entry.key_id.as_deref().unwrap_or(active_id).to_string();
        self.check_record(registry, &key_id)?;

        let mut sealed = entry.clone();
        sealed.key_id = Some(key_id);
        sealed.normalize_tags();

        let message = canonical_bytes(&sealed);
        let signature = self.keypair.sign(&message);
        sealed.signature = Some(signature.to_base64());

        tracing::debug!(
            entry_id = %sealed.entry_id,
            key_id = sealed.key_id.as_deref().unwrap_or_default(),
            canonical_len = message.len(),
            "sealed entry"
        );
        Ok(SealedEntry::new_unchecked(sealed))
    }

    fn check_record(&self, registry: &KeyRegistry, key_id: &str) -> Result<(), ConfigError> {
        let record = registry
            .resolve(key_id)
            .ok_or_else(|| ConfigError::UnknownKey(key_id.to_string()))?;
        if !record.is_supported() {
            return Err(ConfigError::UnsupportedAlgorithm {
                key_id: key_id.to_string(),
                algorithm: record.key_type.clone(),
            });
        }
        let public_key = record
            .ed25519_key()
            .ok_or_else(|| ConfigError::InvalidPublicKey(key_id.to_string()))?;
        if public_key != self.keypair.public_key() {
            return Err(ConfigError::KeyMismatch(key_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Ed25519Signature;
    use crate::keys::KeyRecord;
    use crate::types::{Outcome, SubjectType};

    const T0: &str = "2026-01-01T00:00:00.000Z";

    fn setup() -> (Signer, KeyRegistry) {
        let keypair = Keypair::from_seed(&[0x11; 32]);
        let registry = KeyRegistry::new("K1", KeyRecord::ed25519(keypair.public_key(), T0));
        (Signer::new(keypair), registry)
    }

    fn candidate() -> LedgerEntry {
        LedgerEntry::new(
            "E1",
            "2026-02-01T05:00:00.000Z",
            SubjectType::Code,
            "abc",
            "sv-0.1",
            Outcome::Pass,
            format!("sha256:{}", "0".repeat(64)),
        )
    }

    #[test]
    fn test_stamps_active_key_id() {
        let (signer, registry) = setup();
        let sealed = signer.sign(&candidate(), &registry).unwrap();
        assert_eq!(sealed.key_id(), "K1");
        assert!(!sealed.signature().is_empty());
    }

    #[test]
    fn test_signature_covers_canonical_bytes() {
        let (signer, registry) = setup();
        let sealed = signer.sign(&candidate(), &registry).unwrap();

        let sig = Ed25519Signature::from_base64(sealed.signature()).unwrap();
        let message = canonical_bytes(sealed.as_entry());
        assert!(signer.public_key().verify(&message, &sig));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let (signer, registry) = setup();
        let a = signer.sign(&candidate(), &registry).unwrap();
        let b = signer.sign(&candidate(), &registry).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_other_fields_unchanged() {
        let (signer, registry) = setup();
        let entry = candidate().with_score("repro", 7);
        let sealed = signer.sign(&entry, &registry).unwrap();

        let mut stripped = sealed.into_entry();
        stripped.signature = None;
        stripped.key_id = None;
        assert_eq!(stripped, entry);
    }

    #[test]
    fn test_sealed_tags_match_canonical_order() {
        let (signer, registry) = setup();
        let entry = candidate().with_tag("nightly").with_tag("arm64").with_tag("nightly");
        let sealed = signer.sign(&entry, &registry).unwrap();

        assert_eq!(
            sealed.as_entry().tags,
            Some(vec!["arm64".to_string(), "nightly".to_string()])
        );
        assert_eq!(SealedEntry::from_json(&sealed.to_json()).unwrap(), sealed);
    }

    #[test]
    fn test_missing_required_fields() {
        let (signer, registry) = setup();

        let mut entry = candidate();
        entry.entry_id = "".into();
        assert!(matches!(
            signer.sign(&entry, &registry),
            Err(CoreError::Validation(ValidationError::MissingField("entry_id")))
        ));

        let mut entry = candidate();
        entry.issued_at.clear();
        assert!(matches!(
            signer.sign(&entry, &registry),
            Err(CoreError::Validation(ValidationError::MissingField("issued_at")))
        ));
    }

    #[test]
    fn test_refuses_to_resign() {
        let (signer, registry) = setup();
        let sealed = signer.sign(&candidate(), &registry).unwrap();
        assert!(matches!(
            signer.sign(sealed.as_entry(), &registry),
            Err(CoreError::Validation(ValidationError::AlreadySealed))
        ));
    }

    #[test]
    fn test_no_active_key() {
        let (signer, _) = setup();
        let registry = KeyRegistry::from_json(r#"{"active":"","keys":{}}"#).unwrap();
        assert!(matches!(
            signer.sign(&candidate(), &registry),
            Err(CoreError::Config(ConfigError::NoActiveKey))
        ));
    }

    #[test]
    fn test_stale_secret_rejected() {
        let (_, registry) = setup();
        let stale = Signer::new(Keypair::from_seed(&[0x22; 32]));
        assert!(matches!(
            stale.sign(&candidate(), &registry),
            Err(CoreError::Config(ConfigError::KeyMismatch(id))) if id == "K1"
        ));
    }

    #[test]
    fn test_preset_key_id_must_resolve() {
        let (signer, registry) = setup();
        let entry = candidate().with_key_id("K7");
        assert!(matches!(
            signer.sign(&entry, &registry),
            Err(CoreError::Config(ConfigError::UnknownKey(id))) if id == "K7"
        ));
    }

    #[test]
    fn test_historical_key_id_can_sign() {
        let (signer, mut registry) = setup();
        let next = Keypair::from_seed(&[0x33; 32]);
        registry
            .rotate("K2", KeyRecord::ed25519(next.public_key(), T0))
            .unwrap();

        let sealed = signer.sign(&candidate().with_key_id("K1"), &registry).unwrap();
        assert_eq!(sealed.key_id(), "K1");
    }

    #[test]
    fn test_invalid_key_length_is_config_error() {
        assert_eq!(
            Signer::from_secret_bytes(&[0u8; 48]).unwrap_err(),
            ConfigError::InvalidKeyLength(48)
        );
    }
}
