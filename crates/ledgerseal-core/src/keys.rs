//! Key registry: every signing key ever used, plus the active pointer.
//!
//! The registry only grows. Rotation adds a record and moves `active`;
//! it never edits or removes a record, so entries signed under an old key
//! stay verifiable forever.
//!
//! File form:
//!
//! ```json
//! {"active":"K2","keys":{"K1":{"type":"ed25519","publicKey":"...","createdAt":"..."}}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::{base64_bytes, Ed25519PublicKey, Keypair, Sha256Hash};
use crate::error::{ConfigError, CoreError};

/// The one supported signature algorithm tag.
pub const ALGORITHM_ED25519: &str = "ed25519";

/// A public key known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    /// Algorithm tag. Unknown tags load fine and fail at verification.
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
    pub created_at: String,
}

impl KeyRecord {
    /// An Ed25519 record.
    pub fn ed25519(public_key: Ed25519PublicKey, created_at: impl Into<String>) -> Self {
        Self {
            key_type: ALGORITHM_ED25519.to_string(),
            public_key: public_key.as_bytes().to_vec(),
            created_at: created_at.into(),
        }
    }

    /// Whether the algorithm tag is one this crate can verify.
    pub fn is_supported(&self) -> bool {
        self.key_type == ALGORITHM_ED25519
    }

    /// The Ed25519 key, if the record is Ed25519 and 32 bytes long.
    pub fn ed25519_key(&self) -> Option<Ed25519PublicKey> {
        if !self.is_supported() {
            return None;
        }
        Ed25519PublicKey::from_slice(&self.public_key)
    }

    /// Short stable fingerprint: first 16 hex chars of SHA-256(public key).
    pub fn fingerprint(&self) -> String {
        Sha256Hash::hash(&self.public_key).to_hex()[..16].to_string()
    }
}

/// Generate a fresh keypair and its registry record.
pub fn generate_key(created_at: impl Into<String>) -> (Keypair, KeyRecord) {
    let keypair = Keypair::generate();
    let record = KeyRecord::ed25519(keypair.public_key(), created_at);
    (keypair, record)
}

/// Key id → record, plus the id used for new signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRegistry {
    active: String,
    keys: BTreeMap<String, KeyRecord>,
}

impl KeyRegistry {
    /// A registry holding one key, which is active.
    pub fn new(key_id: impl Into<String>, record: KeyRecord) -> Self {
        let key_id = key_id.into();
        let mut keys = BTreeMap::new();
        keys.insert(key_id.clone(), record);
        Self {
            active: key_id,
            keys,
        }
    }

    /// Parse the registry file format.
    ///
    /// A registry whose `active` pointer does not resolve still loads; it
    /// can verify but [`KeyRegistry::active_key`] fails until rotated.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    /// Serialize to the registry file format.
    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Id of the active key. May be empty if never set.
    pub fn active_key_id(&self) -> &str {
        &self.active
    }

    /// The active key's record.
    pub fn active_key(&self) -> Result<(&str, &KeyRecord), ConfigError> {
        if self.active.is_empty() {
            return Err(ConfigError::NoActiveKey);
        }
        self.keys
            .get(&self.active)
            .map(|record| (self.active.as_str(), record))
            .ok_or_else(|| ConfigError::ActiveKeyMissing(self.active.clone()))
    }

    /// Look up any key, active or historical.
    pub fn resolve(&self, key_id: &str) -> Option<&KeyRecord> {
        self.keys.get(key_id)
    }

    /// Add a new key under a fresh id and make it active.
    ///
    /// Existing records are never touched; reusing an id is an error.
    pub fn rotate(&mut self, key_id: impl Into<String>, record: KeyRecord) -> Result<(), ConfigError> {
        let key_id = key_id.into();
        if key_id.is_empty() {
            return Err(ConfigError::EmptyKeyId);
        }
        if self.keys.contains_key(&key_id) {
            return Err(ConfigError::DuplicateKeyId(key_id));
        }
        tracing::info!(key_id = %key_id, previous = %self.active, "rotating active signing key");
        self.keys.insert(key_id.clone(), record);
        self.active = key_id;
        Ok(())
    }

    /// All known key ids, sorted.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: &str = "2026-01-01T00:00:00.000Z";
    const T1: &str = "2026-06-01T00:00:00.000Z";

    fn record(seed: u8, at: &str) -> KeyRecord {
        KeyRecord::ed25519(Keypair::from_seed(&[seed; 32]).public_key(), at)
    }

    #[test]
    fn test_active_key() {
        let registry = KeyRegistry::new("K1", record(1, T0));
        let (id, rec) = registry.active_key().unwrap();
        assert_eq!(id, "K1");
        assert_eq!(rec.created_at, T0);
        assert!(rec.is_supported());
    }

    #[test]
    fn test_rotate_is_additive() {
        let mut registry = KeyRegistry::new("K1", record(1, T0));
        let k1 = registry.resolve("K1").cloned().unwrap();

        registry.rotate("K2", record(2, T1)).unwrap();

        assert_eq!(registry.active_key_id(), "K2");
        assert_eq!(registry.resolve("K1"), Some(&k1));
        assert!(registry.resolve("K2").is_some());
        assert_eq!(registry.key_ids().collect::<Vec<_>>(), vec!["K1", "K2"]);
    }

    #[test]
    fn test_rotate_rejects_existing_id() {
        let mut registry = KeyRegistry::new("K1", record(1, T0));
        let original = registry.clone();

        let err = registry.rotate("K1", record(2, T1)).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateKeyId("K1".into()));
        assert_eq!(registry, original);
    }

    #[test]
    fn test_file_format() {
        let registry = KeyRegistry::new("K1", record(1, T0));
        let json = registry.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["active"], "K1");
        assert_eq!(value["keys"]["K1"]["type"], "ed25519");
        assert_eq!(value["keys"]["K1"]["createdAt"], T0);
        assert_eq!(
            value["keys"]["K1"]["publicKey"],
            Keypair::from_seed(&[1; 32]).public_key().to_base64()
        );

        assert_eq!(KeyRegistry::from_json(&json).unwrap(), registry);
    }

    #[test]
    fn test_dangling_active_pointer() {
        let json = r#"{"active":"K9","keys":{}}"#;
        let registry = KeyRegistry::from_json(json).unwrap();
        assert_eq!(
            registry.active_key().unwrap_err(),
            ConfigError::ActiveKeyMissing("K9".into())
        );

        let json = r#"{"active":"","keys":{}}"#;
        let registry = KeyRegistry::from_json(json).unwrap();
        assert_eq!(registry.active_key().unwrap_err(), ConfigError::NoActiveKey);
    }

    #[test]
    fn test_unknown_algorithm_loads() {
        let json = r#"{"active":"K1","keys":{"K1":{"type":"rsa","publicKey":"AAEC","createdAt":"x"}}}"#;
        let registry = KeyRegistry::from_json(json).unwrap();
        let rec = registry.resolve("K1").unwrap();
        assert!(!rec.is_supported());
        assert_eq!(rec.ed25519_key(), None);
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = record(1, T0);
        let b = record(1, T1);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
        assert_ne!(a.fingerprint(), record(2, T0).fingerprint());
    }

    #[test]
    fn test_generate_key() {
        let (keypair, record) = generate_key(T0);
        assert_eq!(record.ed25519_key(), Some(keypair.public_key()));
    }
}
