//! Cryptographic primitives for ledgerseal.
//!
//! Wraps Ed25519 signing and SHA-256 hashing with strong types. Signatures
//! and public keys travel as standard Base64.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::ConfigError;

/// Length of a private key seed.
pub const SEED_LEN: usize = 32;

/// Length of an expanded private key (seed followed by public key).
pub const EXPANDED_KEY_LEN: usize = 64;

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHA256({}...)", &self.to_hex()[..8])
    }
}

/// Build a `sha256:<hex>` report hash for the given report bytes.
pub fn report_hash_of(report: &[u8]) -> String {
    format!("sha256:{}", Sha256Hash::hash(report).to_hex())
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as standard Base64.
    pub fn to_base64(&self) -> String {
        B64.encode(self.0)
    }

    /// Parse from a slice, rejecting anything that is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Verify a signature over a message.
    ///
    /// Returns `false` both for a bad signature and for a key that is not a
    /// valid curve point; callers that care about the difference check
    /// [`Ed25519PublicKey::is_valid_point`] first.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let sig = Signature::from_bytes(&signature.0);
        verifying_key.verify(message, &sig).is_ok()
    }

    /// Whether the bytes decode to a valid Ed25519 point.
    pub fn is_valid_point(&self) -> bool {
        VerifyingKey::from_bytes(&self.0).is_ok()
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &hex::encode(self.0)[..16])
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Encode as standard Base64 (the wire form of the `signature` field).
    pub fn to_base64(&self) -> String {
        B64.encode(self.0)
    }

    /// Decode from Base64. `None` on bad encoding or wrong length.
    pub fn from_base64(s: &str) -> Option<Self> {
        let bytes = B64.decode(s.as_bytes()).ok()?;
        let arr: [u8; 64] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &hex::encode(self.0)[..16])
    }
}

/// A keypair for signing entries.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Create from private key material of either supported length.
    ///
    /// - 32 bytes: a seed, expanded here.
    /// - 64 bytes: seed followed by the public key; the public half must match.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        match bytes.len() {
            SEED_LEN => {
                let mut seed = [0u8; SEED_LEN];
                seed.copy_from_slice(bytes);
                Ok(Self::from_seed(&seed))
            }
            EXPANDED_KEY_LEN => {
                let mut expanded = [0u8; EXPANDED_KEY_LEN];
                expanded.copy_from_slice(bytes);
                let signing_key = SigningKey::from_keypair_bytes(&expanded)
                    .map_err(|_| ConfigError::InconsistentKeypair)?;
                Ok(Self { signing_key })
            }
            other => Err(ConfigError::InvalidKeyLength(other)),
        }
    }

    /// Create from Base64-encoded private key material.
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let bytes = B64
            .decode(encoded.trim().as_bytes())
            .map_err(|e| ConfigError::InvalidEncoding(e.to_string()))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Load Base64 private key material from an environment variable.
    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        let encoded =
            std::env::var(var).map_err(|_| ConfigError::MissingSigningKey(var.to_string()))?;
        Self::from_base64(&encoded)
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Seed followed by public key, the 64-byte expanded form.
    pub fn to_expanded_bytes(&self) -> [u8; 64] {
        self.signing_key.to_keypair_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// Serde adapter writing byte vectors as standard Base64 strings.
pub(crate) mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        B64.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        B64.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
