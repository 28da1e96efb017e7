//! Golden test vectors for deterministic verification.
//!
//! Each vector pairs a non-canonical JSON input with the exact canonical
//! string and Ed25519 signature any implementation must produce. Signatures
//! were computed independently of this crate over the canonical bytes.

use ledgerseal_core::{
    canonical_string, CoreError, KeyRecord, KeyRegistry, Keypair, LedgerEntry, SealedEntry, Signer,
};

/// Seed shared by every vector.
pub const GOLDEN_SEED: [u8; 32] = [0x42; 32];

/// Base64 public key derived from [`GOLDEN_SEED`].
pub const GOLDEN_PUBLIC_KEY: &str = "IVL40Zt5HSRFMkLhXy6rbLfP+ntqXtMAl5YOBpiB2xI=";

/// Key id every vector is signed under.
pub const GOLDEN_KEY_ID: &str = "K1";

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Entry JSON with members in arbitrary order and arbitrary escaping.
    pub input: &'static str,
    /// Expected canonical form.
    pub canonical: &'static str,
    /// Expected Base64 signature.
    pub signature: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "code entry with scores",
            input: r#"{
                "key_id": "K1",
                "report_hash": "sha256:0000000000000000000000000000000000000000000000000000000000000000",
                "scores": {"security": 8, "repro": 7},
                "result": "pass",
                "policy_version": "sv-0.1",
                "subject_ref": "abc",
                "subject_type": "code",
                "issued_at": "2026-02-01T05:00:00.000Z",
                "entry_id": "E1"
            }"#,
            canonical: r#"{"entry_id":"E1","issued_at":"2026-02-01T05:00:00.000Z","subject_type":"code","subject_ref":"abc","policy_version":"sv-0.1","result":"pass","scores":{"repro":7,"security":8},"report_hash":"sha256:0000000000000000000000000000000000000000000000000000000000000000","key_id":"K1"}"#,
            signature: "JBBgUvBKukjA0XLxaNZ4whqUZ5JpkKKEGa35cSi+riioaYGm2I22P/9l1slyVxk5bhdCX9MID0dLG+J5OFkhCg==",
        },
        GoldenVector {
            name: "minimal app entry",
            input: r#"{"result":"fail","entry_id":"E2","subject_ref":"app-1","subject_type":"app","key_id":"K1","issued_at":"2026-02-01T05:00:00.000Z","policy_version":"sv-0.1","report_hash":"sha256:0000000000000000000000000000000000000000000000000000000000000000"}"#,
            canonical: r#"{"entry_id":"E2","issued_at":"2026-02-01T05:00:00.000Z","subject_type":"app","subject_ref":"app-1","policy_version":"sv-0.1","result":"fail","report_hash":"sha256:0000000000000000000000000000000000000000000000000000000000000000","key_id":"K1"}"#,
            signature: "Cb/9axY8ppl8+s6CeYAmccr7Piilx46Egw30ClDFmg3ubCm8TsmbMI+VAvxtZFrxYbBBWaPVwbgSy/9T+vzmBQ==",
        },
        GoldenVector {
            name: "every optional field",
            input: r#"{
                "metadata": {"runner": "ci-3", "branch": "main"},
                "tags": ["nightly", "arm64", "nightly"],
                "key_id": "K1",
                "report_hash": "sha256:0000000000000000000000000000000000000000000000000000000000000000",
                "scores": {"security": -2},
                "result": "partial",
                "policy_version": "sv-0.2",
                "subject_url": "https://example.com/acme/widget",
                "subject_ref": "github.com/acme/widget@4f2a9c1",
                "subject_type": "code",
                "issued_at": "2026-03-15T23:59:59.999Z",
                "entry_id": "E3"
            }"#,
            canonical: r#"{"entry_id":"E3","issued_at":"2026-03-15T23:59:59.999Z","subject_type":"code","subject_ref":"github.com/acme/widget@4f2a9c1","subject_url":"https://example.com/acme/widget","policy_version":"sv-0.2","result":"partial","scores":{"security":-2},"report_hash":"sha256:0000000000000000000000000000000000000000000000000000000000000000","key_id":"K1","tags":["arm64","nightly"],"metadata":{"branch":"main","runner":"ci-3"}}"#,
            signature: "5DvB2jrTL0J7pSJKY97rOljx6oTxHpdiDgg0dLh06BHAPOgfZWShP51aXzqiHwUurkUX6Nm9B8/+Tngqvrm8Bg==",
        },
        GoldenVector {
            name: "escapes, non-ASCII and byte-order keys",
            input: r#"{"metadata":{"\u00fcmlaut":"ok","z":"last"},"scores":{"alpha":2,"Zeta":1},"key_id":"K1","report_hash":"sha256:0000000000000000000000000000000000000000000000000000000000000000","result":"pass","policy_version":"sv-0.1","subject_ref":"say \"hi\"\\path\n\t\u0001 caf\u00e9","subject_type":"business","issued_at":"2026-02-01T00:00:00.000Z","entry_id":"E4"}"#,
            canonical: r#"{"entry_id":"E4","issued_at":"2026-02-01T00:00:00.000Z","subject_type":"business","subject_ref":"say \"hi\"\\path\n\t\u0001 café","policy_version":"sv-0.1","result":"pass","scores":{"Zeta":1,"alpha":2},"report_hash":"sha256:0000000000000000000000000000000000000000000000000000000000000000","key_id":"K1","metadata":{"z":"last","ümlaut":"ok"}}"#,
            signature: "/aXCeDKK9Zraq15OyLfssAWc0mxWYdTrTqJSnsX6WKB7qJEkeR9eH8nD6wgYLTonhTPyL/CJ+KiCMq3HZHXvAg==",
        },
    ]
}

/// Registry holding the golden key as `K1`.
pub fn golden_registry() -> KeyRegistry {
    let keypair = Keypair::from_seed(&GOLDEN_SEED);
    KeyRegistry::new(
        GOLDEN_KEY_ID,
        KeyRecord::ed25519(keypair.public_key(), "2026-01-01T00:00:00.000Z"),
    )
}

/// Parse a vector's input.
pub fn entry_from_vector(vector: &GoldenVector) -> Result<LedgerEntry, CoreError> {
    LedgerEntry::from_json(vector.input)
}

/// Seal a vector's input with the golden key.
pub fn seal_vector(vector: &GoldenVector) -> Result<SealedEntry, CoreError> {
    let entry = entry_from_vector(vector)?;
    Signer::new(Keypair::from_seed(&GOLDEN_SEED)).sign(&entry, &golden_registry())
}

/// Result of checking one vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorCheck {
    pub name: String,
    pub canonical_matches: bool,
    pub signature_matches: bool,
    /// Canonical string actually produced, or the error.
    pub actual: String,
}

impl VectorCheck {
    pub fn passed(&self) -> bool {
        self.canonical_matches && self.signature_matches
    }
}

/// Check every golden vector against this implementation.
pub fn verify_all_vectors() -> Vec<VectorCheck> {
    all_vectors()
        .iter()
        .map(|v| match seal_vector(v) {
            Ok(sealed) => {
                let actual = canonical_string(sealed.as_entry());
                VectorCheck {
                    name: v.name.to_string(),
                    canonical_matches: actual == v.canonical,
                    signature_matches: sealed.signature() == v.signature,
                    actual,
                }
            }
            Err(e) => VectorCheck {
                name: v.name.to_string(),
                canonical_matches: false,
                signature_matches: false,
                actual: e.to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerseal_core::{verify_sealed, VerifyFailure};

    #[test]
    fn test_golden_public_key() {
        let keypair = Keypair::from_seed(&GOLDEN_SEED);
        assert_eq!(keypair.public_key().to_base64(), GOLDEN_PUBLIC_KEY);
    }

    #[test]
    fn test_all_vectors_pass() {
        for check in verify_all_vectors() {
            assert!(check.canonical_matches, "{}: got {}", check.name, check.actual);
            assert!(check.signature_matches, "{}: signature differs", check.name);
        }
    }

    #[test]
    fn test_vectors_verify() {
        let registry = golden_registry();
        for vector in all_vectors() {
            let sealed = seal_vector(&vector).unwrap();
            assert!(verify_sealed(&sealed, &registry).is_valid(), "{}", vector.name);
        }
    }

    #[test]
    fn test_sealed_form_parses_back() {
        for vector in all_vectors() {
            let sealed = seal_vector(&vector).unwrap();
            let reparsed = SealedEntry::from_json(&sealed.to_json()).unwrap();
            assert_eq!(reparsed, sealed, "{}", vector.name);
            assert_eq!(canonical_string(reparsed.as_entry()), vector.canonical);
        }
    }

    #[test]
    fn test_published_signature_rejects_edit() {
        let registry = golden_registry();
        let vector = &all_vectors()[0];
        let mut entry = entry_from_vector(vector).unwrap();
        entry.signature = Some(vector.signature.to_string());
        assert!(ledgerseal_core::verify(&entry, &registry).is_valid());

        entry.scores = entry.scores.map(|mut s| {
            s.insert("security".into(), 9);
            s
        });
        assert_eq!(
            ledgerseal_core::verify(&entry, &registry).reason,
            Some(VerifyFailure::SignatureMismatch)
        );
    }
}
