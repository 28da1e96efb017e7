//! Proptest generators for property-based testing.
//!
//! Everything generated here passes field validation.

use std::collections::BTreeMap;

use proptest::prelude::*;

use ledgerseal_core::{Keypair, LedgerEntry, Outcome, SubjectType};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a path-safe entry id.
pub fn entry_id() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9._:-]{0,31}"
}

/// Generate an issuance timestamp on a day that exists in every month.
pub fn issued_at() -> impl Strategy<Value = String> {
    (
        2020u32..2100,
        1u32..=12,
        1u32..=28,
        0u32..24,
        0u32..60,
        0u32..60,
        0u32..1000,
    )
        .prop_map(|(y, mo, d, h, mi, s, ms)| {
            format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}.{ms:03}Z")
        })
}

pub fn subject_type() -> impl Strategy<Value = SubjectType> {
    prop_oneof![
        Just(SubjectType::Code),
        Just(SubjectType::App),
        Just(SubjectType::Business),
    ]
}

pub fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Pass), Just(Outcome::Fail), Just(Outcome::Partial)]
}

/// Any non-empty text, including quotes, control characters and non-ASCII.
pub fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9./@-]{1,40}",
        "\\PC{1,24}",
        "[\"\\\\\\n\\t\\x01\\x1f é✓]{1,12}",
    ]
}

/// Generate a well-formed `sha256:` report hash.
pub fn report_hash() -> impl Strategy<Value = String> {
    any::<[u8; 32]>().prop_map(|digest| format!("sha256:{}", hex::encode(digest)))
}

pub fn scores() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map(text(), any::<i64>(), 0..6)
}

pub fn tags() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(text(), 0..6)
}

pub fn metadata() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(text(), text(), 0..6)
}

/// Parameters for generating an entry.
#[derive(Debug, Clone)]
pub struct EntryParams {
    pub entry_id: String,
    pub issued_at: String,
    pub subject_type: SubjectType,
    pub subject_ref: String,
    pub subject_url: Option<String>,
    pub policy_version: String,
    pub result: Outcome,
    pub scores: Option<BTreeMap<String, i64>>,
    pub report_hash: String,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<BTreeMap<String, String>>,
}

impl Arbitrary for EntryParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            (entry_id(), issued_at(), subject_type(), text()),
            (proptest::option::of(text()), "sv-[0-9]\\.[0-9]{1,2}", outcome()),
            (
                proptest::option::of(scores()),
                report_hash(),
                proptest::option::of(tags()),
                proptest::option::of(metadata()),
            ),
        )
            .prop_map(
                |(
                    (entry_id, issued_at, subject_type, subject_ref),
                    (subject_url, policy_version, result),
                    (scores, report_hash, tags, metadata),
                )| EntryParams {
                    entry_id,
                    issued_at,
                    subject_type,
                    subject_ref,
                    subject_url,
                    policy_version,
                    result,
                    scores,
                    report_hash,
                    tags,
                    metadata,
                },
            )
            .boxed()
    }
}

/// Build an unsigned entry from parameters.
pub fn entry_from_params(params: &EntryParams) -> LedgerEntry {
    let mut entry = LedgerEntry::new(
        params.entry_id.as_str(),
        params.issued_at.as_str(),
        params.subject_type,
        params.subject_ref.as_str(),
        params.policy_version.as_str(),
        params.result,
        params.report_hash.as_str(),
    );
    entry.subject_url = params.subject_url.clone();
    entry.scores = params.scores.clone();
    entry.tags = params.tags.clone();
    entry.metadata = params.metadata.clone();
    entry
}

/// Serialize an entry as JSON with members in reverse of serde's order.
pub fn shuffled_json(entry: &LedgerEntry) -> serde_json::Result<String> {
    let value = serde_json::to_value(entry)?;
    let mut members = Vec::new();
    if let Some(object) = value.as_object() {
        for (key, value) in object.iter().rev() {
            members.push(format!(
                "{}: {}",
                serde_json::to_string(key)?,
                serde_json::to_string_pretty(value)?
            ));
        }
    }
    Ok(format!("{{ {} }}", members.join(",\n  ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerseal_core::{
        canonical_bytes, validate_entry, verify, verify_sealed, KeyRecord, KeyRegistry, Signer,
        VerifyFailure,
    };

    fn registry_for(keypair: &Keypair) -> KeyRegistry {
        KeyRegistry::new(
            "K1",
            KeyRecord::ed25519(keypair.public_key(), "2026-01-01T00:00:00.000Z"),
        )
    }

    proptest! {
        #[test]
        fn test_generated_entries_validate(params: EntryParams) {
            prop_assert_eq!(validate_entry(&entry_from_params(&params)), Ok(()));
        }

        #[test]
        fn test_canonical_bytes_deterministic(params: EntryParams) {
            let e1 = entry_from_params(&params);
            let e2 = entry_from_params(&params);
            prop_assert_eq!(canonical_bytes(&e1), canonical_bytes(&e2));
        }

        #[test]
        fn test_canonical_ignores_input_order(params: EntryParams) {
            let entry = entry_from_params(&params);
            let reparsed = LedgerEntry::from_json(&shuffled_json(&entry).unwrap()).unwrap();
            prop_assert_eq!(canonical_bytes(&reparsed), canonical_bytes(&entry));
        }

        #[test]
        fn test_canonical_is_valid_json(params: EntryParams) {
            let bytes = canonical_bytes(&entry_from_params(&params));
            let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            prop_assert!(value.get("signature").is_none());
            prop_assert!(!bytes.contains(&b'\n'));
        }

        #[test]
        fn test_sign_then_verify(params: EntryParams, keypair in keypair()) {
            let registry = registry_for(&keypair);
            let sealed = Signer::new(keypair).sign(&entry_from_params(&params), &registry).unwrap();
            prop_assert!(verify_sealed(&sealed, &registry).is_valid());

            let reparsed = ledgerseal_core::SealedEntry::from_json(&sealed.to_json()).unwrap();
            prop_assert!(verify_sealed(&reparsed, &registry).is_valid());
        }

        #[test]
        fn test_edit_after_signing_detected(
            params: EntryParams,
            keypair in keypair(),
            bump in 1i64..1000,
        ) {
            let registry = registry_for(&keypair);
            let sealed = Signer::new(keypair).sign(&entry_from_params(&params), &registry).unwrap();

            let mut edited = sealed.into_entry();
            edited
                .scores
                .get_or_insert_with(BTreeMap::new)
                .entry("tamper".into())
                .and_modify(|s| *s = s.wrapping_add(bump))
                .or_insert(bump);
            prop_assert_eq!(verify(&edited, &registry).reason, Some(VerifyFailure::SignatureMismatch));
        }
    }
}
