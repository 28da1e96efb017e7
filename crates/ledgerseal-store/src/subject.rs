//! Subject-reference index records.
//!
//! The index maps `subject_ref` to the ids of every entry about it, in
//! append order. It is a cache: every membership can be recomputed from the
//! per-entry records.

use ledgerseal_core::{EntryId, Sha256Hash};
use serde::{Deserialize, Serialize};

/// Default number of hash hex characters used as the bucket directory.
pub const DEFAULT_INDEX_PREFIX_LEN: usize = 2;

/// Lowercase hex SHA-256 of a subject reference.
pub fn subject_ref_hash(subject_ref: &str) -> String {
    Sha256Hash::hash(subject_ref.as_bytes()).to_hex()
}

/// Bucket directory name for a subject hash.
///
/// `prefix_len` is clamped to the hash length.
pub fn bucket_prefix(hash: &str, prefix_len: usize) -> &str {
    &hash[..prefix_len.min(hash.len())]
}

/// One subject's index file: `{subject_ref, entry_ids: [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectIndexRecord {
    pub subject_ref: String,
    pub entry_ids: Vec<EntryId>,
}

impl SubjectIndexRecord {
    pub fn new(subject_ref: impl Into<String>) -> Self {
        Self {
            subject_ref: subject_ref.into(),
            entry_ids: Vec::new(),
        }
    }

    /// Add `entry_id` unless already present. Returns whether it was added.
    pub fn insert(&mut self, entry_id: &EntryId) -> bool {
        if self.contains(entry_id) {
            return false;
        }
        self.entry_ids.push(entry_id.clone());
        true
    }

    pub fn contains(&self, entry_id: &EntryId) -> bool {
        self.entry_ids.iter().any(|id| id == entry_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hash_is_lowercase_sha256() {
        assert_eq!(
            subject_ref_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_bucket_prefix() {
        let hash = subject_ref_hash("abc");
        assert_eq!(bucket_prefix(&hash, DEFAULT_INDEX_PREFIX_LEN), "ba");
        assert_eq!(bucket_prefix(&hash, 4), "ba78");
        assert_eq!(bucket_prefix(&hash, 100), hash);
    }

    #[test]
    fn test_insert_dedups_and_keeps_order() {
        let mut record = SubjectIndexRecord::new("abc");
        assert!(record.insert(&"E2".into()));
        assert!(record.insert(&"E1".into()));
        assert!(!record.insert(&"E2".into()));
        assert_eq!(record.entry_ids, vec![EntryId::new("E2"), EntryId::new("E1")]);
    }

    #[test]
    fn test_file_format() {
        let mut record = SubjectIndexRecord::new("abc");
        record.insert(&"E1".into());
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"subject_ref":"abc","entry_ids":["E1"]}"#
        );
    }

    proptest! {
        #[test]
        fn test_insert_keeps_first_seen_order(ids in prop::collection::vec("[a-f]{1,2}", 0..40)) {
            let mut record = SubjectIndexRecord::new("s");
            let mut expected: Vec<EntryId> = Vec::new();
            for id in ids.iter().map(|id| EntryId::new(id.as_str())) {
                prop_assert_eq!(record.insert(&id), !expected.contains(&id));
                if !expected.contains(&id) {
                    expected.push(id);
                }
            }
            prop_assert_eq!(record.entry_ids, expected);
        }
    }
}
