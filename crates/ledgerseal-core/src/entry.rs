//! Ledger entries: the unit of attestation.
//!
//! A [`LedgerEntry`] is the logical, possibly unsigned form. Once a signature
//! is attached it becomes a [`SealedEntry`], which offers no way to change a
//! field. Editing requires unwrapping back into a `LedgerEntry`, and any edit
//! then fails verification.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_bytes, sealed_bytes};
use crate::error::{CoreError, ValidationError};
use crate::types::{now_timestamp, utc_day, EntryId, Outcome, SubjectType};

/// A verification entry, sealed or not.
///
/// Field declaration order here is irrelevant to the signature; the
/// canonical order lives in [`crate::canonical::FIELD_ORDER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub issued_at: String,
    pub subject_type: SubjectType,
    pub subject_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_url: Option<String>,
    pub policy_version: String,
    pub result: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<BTreeMap<String, i64>>,
    pub report_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl LedgerEntry {
    /// Start an entry with the required fields; optional ones default to absent.
    pub fn new(
        entry_id: impl Into<EntryId>,
        issued_at: impl Into<String>,
        subject_type: SubjectType,
        subject_ref: impl Into<String>,
        policy_version: impl Into<String>,
        result: Outcome,
        report_hash: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            issued_at: issued_at.into(),
            subject_type,
            subject_ref: subject_ref.into(),
            subject_url: None,
            policy_version: policy_version.into(),
            result,
            scores: None,
            report_hash: report_hash.into(),
            key_id: None,
            tags: None,
            metadata: None,
            signature: None,
        }
    }

    /// A candidate with a fresh time-ordered id, issued now.
    pub fn draft(
        subject_type: SubjectType,
        subject_ref: impl Into<String>,
        policy_version: impl Into<String>,
        result: Outcome,
        report_hash: impl Into<String>,
    ) -> Self {
        Self::new(
            EntryId::generate(),
            now_timestamp(),
            subject_type,
            subject_ref,
            policy_version,
            result,
            report_hash,
        )
    }

    /// Parse an entry from JSON. Field order in the input does not matter.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::DecodingError(e.to_string()))
    }

    pub fn with_subject_url(mut self, url: impl Into<String>) -> Self {
        self.subject_url = Some(url.into());
        self
    }

    pub fn with_score(mut self, category: impl Into<String>, score: i64) -> Self {
        self.scores
            .get_or_insert_with(BTreeMap::new)
            .insert(category.into(), score);
        self
    }

    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(tag.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Whether a signature is attached.
    pub fn is_sealed(&self) -> bool {
        self.signature.is_some()
    }

    /// Canonical bytes of the signable fields (signature excluded).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_bytes(self)
    }

    /// UTC calendar day of `issued_at`, if it parses.
    pub fn issued_day(&self) -> Option<NaiveDate> {
        utc_day(&self.issued_at)
    }

    /// Sort and de-duplicate `tags` in place, matching the canonical form.
    pub fn normalize_tags(&mut self) {
        if let Some(tags) = self.tags.as_mut() {
            tags.sort_unstable();
            tags.dedup();
        }
    }

    /// Copy of this entry without its signature.
    pub fn unsigned(&self) -> Self {
        Self {
            signature: None,
            ..self.clone()
        }
    }
}

/// An entry with `key_id` and `signature` attached. Immutable.
///
/// Holding a `SealedEntry` says nothing about whether the signature is
/// valid; that is the verifier's job.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedEntry {
    entry: LedgerEntry,
}

impl SealedEntry {
    /// Seal an entry whose `key_id` and `signature` are present.
    pub(crate) fn new_unchecked(mut entry: LedgerEntry) -> Self {
        entry.normalize_tags();
        Self { entry }
    }

    /// Parse a sealed entry from its JSON serialization.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let entry = LedgerEntry::from_json(json)?;
        Ok(Self::try_from(entry)?)
    }

    pub fn entry_id(&self) -> &EntryId {
        &self.entry.entry_id
    }

    pub fn key_id(&self) -> &str {
        self.entry.key_id.as_deref().unwrap_or_default()
    }

    pub fn signature(&self) -> &str {
        self.entry.signature.as_deref().unwrap_or_default()
    }

    pub fn subject_ref(&self) -> &str {
        &self.entry.subject_ref
    }

    pub fn issued_at(&self) -> &str {
        &self.entry.issued_at
    }

    pub fn issued_day(&self) -> Option<NaiveDate> {
        self.entry.issued_day()
    }

    /// Read-only view of all fields.
    pub fn as_entry(&self) -> &LedgerEntry {
        &self.entry
    }

    /// Give up the seal and return the plain entry.
    pub fn into_entry(self) -> LedgerEntry {
        self.entry
    }

    /// Canonical bytes with the signature appended as the final member.
    ///
    /// This is the per-entry record body and the daily log line.
    pub fn to_bytes(&self) -> Vec<u8> {
        sealed_bytes(&self.entry)
    }

    /// `to_bytes` as a string. Always valid UTF-8.
    pub fn to_json(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

impl TryFrom<LedgerEntry> for SealedEntry {
    type Error = ValidationError;

    fn try_from(entry: LedgerEntry) -> Result<Self, Self::Error> {
        if entry.key_id.is_none() {
            return Err(ValidationError::MissingField("key_id"));
        }
        if entry.signature.is_none() {
            return Err(ValidationError::MissingField("signature"));
        }
        Ok(Self::new_unchecked(entry))
    }
}

impl fmt::Debug for SealedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedEntry")
            .field("entry_id", &self.entry.entry_id)
            .field("key_id", &self.key_id())
            .field("subject_ref", &self.entry.subject_ref)
            .field("issued_at", &self.entry.issued_at)
            .finish()
    }
}
