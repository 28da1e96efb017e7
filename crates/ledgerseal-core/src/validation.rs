//! Entry validation: field-level checks run before signing.
//!
//! These catch malformed requests early. They are not part of the trust
//! model: a sealed entry is trusted because its signature verifies, not
//! because it passed these checks.

use crate::entry::LedgerEntry;
use crate::error::ValidationError;
use crate::types::parse_timestamp;

/// Prefix every `report_hash` carries.
pub const REPORT_HASH_PREFIX: &str = "sha256:";

/// Validate an entry's fields.
///
/// Checks, in order:
/// - `entry_id` non-empty and usable as a file name
/// - `issued_at` in the `YYYY-MM-DDTHH:MM:SS.mmmZ` form
/// - `subject_ref` and `policy_version` non-empty
/// - `subject_url`, when present, non-empty
/// - `report_hash` is `sha256:` followed by 64 lowercase hex digits
/// - score, tag and metadata keys non-empty
/// - `key_id`, when present, non-empty
pub fn validate_entry(entry: &LedgerEntry) -> Result<(), ValidationError> {
    if entry.entry_id.as_str().is_empty() {
        return Err(ValidationError::MissingField("entry_id"));
    }
    if !entry.entry_id.is_path_safe() {
        return Err(ValidationError::invalid(
            "entry_id",
            "only ASCII alphanumerics and `._:-` are allowed, without a leading dot",
        ));
    }

    if entry.issued_at.is_empty() {
        return Err(ValidationError::MissingField("issued_at"));
    }
    if parse_timestamp(&entry.issued_at).is_none() {
        return Err(ValidationError::invalid(
            "issued_at",
            "expected UTC timestamp with millisecond precision",
        ));
    }

    if entry.subject_ref.is_empty() {
        return Err(ValidationError::MissingField("subject_ref"));
    }
    if entry.policy_version.is_empty() {
        return Err(ValidationError::MissingField("policy_version"));
    }
    if matches!(entry.subject_url.as_deref(), Some("")) {
        return Err(ValidationError::invalid("subject_url", "must not be empty"));
    }

    validate_report_hash(&entry.report_hash)?;

    if let Some(scores) = &entry.scores {
        if scores.keys().any(String::is_empty) {
            return Err(ValidationError::invalid("scores", "empty category name"));
        }
    }
    if let Some(tags) = &entry.tags {
        if tags.iter().any(String::is_empty) {
            return Err(ValidationError::invalid("tags", "empty tag"));
        }
    }
    if let Some(metadata) = &entry.metadata {
        if metadata.keys().any(String::is_empty) {
            return Err(ValidationError::invalid("metadata", "empty key"));
        }
    }
    if matches!(entry.key_id.as_deref(), Some("")) {
        return Err(ValidationError::invalid("key_id", "must not be empty"));
    }

    Ok(())
}

fn validate_report_hash(report_hash: &str) -> Result<(), ValidationError> {
    if report_hash.is_empty() {
        return Err(ValidationError::MissingField("report_hash"));
    }
    let digest = report_hash
        .strip_prefix(REPORT_HASH_PREFIX)
        .ok_or_else(|| ValidationError::invalid("report_hash", "missing `sha256:` prefix"))?;
    let well_formed = digest.len() == 64
        && digest
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
        return Err(ValidationError::invalid(
            "report_hash",
            "expected 64 lowercase hex digits",
        ));
    }
    Ok(())
}
