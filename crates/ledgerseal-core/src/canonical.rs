//! Canonical JSON encoding for deterministic signing.
//!
//! An entry is encoded as a single compact JSON object:
//! - Top-level members follow [`FIELD_ORDER`], never input order
//! - Absent optional fields are omitted, never written as `null`
//! - Nested maps (`scores`, `metadata`) have keys sorted by UTF-8 bytes
//! - `tags` is sorted and de-duplicated
//! - No whitespace; integers only; one escaping form per string
//! - `signature` is never part of the signed bytes
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break all existing signatures.

use crate::entry::LedgerEntry;

/// Entry field names.
pub mod fields {
    pub const ENTRY_ID: &str = "entry_id";
    pub const ISSUED_AT: &str = "issued_at";
    pub const SUBJECT_TYPE: &str = "subject_type";
    pub const SUBJECT_REF: &str = "subject_ref";
    pub const SUBJECT_URL: &str = "subject_url";
    pub const POLICY_VERSION: &str = "policy_version";
    pub const RESULT: &str = "result";
    pub const SCORES: &str = "scores";
    pub const REPORT_HASH: &str = "report_hash";
    pub const KEY_ID: &str = "key_id";
    pub const TAGS: &str = "tags";
    pub const METADATA: &str = "metadata";
    pub const SIGNATURE: &str = "signature";
}

/// Order of signable members in the canonical object.
///
/// Extension fields (`tags`, `metadata`) sit after `key_id`.
pub const FIELD_ORDER: [&str; 12] = [
    fields::ENTRY_ID,
    fields::ISSUED_AT,
    fields::SUBJECT_TYPE,
    fields::SUBJECT_REF,
    fields::SUBJECT_URL,
    fields::POLICY_VERSION,
    fields::RESULT,
    fields::SCORES,
    fields::REPORT_HASH,
    fields::KEY_ID,
    fields::TAGS,
    fields::METADATA,
];

/// A value in the canonical tree.
enum Node<'a> {
    Text(&'a str),
    Int(i64),
    Array(Vec<Node<'a>>),
    /// Written with keys sorted.
    Map(Vec<(&'a str, Node<'a>)>),
}

/// Encode the signable fields of an entry to canonical bytes.
///
/// Any `signature` on the input is ignored.
pub fn canonical_bytes(entry: &LedgerEntry) -> Vec<u8> {
    let members = signable_members(entry);
    let mut buf = Vec::with_capacity(256);
    encode_object_ordered(&mut buf, &members);
    buf
}

/// Canonical bytes as a `String`.
pub fn canonical_string(entry: &LedgerEntry) -> String {
    String::from_utf8_lossy(&canonical_bytes(entry)).into_owned()
}

/// Encode the full sealed form: canonical members, then `signature` last.
///
/// An entry without a signature encodes exactly as [`canonical_bytes`].
pub fn sealed_bytes(entry: &LedgerEntry) -> Vec<u8> {
    let mut members = signable_members(entry);
    if let Some(sig) = entry.signature.as_deref() {
        members.push((fields::SIGNATURE, Node::Text(sig)));
    }
    let mut buf = Vec::with_capacity(384);
    encode_object_ordered(&mut buf, &members);
    buf
}

fn signable_members(entry: &LedgerEntry) -> Vec<(&'static str, Node<'_>)> {
    FIELD_ORDER
        .iter()
        .filter_map(|&name| field_node(entry, name).map(|node| (name, node)))
        .collect()
}

fn field_node<'a>(entry: &'a LedgerEntry, name: &str) -> Option<Node<'a>> {
    match name {
        fields::ENTRY_ID => Some(Node::Text(entry.entry_id.as_str())),
        fields::ISSUED_AT => Some(Node::Text(&entry.issued_at)),
        fields::SUBJECT_TYPE => Some(Node::Text(entry.subject_type.as_str())),
        fields::SUBJECT_REF => Some(Node::Text(&entry.subject_ref)),
        fields::SUBJECT_URL => entry.subject_url.as_deref().map(Node::Text),
        fields::POLICY_VERSION => Some(Node::Text(&entry.policy_version)),
        fields::RESULT => Some(Node::Text(entry.result.as_str())),
        fields::SCORES => entry.scores.as_ref().map(|scores| {
            Node::Map(
                scores
                    .iter()
                    .map(|(k, v)| (k.as_str(), Node::Int(*v)))
                    .collect(),
            )
        }),
        fields::REPORT_HASH => Some(Node::Text(&entry.report_hash)),
        fields::KEY_ID => entry.key_id.as_deref().map(Node::Text),
        fields::TAGS => entry.tags.as_ref().map(|tags| {
            let mut sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
            sorted.sort_unstable();
            sorted.dedup();
            Node::Array(sorted.into_iter().map(Node::Text).collect())
        }),
        fields::METADATA => entry.metadata.as_ref().map(|meta| {
            Node::Map(
                meta.iter()
                    .map(|(k, v)| (k.as_str(), Node::Text(v.as_str())))
                    .collect(),
            )
        }),
        _ => None,
    }
}

/// Recursively encode a node.
fn encode_node(buf: &mut Vec<u8>, node: &Node<'_>) {
    match node {
        Node::Text(s) => encode_text(buf, s),
        Node::Int(n) => buf.extend_from_slice(n.to_string().as_bytes()),
        Node::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_node(buf, item);
            }
            buf.push(b']');
        }
        Node::Map(entries) => encode_map_sorted(buf, entries),
    }
}

/// Encode members in the order given.
fn encode_object_ordered(buf: &mut Vec<u8>, members: &[(&str, Node<'_>)]) {
    buf.push(b'{');
    for (i, (key, value)) in members.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_text(buf, key);
        buf.push(b':');
        encode_node(buf, value);
    }
    buf.push(b'}');
}

/// Encode a map with keys sorted by their UTF-8 bytes.
fn encode_map_sorted(buf: &mut Vec<u8>, entries: &[(&str, Node<'_>)]) {
    let mut sorted: Vec<&(&str, Node<'_>)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push(b'{');
    for (i, (key, value)) in sorted.into_iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_text(buf, key);
        buf.push(b':');
        encode_node(buf, value);
    }
    buf.push(b'}');
}

/// Encode a JSON string.
///
/// Escapes `"` and `\`, uses the short forms for `\b \f \n \r \t`, and
/// `\u00xx` (lowercase hex) for the remaining control characters. Everything
/// else, including non-ASCII, is written as raw UTF-8.
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    buf.push(b'"');
    for &b in s.as_bytes() {
        match b {
            b'"' => buf.extend_from_slice(b"\\\""),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            0x08 => buf.extend_from_slice(b"\\b"),
            0x0c => buf.extend_from_slice(b"\\f"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            0x00..=0x1f => {
                buf.extend_from_slice(b"\\u00");
                buf.push(HEX[(b >> 4) as usize]);
                buf.push(HEX[(b & 0x0f) as usize]);
            }
            _ => buf.push(b),
        }
    }
    buf.push(b'"');
}
