//! Ledger configuration.
//!
//! Passed to each component at construction; there is no global state.

use std::fs;
use std::path::{Path, PathBuf};

use ledgerseal_store::{FsOptions, DEFAULT_INDEX_PREFIX_LEN};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Environment variable read for the signing key by default.
pub const DEFAULT_SIGNING_KEY_ENV: &str = "LEDGERSEAL_SIGNING_KEY";

/// Configuration for the Ledger.
///
/// Loaded from JSON; every field is optional and falls back to
/// [`LedgerConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Ledger root directory for the filesystem store.
    pub root: PathBuf,
    /// Key registry file. Required by [`crate::Ledger::open`].
    pub registry_path: Option<PathBuf>,
    /// Hash hex characters used as the subject index bucket.
    pub index_prefix_len: usize,
    /// Run field validation before signing.
    pub validate_on_issue: bool,
    /// fsync after each write.
    pub fsync: bool,
    /// Environment variable holding the Base64 signing key.
    pub signing_key_env: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("ledger"),
            registry_path: None,
            index_prefix_len: DEFAULT_INDEX_PREFIX_LEN,
            validate_on_issue: true,
            fsync: true,
            signing_key_env: DEFAULT_SIGNING_KEY_ENV.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Defaults rooted at `root`, with the registry at `<root>/registry.json`.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            registry_path: Some(root.join("registry.json")),
            root,
            ..Self::default()
        }
    }

    /// Read a JSON config file and check it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| LedgerError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| LedgerError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=64).contains(&self.index_prefix_len) {
            return Err(LedgerError::InvalidConfig(format!(
                "index_prefix_len must be between 1 and 64, got {}",
                self.index_prefix_len
            )));
        }
        if self.signing_key_env.is_empty() {
            return Err(LedgerError::InvalidConfig(
                "signing_key_env must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Options for the filesystem store.
    pub fn fs_options(&self) -> FsOptions {
        FsOptions {
            index_prefix_len: self.index_prefix_len,
            fsync: self.fsync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.index_prefix_len, 2);
        assert!(config.validate_on_issue);
        assert!(config.fsync);
        assert_eq!(config.signing_key_env, "LEDGERSEAL_SIGNING_KEY");
        assert_eq!(config.registry_path, None);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, r#"{"root":"/var/lib/ledger","fsync":false}"#).unwrap();

        let config = LedgerConfig::load(&path).unwrap();
        assert_eq!(config.root, PathBuf::from("/var/lib/ledger"));
        assert!(!config.fsync);
        assert_eq!(config.index_prefix_len, DEFAULT_INDEX_PREFIX_LEN);
    }

    #[test]
    fn test_load_rejects_unknown_and_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        fs::write(&path, r#"{"rooot":"x"}"#).unwrap();
        assert!(matches!(LedgerConfig::load(&path), Err(LedgerError::InvalidConfig(_))));

        fs::write(&path, r#"{"index_prefix_len":0}"#).unwrap();
        assert!(matches!(LedgerConfig::load(&path), Err(LedgerError::InvalidConfig(_))));

        assert!(matches!(
            LedgerConfig::load(dir.path().join("missing.json")),
            Err(LedgerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_at_root() {
        let config = LedgerConfig::at("/srv/ledger");
        assert_eq!(config.registry_path, Some(PathBuf::from("/srv/ledger/registry.json")));
        assert_eq!(config.fs_options().index_prefix_len, 2);
    }
}
