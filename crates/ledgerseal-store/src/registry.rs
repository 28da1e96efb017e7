//! Key registry file I/O.
//!
//! The registry is small and rewritten whole on rotation: serialize, write
//! a temp file in the same directory, fsync, rename over the old file.

use std::fs;
use std::io::Write;
use std::path::Path;

use ledgerseal_core::KeyRegistry;
use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};

/// Read a registry file.
pub fn load_registry(path: impl AsRef<Path>) -> Result<KeyRegistry> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let registry = KeyRegistry::from_json(&text)?;
    tracing::debug!(
        path = %path.display(),
        keys = registry.len(),
        active = registry.active_key_id(),
        "loaded key registry"
    );
    Ok(registry)
}

/// Atomically replace a registry file.
pub fn save_registry(path: impl AsRef<Path>, registry: &KeyRegistry) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let json = registry.to_json_pretty()?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    tracing::info!(path = %path.display(), active = registry.active_key_id(), "saved key registry");
    Ok(())
}
