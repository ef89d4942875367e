//! File-backed string key/value storage, the native stand-in for browser
//! `localStorage`.
//!
//! SYSTEM CONTEXT
//! ==============
//! The anonymous user id (`userId`) and the theme flag (`darkMode`) live here.
//! Values are strings, exactly as a browser would store them, and the whole
//! map is rewritten as one JSON object on every `set`.
//!
//! TRADE-OFFS
//! ==========
//! Reads are best-effort: a missing or corrupt file yields an empty store
//! (logged) so a broken profile never blocks the comment section. Writes
//! report errors so callers can decide whether persistence matters to them.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("storage encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value store persisted as a JSON object.
///
/// An in-memory store (no backing file) behaves identically except that
/// nothing survives the process.
#[derive(Debug, Default)]
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    /// Open the store at `path`, loading any existing entries.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self { path: Some(path), entries }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set `key` to `value` and flush the whole store to disk.
    ///
    /// The in-memory value is updated even when the flush fails.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing file cannot be written.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.flush()
    }

    fn flush(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(&self.entries)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io { path: parent.to_path_buf(), source })?;
        }
        fs::write(path, raw).map_err(|source| StorageError::Io { path: path.clone(), source })
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "local store unreadable; starting empty");
            return BTreeMap::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "local store corrupt; starting empty");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;
