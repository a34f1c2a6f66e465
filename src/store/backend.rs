//! Blob storage backends
//!
//! The query store keeps its whole collection as one text value under one
//! key. Backends only need synchronous get/set/remove by key.

use crate::types::{AppError, AppResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Synchronous key/value text store
pub trait BlobStore {
    /// Read the value under `key`; a missing key is `Ok(None)`
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Replace the value under `key` in a single write
    fn set(&mut self, key: &str, value: &str) -> AppResult<()>;

    fn remove(&mut self, key: &str) -> AppResult<()>;
}

/// Stores each key as `<key>.csv` inside a data directory
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    base_dir: PathBuf,
}

impl FileBlobStore {
    /// Use the platform data directory, falling back to the current directory
    pub fn new() -> Self {
        Self {
            base_dir: Self::default_dir(),
        }
    }

    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pubmed-query")
    }

    /// Create storage rooted at a custom directory (useful for testing)
    pub fn with_path(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_dir.join(format!("{}.csv", key)))
    }

    fn ensure_dir(&self) -> AppResult<()> {
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            AppError::Persistence(format!("cannot create {:?}: {}", self.base_dir, e))
        })
    }
}

impl Default for FileBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            debug!(path = ?path, "No blob on disk");
            return Ok(None);
        }
        let bytes = fs::read(&path)
            .map_err(|e| AppError::Persistence(format!("cannot read {:?}: {}", path, e)))?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(Some(content)),
            Err(e) => {
                // Recover what we can; undecodable bytes become U+FFFD
                warn!(path = ?path, error = %e.utf8_error(), "Blob is not valid UTF-8");
                Ok(Some(String::from_utf8_lossy(e.as_bytes()).into_owned()))
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        self.ensure_dir()?;

        // Write beside the target and rename so a failed write keeps the old blob
        let tmp_path = self.base_dir.join(format!(".{}.csv.tmp", key));
        if let Err(e) = fs::write(&tmp_path, value) {
            let _ = fs::remove_file(&tmp_path);
            return Err(AppError::Persistence(format!("cannot write {:?}: {}", tmp_path, e)));
        }
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            AppError::Persistence(format!("cannot replace {:?}: {}", path, e))
        })?;

        info!(path = ?path, bytes = value.len(), "Saved blob");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> AppResult<()> {
        let path = self.path_for(key)?;
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| AppError::Persistence(format!("cannot remove {:?}: {}", path, e)))?;
        }
        Ok(())
    }
}

/// In-process backend with an optional byte quota
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would push the total stored bytes past `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        if let Some(quota) = self.quota {
            let others: usize = self
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > quota {
                return Err(AppError::Persistence(format!(
                    "quota of {} bytes exceeded",
                    quota
                )));
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

fn validate_key(key: &str) -> AppResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(AppError::Config(format!("invalid storage key {:?}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileBlobStore::with_path(temp_dir.path().join("nested"));

        assert_eq!(store.get("queries").unwrap(), None);
        store.set("queries", "header\nrow").unwrap();
        assert_eq!(store.get("queries").unwrap().as_deref(), Some("header\nrow"));

        store.remove("queries").unwrap();
        assert_eq!(store.get("queries").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::with_path(temp_dir.path());
        assert!(store.path_for("../escape").is_err());
        assert!(store.path_for(".hidden").is_err());
        assert!(store.path_for("pubmed_query_csv_data").is_ok());
    }

    #[test]
    fn test_file_store_failed_write_keeps_previous_value() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileBlobStore::with_path(temp_dir.path());
        store.set("queries", "old").unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(temp_dir.path().join(".queries.csv.tmp")).unwrap();
        let err = store.set("queries", "new").unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(store.get("queries").unwrap().as_deref(), Some("old"));
    }

    #[test]
    fn test_file_store_reads_invalid_utf8_lossily() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::with_path(temp_dir.path());
        fs::write(temp_dir.path().join("queries.csv"), b"header\n\"caf\xe9\",\"x\"").unwrap();

        let content = store.get("queries").unwrap().unwrap();
        assert!(content.starts_with("header\n"));
        assert!(content.contains('\u{fffd}'));
    }

    #[test]
    fn test_memory_store_quota() {
        let mut store = MemoryBlobStore::with_quota(8);
        store.set("k", "12345678").unwrap();
        assert!(store.set("k", "123456789").is_err());
        assert_eq!(store.raw("k"), Some("12345678"));
    }
}
