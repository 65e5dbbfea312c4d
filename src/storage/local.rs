// src/storage/local.rs

//! Local filesystem history store.
//!
//! Keeps the whole history in memory and rewrites the JSON file on flush.
//! Writes go to a sibling temp file that is renamed over the original, so a
//! crash mid-write leaves the previous file intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{HistoryEntry, StoredEntry};
use crate::storage::{HistoryIndex, HistoryStore};

/// JSON file backed history store.
#[derive(Debug, Clone)]
pub struct LocalHistoryStore {
    path: PathBuf,
    index: HistoryIndex,
    dirty: bool,
}

impl LocalHistoryStore {
    /// Create a store for the given file. Nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: HistoryIndex::default(),
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl HistoryStore for LocalHistoryStore {
    async fn load(&mut self) -> Result<()> {
        let bytes = match self.read_bytes().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!(
                    "No history at {}; starting with an empty history",
                    self.display_path()
                );
                self.index = HistoryIndex::default();
                return Ok(());
            }
            Err(e) => return Err(AppError::persistence(self.display_path(), e)),
        };

        // An empty file is treated like a missing one.
        let stored: Vec<StoredEntry> = if bytes.iter().all(u8::is_ascii_whitespace) {
            Vec::new()
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                AppError::persistence(self.display_path(), format!("unreadable history: {e}"))
            })?
        };

        let total = stored.len();
        self.index = HistoryIndex::from_entries(stored);
        self.dirty = false;

        if self.index.len() < total {
            log::warn!(
                "History at {} contained {} duplicate or blank entries",
                self.display_path(),
                total - self.index.len()
            );
        }
        log::info!(
            "Loaded {} history entries from {}",
            self.index.len(),
            self.display_path()
        );
        Ok(())
    }

    fn contains(&self, tracking_number: &str) -> bool {
        self.index.contains(tracking_number)
    }

    fn record(&mut self, entry: HistoryEntry) -> bool {
        let added = self.index.insert(entry.into());
        self.dirty |= added;
        added
    }

    async fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            log::debug!("History unchanged; skipping write");
            return Ok(());
        }

        let bytes = serde_json::to_vec_pretty(self.index.entries())?;
        self.write_bytes(&bytes)
            .await
            .map_err(|e| AppError::persistence(self.display_path(), e))?;
        self.dirty = false;

        log::debug!(
            "Wrote {} history entries to {}",
            self.index.len(),
            self.display_path()
        );
        Ok(())
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn entries(&self) -> &[StoredEntry] {
        self.index.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalHistoryStore::new(dir.path().join("history.json"));

        store.load().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_record_flush_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let mut store = LocalHistoryStore::new(&path);
        store.load().await.unwrap();
        assert!(store.record(HistoryEntry::new("9400111").with_account("default")));
        assert!(!store.record(HistoryEntry::new("9400111")));
        assert!(store.record(HistoryEntry::new("1Z999").with_carrier("ups")));
        store.flush().await.unwrap();

        let mut reloaded = LocalHistoryStore::new(&path);
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("9400111"));
        assert!(reloaded.contains("1Z999"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_bare_entries_survive_flush() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, r#"["OLD1", "OLD2"]"#).await.unwrap();

        let mut store = LocalHistoryStore::new(&path);
        store.load().await.unwrap();
        store.record(HistoryEntry::new("NEW1"));
        store.flush().await.unwrap();

        let mut reloaded = LocalHistoryStore::new(&path);
        reloaded.load().await.unwrap();
        let numbers: Vec<&str> = reloaded
            .entries()
            .iter()
            .map(|e| e.tracking_number())
            .collect();
        assert_eq!(numbers, vec!["OLD1", "OLD2", "NEW1"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_fatal_and_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let mut store = LocalHistoryStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence { .. }));

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "{not json");
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, "\n").await.unwrap();

        let mut store = LocalHistoryStore::new(&path);
        store.load().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_flush_without_changes_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut store = LocalHistoryStore::new(&path);
        store.load().await.unwrap();
        store.flush().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_flush_failure_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        // A directory at the target path makes the rename fail.
        let path = dir.path().join("history.json");
        tokio::fs::create_dir(&path).await.unwrap();
        tokio::fs::write(path.join("keep"), "x").await.unwrap();

        let mut store = LocalHistoryStore::new(&path);
        store.record(HistoryEntry::new("9400111"));
        let err = store.flush().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence { .. }));
    }
}
