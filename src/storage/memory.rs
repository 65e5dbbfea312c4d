// src/storage/memory.rs

//! In-memory history store for tests and embedding.

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{HistoryEntry, StoredEntry};
use crate::storage::{HistoryIndex, HistoryStore};

/// History store that never touches disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    index: HistoryIndex,
    flushes: usize,
    fail_flush: bool,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from already-known tracking numbers.
    pub fn with_numbers<I, S>(numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index: HistoryIndex::from_entries(
                numbers.into_iter().map(|n| StoredEntry::Bare(n.into())),
            ),
            ..Self::default()
        }
    }

    /// Make every `flush` fail, to exercise persistence error paths.
    pub fn failing_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }

    /// Number of flushes performed.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&mut self) -> Result<()> {
        Ok(())
    }

    fn contains(&self, tracking_number: &str) -> bool {
        self.index.contains(tracking_number)
    }

    fn record(&mut self, entry: HistoryEntry) -> bool {
        self.index.insert(entry.into())
    }

    async fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        if self.fail_flush {
            return Err(AppError::persistence("<memory>", "flush disabled"));
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn entries(&self) -> &[StoredEntry] {
        self.index.entries()
    }
}
