// src/storage/mod.rs

//! Storage abstractions for submission history.
//!
//! The history is the durable set of tracking numbers Parcel has accepted.
//! It is loaded at the start of a run, appended to after each confirmed
//! submission and flushed before the run ends.
//!
//! ## File Layout
//!
//! ```text
//! tracking_history.json      # JSON array, pretty-printed
//! [
//!   {"tracking_number": "9400...", "added_at": "2025-01-02T03:04:05Z", "account": "default"},
//!   "1Z999AA10123456784"       # bare strings are accepted on load
//! ]
//! ```

pub mod local;
pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{HistoryEntry, StoredEntry};

// Re-export for convenience
pub use local::LocalHistoryStore;
pub use memory::MemoryHistoryStore;

/// Trait for history storage backends.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load persisted entries. A missing store is empty; a corrupt one is an error.
    async fn load(&mut self) -> Result<()>;

    fn contains(&self, tracking_number: &str) -> bool;

    /// Add an entry. Returns `false` if the tracking number was already known.
    fn record(&mut self, entry: HistoryEntry) -> bool;

    /// Persist all entries recorded so far.
    async fn flush(&mut self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in insertion order.
    fn entries(&self) -> &[StoredEntry];
}

/// Ordered entries with a set index for O(1) membership.
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    entries: Vec<StoredEntry>,
    seen: HashSet<String>,
}

impl HistoryIndex {
    /// Build an index from stored entries, dropping repeats.
    pub fn from_entries(stored: impl IntoIterator<Item = StoredEntry>) -> Self {
        let mut index = Self::default();
        for entry in stored {
            index.insert(entry);
        }
        index
    }

    pub fn insert(&mut self, entry: StoredEntry) -> bool {
        let number = entry.tracking_number().trim();
        if number.is_empty() || !self.seen.insert(number.to_string()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn contains(&self, tracking_number: &str) -> bool {
        self.seen.contains(tracking_number.trim())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[StoredEntry] {
        &self.entries
    }
}
