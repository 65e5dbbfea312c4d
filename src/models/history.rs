// src/models/history.rs

//! Submission history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracking number that Parcel accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub tracking_number: String,

    /// When the submission was confirmed
    pub added_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
}

impl HistoryEntry {
    pub fn new(tracking_number: impl Into<String>) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            added_at: Utc::now(),
            account: None,
            carrier: None,
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }
}

/// On-disk form of a history entry.
///
/// Bare strings are accepted so the file can be fixed up by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Detailed(HistoryEntry),
    Bare(String),
}

impl StoredEntry {
    pub fn tracking_number(&self) -> &str {
        match self {
            StoredEntry::Detailed(entry) => &entry.tracking_number,
            StoredEntry::Bare(number) => number,
        }
    }
}

impl From<HistoryEntry> for StoredEntry {
    fn from(entry: HistoryEntry) -> Self {
        StoredEntry::Detailed(entry)
    }
}
