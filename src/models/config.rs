// src/models/config.rs

//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Longest order window the Trading API accepts for `GetOrders`.
pub const MAX_LOOKBACK_DAYS: u32 = 90;

/// Upper bound for `policy.max_shipment_age_days` (ten years).
pub const MAX_SHIPMENT_AGE_DAYS: u32 = 3650;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Filtering and rate-limit policy for a run
    #[serde(default)]
    pub policy: RunPolicy,

    /// Parcel endpoint settings
    #[serde(default)]
    pub parcel: ParcelConfig,

    /// eBay Trading API settings
    #[serde(default)]
    pub ebay: EbayConfig,

    /// Submission history file
    #[serde(default)]
    pub history: HistoryConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extra carrier name mappings
    #[serde(default)]
    pub carriers: CarrierConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply environment overrides on top of file values.
    ///
    /// `lookup` resolves a variable name; pass `|k| std::env::var(k).ok()`
    /// for the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(days) = parse_var(&lookup, "MAX_SHIPMENT_AGE_DAYS")? {
            self.policy.max_shipment_age_days = days;
        }
        if let Some(cap) = parse_var(&lookup, "MAX_SUBMISSIONS_PER_RUN")? {
            self.policy.max_submissions_per_run = cap;
        }
        if let Some(days) = parse_var(&lookup, "LOOKBACK_DAYS")? {
            self.policy.lookback_days = days;
        }
        if let Some(path) = lookup("HISTORY_PATH").filter(|p| !p.trim().is_empty()) {
            self.history.path = path;
        }
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SHIPMENT_AGE_DAYS).contains(&self.policy.max_shipment_age_days) {
            return Err(AppError::validation(format!(
                "policy.max_shipment_age_days must be between 1 and {MAX_SHIPMENT_AGE_DAYS}"
            )));
        }
        if self.policy.max_submissions_per_run == 0 {
            return Err(AppError::validation(
                "policy.max_submissions_per_run must be > 0",
            ));
        }
        if !(1..=MAX_LOOKBACK_DAYS).contains(&self.policy.lookback_days) {
            return Err(AppError::validation(format!(
                "policy.lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}"
            )));
        }
        Url::parse(&self.parcel.base_url)
            .map_err(|e| AppError::validation(format!("parcel.base_url is invalid: {e}")))?;
        Url::parse(&self.ebay.api_url)
            .map_err(|e| AppError::validation(format!("ebay.api_url is invalid: {e}")))?;
        if self.parcel.timeout_secs == 0 || self.ebay.timeout_secs == 0 {
            return Err(AppError::validation("timeout_secs must be > 0"));
        }
        if self.ebay.entries_per_page == 0 || self.ebay.entries_per_page > 100 {
            return Err(AppError::validation(
                "ebay.entries_per_page must be between 1 and 100",
            ));
        }
        if self.history.path.trim().is_empty() {
            return Err(AppError::validation("history.path is empty"));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::config(format!("{key} is not a valid number: {raw:?}"))),
        _ => Ok(None),
    }
}

/// What to do with shipments whose carrier is not recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedCarrierPolicy {
    /// Send the raw carrier string and let Parcel sort it out
    #[default]
    SubmitRaw,
    /// Leave the shipment out of the run
    Skip,
}

/// Immutable per-run policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPolicy {
    /// Shipments older than this are never submitted
    #[serde(default = "defaults::max_shipment_age_days")]
    pub max_shipment_age_days: u32,

    /// Upper bound on successful submissions across all accounts
    #[serde(default = "defaults::max_submissions_per_run")]
    pub max_submissions_per_run: usize,

    /// How many days of orders to request from eBay
    #[serde(default = "defaults::lookback_days")]
    pub lookback_days: u32,

    #[serde(default)]
    pub unmapped_carrier: UnmappedCarrierPolicy,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            max_shipment_age_days: defaults::max_shipment_age_days(),
            max_submissions_per_run: defaults::max_submissions_per_run(),
            lookback_days: defaults::lookback_days(),
            unmapped_carrier: UnmappedCarrierPolicy::default(),
        }
    }
}

/// Parcel `add-delivery` endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelConfig {
    #[serde(default = "defaults::parcel_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pause between consecutive submissions in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Ask Parcel to push a confirmation to the phone
    #[serde(default = "defaults::send_push_confirmation")]
    pub send_push_confirmation: bool,
}

impl Default for ParcelConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::parcel_base_url(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            user_agent: defaults::user_agent(),
            send_push_confirmation: defaults::send_push_confirmation(),
        }
    }
}

/// eBay Trading API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EbayConfig {
    #[serde(default = "defaults::ebay_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub site_id: u32,

    #[serde(default = "defaults::compatibility_level")]
    pub compatibility_level: u32,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Orders per `GetOrders` page (eBay allows at most 100)
    #[serde(default = "defaults::entries_per_page")]
    pub entries_per_page: u32,

    /// Safety stop for pagination
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,
}

impl Default for EbayConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::ebay_api_url(),
            site_id: 0,
            compatibility_level: defaults::compatibility_level(),
            timeout_secs: defaults::timeout(),
            entries_per_page: defaults::entries_per_page(),
            max_pages: defaults::max_pages(),
        }
    }
}

/// Submission history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "defaults::history_path")]
    pub path: String,

    /// Write the history file after every successful submission
    #[serde(default = "defaults::flush_each_record")]
    pub flush_each_record: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: defaults::history_path(),
            flush_each_record: defaults::flush_each_record(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// User-supplied carrier aliases, raw name to Parcel carrier code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CarrierConfig {
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

mod defaults {
    // Policy defaults
    pub fn max_shipment_age_days() -> u32 {
        45
    }
    pub fn max_submissions_per_run() -> usize {
        20
    }
    pub fn lookback_days() -> u32 {
        30
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        concat!("ebay2parcel/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        500
    }

    // Parcel defaults
    pub fn parcel_base_url() -> String {
        "https://api.parcel.app/external/add-delivery/".into()
    }
    pub fn send_push_confirmation() -> bool {
        true
    }

    // eBay defaults
    pub fn ebay_api_url() -> String {
        "https://api.ebay.com/ws/api.dll".into()
    }
    pub fn compatibility_level() -> u32 {
        1193
    }
    pub fn entries_per_page() -> u32 {
        100
    }
    pub fn max_pages() -> u32 {
        10
    }

    // History defaults
    pub fn history_path() -> String {
        "tracking_history.json".into()
    }
    pub fn flush_each_record() -> bool {
        true
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
