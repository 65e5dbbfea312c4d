// src/services/accounts.rs

//! Account resolution from environment-style variables.
//!
//! The default account uses unsuffixed keys (`EBAY_APP_ID`, ...). Further
//! accounts repeat the keys with a numeric suffix (`EBAY_APP_ID_2`, ...).

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::models::AccountCredentials;

const APP_ID: &str = "EBAY_APP_ID";
const CLIENT_SECRET: &str = "EBAY_CLIENT_SECRET";
const DEV_ID: &str = "EBAY_DEV_ID";
const USER_TOKEN: &str = "EBAY_USER_TOKEN";
const REFRESH_TOKEN: &str = "EBAY_REFRESH_TOKEN";
const RUN_NAME: &str = "EBAY_RUN_NAME";

const ACCOUNT_KEYS: &[&str] = &[APP_ID, CLIENT_SECRET, DEV_ID, USER_TOKEN, REFRESH_TOKEN];

static SUFFIXED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(EBAY_APP_ID|EBAY_CLIENT_SECRET|EBAY_DEV_ID|EBAY_USER_TOKEN|EBAY_REFRESH_TOKEN)_(\d+)$")
        .expect("account key pattern is valid")
});

/// Build a variable name for an optional account suffix, as written.
pub fn key(base: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(n) => format!("{base}_{n}"),
        None => base.to_string(),
    }
}

/// A numbered account: the suffix as written plus its value for ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    number: u32,
    text: String,
}

/// Resolves the ordered list of configured eBay accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountIterator {
    vars: HashMap<String, String>,
}

impl AccountIterator {
    /// Snapshot the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Default account first, then numbered accounts by ascending suffix.
    ///
    /// Accounts missing `EBAY_APP_ID` or `EBAY_CLIENT_SECRET` are skipped with
    /// a warning.
    pub fn accounts(&self) -> Vec<AccountCredentials> {
        let mut slots: Vec<Option<Slot>> = Vec::new();
        if ACCOUNT_KEYS.iter().any(|k| self.get(k).is_some()) {
            slots.push(None);
        }
        slots.extend(self.suffixes().into_iter().map(Some));

        slots
            .into_iter()
            .filter_map(|slot| self.resolve(slot.as_ref()))
            .collect()
    }

    /// Numbered suffixes in ascending order. `_01` and `_1` stay distinct.
    fn suffixes(&self) -> BTreeSet<Slot> {
        self.vars
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .filter_map(|(k, _)| SUFFIXED_KEY.captures(k))
            .filter_map(|caps| {
                let text = caps.get(2)?.as_str();
                Some(Slot {
                    number: text.parse().ok()?,
                    text: text.to_string(),
                })
            })
            .collect()
    }

    fn resolve(&self, slot: Option<&Slot>) -> Option<AccountCredentials> {
        let suffix = slot.map(|s| s.text.as_str());
        let get = |base: &str| self.get(&key(base, suffix)).unwrap_or_default();

        let app_id = get(APP_ID);
        let client_secret = get(CLIENT_SECRET);

        let missing: Vec<String> = [(APP_ID, &app_id), (CLIENT_SECRET, &client_secret)]
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(base, _)| key(base, suffix))
            .collect();
        if !missing.is_empty() {
            log::warn!(
                "Skipping eBay account {}: {} not set",
                display_name(suffix),
                missing.join(", ")
            );
            return None;
        }

        let run_name = self
            .get(&key(RUN_NAME, suffix))
            .unwrap_or_else(|| display_name(suffix));

        Some(AccountCredentials {
            suffix: slot.map(|s| s.number),
            run_name,
            app_id,
            client_secret,
            dev_id: get(DEV_ID),
            access_token: get(USER_TOKEN),
            refresh_token: get(REFRESH_TOKEN),
        })
    }

    fn get(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn display_name(suffix: Option<&str>) -> String {
    match suffix {
        Some(n) => format!("account_{n}"),
        None => "default".to_string(),
    }
}
