// src/services/carrier.rs

//! Carrier name normalization.
//!
//! eBay reports carriers as free text typed or picked by the seller
//! ("USPS", "US Postal Service", "UPS Ground", "Fed-Ex"). Parcel wants one
//! of its own carrier codes. Matching is case-insensitive and ignores
//! punctuation and extra whitespace.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CarrierId, NormalizedCarrier};

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern is valid"));

/// Built-in alias table, keyed by the spaced normal form.
const BUILTIN_ALIASES: &[(&str, CarrierId)] = &[
    ("usps", CarrierId::Usps),
    ("us postal service", CarrierId::Usps),
    ("u s postal service", CarrierId::Usps),
    ("united states postal service", CarrierId::Usps),
    ("usps ground advantage", CarrierId::Usps),
    ("usps priority mail", CarrierId::Usps),
    ("usps first class", CarrierId::Usps),
    ("ups", CarrierId::Ups),
    ("united parcel service", CarrierId::Ups),
    ("ups ground", CarrierId::Ups),
    ("ups mail innovations", CarrierId::Ups),
    ("fedex", CarrierId::Fedex),
    ("fed ex", CarrierId::Fedex),
    ("federal express", CarrierId::Fedex),
    ("fedex ground", CarrierId::Fedex),
    ("fedex smartpost", CarrierId::Fedex),
    ("dhl", CarrierId::Dhl),
    ("dhl express", CarrierId::Dhl),
    ("dhl ecommerce", CarrierId::Dhl),
    ("dhl global mail", CarrierId::Dhl),
    ("amazon", CarrierId::AmazonLogistics),
    ("amazon logistics", CarrierId::AmazonLogistics),
    ("amazon shipping", CarrierId::AmazonLogistics),
    ("amzl", CarrierId::AmazonLogistics),
    ("amzl us", CarrierId::AmazonLogistics),
];

/// Maps raw carrier strings onto Parcel carrier identifiers.
#[derive(Debug, Clone)]
pub struct CarrierNormalizer {
    aliases: HashMap<String, CarrierId>,
    custom: HashMap<String, CarrierId>,
}

impl CarrierNormalizer {
    /// Create a normalizer with the built-in alias table.
    pub fn new() -> Self {
        let aliases = BUILTIN_ALIASES
            .iter()
            .map(|(alias, id)| (alias.to_string(), id.clone()))
            .collect();
        Self {
            aliases,
            custom: HashMap::new(),
        }
    }

    /// Create a normalizer that also knows user aliases (raw name → Parcel code).
    ///
    /// User aliases win over the built-in table. An alias whose code matches a
    /// built-in carrier resolves to that carrier rather than a custom one.
    pub fn with_aliases<'a>(aliases: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let mut normalizer = Self::new();
        for (raw, code) in aliases {
            let key = spaced(raw);
            let code = code.trim().to_lowercase();
            if key.is_empty() || code.is_empty() {
                log::warn!("Ignoring empty carrier alias {raw:?} -> {code:?}");
                continue;
            }
            let id = builtin_for_code(&code).unwrap_or(CarrierId::Custom(code));
            normalizer.custom.insert(key, id);
        }
        normalizer
    }

    /// Normalize a raw carrier string.
    pub fn normalize(&self, carrier_raw: &str) -> NormalizedCarrier {
        let spaced = spaced(carrier_raw);
        if spaced.is_empty() {
            return NormalizedCarrier::Unmapped;
        }
        let compact = spaced.replace(' ', "");

        let found = self
            .lookup(&spaced)
            .or_else(|| self.lookup(&compact))
            .or_else(|| spaced.split(' ').find_map(|token| self.lookup(token)));

        match found {
            Some(id) => NormalizedCarrier::Mapped(id.clone()),
            None => NormalizedCarrier::Unmapped,
        }
    }

    fn lookup(&self, key: &str) -> Option<&CarrierId> {
        self.custom.get(key).or_else(|| self.aliases.get(key))
    }
}

impl Default for CarrierNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, with every run of non-alphanumerics collapsed to one space.
fn spaced(raw: &str) -> String {
    SEPARATORS
        .replace_all(&raw.to_lowercase(), " ")
        .trim()
        .to_string()
}

fn builtin_for_code(code: &str) -> Option<CarrierId> {
    [
        CarrierId::Usps,
        CarrierId::Ups,
        CarrierId::Fedex,
        CarrierId::Dhl,
        CarrierId::AmazonLogistics,
    ]
    .into_iter()
    .find(|id| id.parcel_code() == code)
}
