// src/models/shipment.rs

//! Normalized shipment record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Carrier placeholder code Parcel accepts when the carrier is unknown.
pub const PLACEHOLDER_CARRIER_CODE: &str = "pholder";

/// Canonical carrier identifiers understood by Parcel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarrierId {
    Usps,
    Ups,
    Fedex,
    Dhl,
    AmazonLogistics,
    /// Carrier code supplied through `[carriers.aliases]`
    Custom(String),
}

impl CarrierId {
    /// Parcel `carrier_code` for this carrier.
    pub fn parcel_code(&self) -> &str {
        match self {
            CarrierId::Usps => "usps",
            CarrierId::Ups => "ups",
            CarrierId::Fedex => "fedex",
            CarrierId::Dhl => "dhl",
            CarrierId::AmazonLogistics => "amazon-logistics",
            CarrierId::Custom(code) => code,
        }
    }
}

impl fmt::Display for CarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.parcel_code())
    }
}

/// Outcome of carrier normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedCarrier {
    Mapped(CarrierId),
    Unmapped,
}

impl NormalizedCarrier {
    pub fn is_mapped(&self) -> bool {
        matches!(self, NormalizedCarrier::Mapped(_))
    }
}

/// Delivery state derived from eBay tracking data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentStatus {
    Delivered,
    InTransit,
    Unknown,
}

/// A single tracked shipment extracted from an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    pub tracking_number: String,

    /// Carrier string exactly as eBay reported it (empty if missing)
    pub carrier_raw: String,

    pub carrier: NormalizedCarrier,

    pub status: ShipmentStatus,

    /// When the order shipped; `None` when eBay gave no usable date
    pub event_date: Option<DateTime<Utc>>,

    pub order_id: String,

    /// Short label shown in Parcel
    pub description: String,
}

impl Shipment {
    /// Carrier code to send to Parcel.
    ///
    /// Unmapped carriers fall back to the raw eBay string, or the
    /// placeholder code when eBay sent nothing.
    pub fn carrier_code(&self) -> String {
        match &self.carrier {
            NormalizedCarrier::Mapped(id) => id.parcel_code().to_string(),
            NormalizedCarrier::Unmapped => {
                let raw = self.carrier_raw.trim();
                if raw.is_empty() {
                    PLACEHOLDER_CARRIER_CODE.to_string()
                } else {
                    raw.to_string()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipment(carrier_raw: &str, carrier: NormalizedCarrier) -> Shipment {
        Shipment {
            tracking_number: "1Z999".to_string(),
            carrier_raw: carrier_raw.to_string(),
            carrier,
            status: ShipmentStatus::InTransit,
            event_date: None,
            order_id: "01-0001".to_string(),
            description: "eBay Item".to_string(),
        }
    }

    #[test]
    fn test_carrier_code_mapped() {
        let s = shipment("UPS Ground", NormalizedCarrier::Mapped(CarrierId::Ups));
        assert_eq!(s.carrier_code(), "ups");
    }

    #[test]
    fn test_carrier_code_unmapped_uses_raw() {
        let s = shipment("  Evri ", NormalizedCarrier::Unmapped);
        assert_eq!(s.carrier_code(), "Evri");
    }

    #[test]
    fn test_carrier_code_unmapped_empty_uses_placeholder() {
        let s = shipment("", NormalizedCarrier::Unmapped);
        assert_eq!(s.carrier_code(), PLACEHOLDER_CARRIER_CODE);
    }
}
