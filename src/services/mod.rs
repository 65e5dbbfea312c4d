// src/services/mod.rs

//! Service layer for the sync application.
//!
//! This module contains the business logic for:
//! - Account discovery (`AccountIterator`)
//! - Carrier normalization (`CarrierNormalizer`)
//! - Shipment extraction (`ShipmentExtractor`)
//! - Fetching eBay orders (`EbayClient`, an `OrderSource`)
//! - Submitting to Parcel (`ParcelClient`, a `TrackingSink`)

mod accounts;
mod carrier;
mod ebay;
mod extract;
mod parcel;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::{AccountCredentials, Order, Shipment};

pub use accounts::AccountIterator;
pub use carrier::CarrierNormalizer;
pub use ebay::EbayClient;
pub use extract::{DEFAULT_DESCRIPTION, Extraction, ShipmentExtractor, parse_timestamp};
pub use parcel::{ParcelClient, classify_response};

/// Source of purchase orders for one account.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Fetch orders created within the last `lookback_days`.
    ///
    /// `AppError::Auth` stops only this account; any other error ends the run.
    async fn fetch_orders(
        &self,
        account: &AccountCredentials,
        lookback_days: u32,
    ) -> Result<Vec<Order>>;
}

/// Destination for tracking numbers.
#[async_trait]
pub trait TrackingSink: Send + Sync {
    /// Submit one tracking number. Never fails; errors become `Failed`.
    async fn submit(&self, submission: &Submission) -> SubmitOutcome;
}

/// Payload sent to the tracking sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub tracking_number: String,
    pub carrier_code: String,
    pub description: String,
}

impl From<&Shipment> for Submission {
    fn from(shipment: &Shipment) -> Self {
        Self {
            tracking_number: shipment.tracking_number.clone(),
            carrier_code: shipment.carrier_code(),
            description: shipment.description.clone(),
        }
    }
}

/// Result of a single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Parcel already tracks this number
    AlreadyTracked,
    /// Rate-limited; `retry_after` is the raw `Retry-After` header
    Throttled { retry_after: Option<String> },
    Failed(String),
}

impl fmt::Display for SubmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitOutcome::Accepted => f.write_str("accepted"),
            SubmitOutcome::AlreadyTracked => f.write_str("already_tracked"),
            SubmitOutcome::Throttled { retry_after: None } => f.write_str("throttled"),
            SubmitOutcome::Throttled {
                retry_after: Some(after),
            } => write!(f, "throttled (retry after {after})"),
            SubmitOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarrierId, NormalizedCarrier, ShipmentStatus};

    #[test]
    fn test_submission_from_shipment() {
        let shipment = Shipment {
            tracking_number: "9400111899223197428490".to_string(),
            carrier_raw: "USPS".to_string(),
            carrier: NormalizedCarrier::Mapped(CarrierId::Usps),
            status: ShipmentStatus::InTransit,
            event_date: None,
            order_id: "12-34567-89012".to_string(),
            description: "Mechanical Keyboard".to_string(),
        };

        let submission = Submission::from(&shipment);
        assert_eq!(submission.carrier_code, "usps");
        assert_eq!(submission.description, "Mechanical Keyboard");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(SubmitOutcome::AlreadyTracked.to_string(), "already_tracked");
        let throttled = SubmitOutcome::Throttled {
            retry_after: Some("60".to_string()),
        };
        assert_eq!(throttled.to_string(), "throttled (retry after 60)");
        assert_eq!(
            SubmitOutcome::Failed("HTTP 500".to_string()).to_string(),
            "failed: HTTP 500"
        );
    }
}
