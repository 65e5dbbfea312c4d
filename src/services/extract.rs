// src/services/extract.rs

//! Shipment extraction from eBay orders.
//!
//! Turns one `GetOrders` order into zero or more normalized shipments. A bad
//! tracking entry is counted and skipped; it never fails the order.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::order::{Order, ShipmentRecord, TrackingDetails};
use crate::models::{Shipment, ShipmentStatus};
use crate::services::CarrierNormalizer;

/// Description used when the order carries no item title.
pub const DEFAULT_DESCRIPTION: &str = "eBay Item";

const MAX_DESCRIPTION_CHARS: usize = 30;

/// Shipments pulled from one order plus the entries that were unusable.
#[derive(Debug, Default)]
pub struct Extraction {
    pub shipments: Vec<Shipment>,
    /// Tracking entries skipped because they had no tracking number
    pub anomalies: usize,
}

/// Extracts normalized shipments from raw orders.
pub struct ShipmentExtractor<'a> {
    normalizer: &'a CarrierNormalizer,
}

impl<'a> ShipmentExtractor<'a> {
    pub fn new(normalizer: &'a CarrierNormalizer) -> Self {
        Self { normalizer }
    }

    /// Extract every tracked shipment of `order`, in document order.
    pub fn extract(&self, order: &Order) -> Extraction {
        let mut extraction = Extraction::default();
        let order_id = order.order_id.clone().unwrap_or_default();
        let description = describe(order);
        let event_date = order
            .shipped_time
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| order.created_time.as_deref().and_then(parse_timestamp));
        let delivered_elsewhere = delivered_tracking_numbers(order.shipment_records());

        let mut seen = HashSet::new();
        for details in tracking_details(order) {
            let Some(tracking_number) = details
                .shipment_tracking_number
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
            else {
                log::debug!("Order {order_id}: tracking entry without a number, skipping");
                extraction.anomalies += 1;
                continue;
            };

            if !seen.insert(tracking_number.to_string()) {
                continue;
            }

            let carrier_raw = details
                .shipping_carrier_used
                .as_deref()
                .or(details.shipping_carrier_code.as_deref())
                .unwrap_or("")
                .to_string();

            let status = if delivered_elsewhere.contains(tracking_number) {
                ShipmentStatus::Delivered
            } else {
                tracking_status(details)
            };

            extraction.shipments.push(Shipment {
                tracking_number: tracking_number.to_string(),
                carrier: self.normalizer.normalize(&carrier_raw),
                carrier_raw,
                status,
                event_date,
                order_id: order_id.clone(),
                description: description.clone(),
            });
        }

        extraction
    }
}

/// Order-level tracking entries, or every transaction's entries if there are none.
fn tracking_details(order: &Order) -> Vec<&TrackingDetails> {
    let order_level: Vec<&TrackingDetails> = order
        .shipping_details
        .iter()
        .flat_map(|sd| sd.tracking_details.iter())
        .collect();
    if !order_level.is_empty() {
        return order_level;
    }

    order
        .transactions()
        .iter()
        .filter_map(|txn| txn.shipping_details.as_ref())
        .flat_map(|sd| sd.tracking_details.iter())
        .collect()
}

/// Tracking numbers that `ShipmentArray` reports as delivered.
pub fn delivered_tracking_numbers(records: &[ShipmentRecord]) -> HashSet<String> {
    let mut delivered = HashSet::new();
    for record in records {
        let record_delivered = is_delivered(
            record.status.as_deref(),
            record.actual_delivery_date.as_deref(),
            record.delivery_date.as_deref(),
        );

        for details in &record.tracking_details {
            let Some(number) = details
                .shipment_tracking_number
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
            else {
                continue;
            };
            if record_delivered || tracking_status(details) == ShipmentStatus::Delivered {
                delivered.insert(number.to_string());
            }
        }
    }
    delivered
}

fn tracking_status(details: &TrackingDetails) -> ShipmentStatus {
    let status = details
        .delivery_status
        .as_deref()
        .or(details.status.as_deref());

    if is_delivered(
        status,
        details.actual_delivery_date.as_deref(),
        details.delivery_date.as_deref(),
    ) {
        return ShipmentStatus::Delivered;
    }

    match status.map(str::to_lowercase) {
        Some(s)
            if ["transit", "shipped", "out for delivery", "accepted", "picked up"]
                .iter()
                .any(|k| s.contains(k)) =>
        {
            ShipmentStatus::InTransit
        }
        _ => ShipmentStatus::Unknown,
    }
}

fn is_delivered(status: Option<&str>, actual: Option<&str>, scheduled: Option<&str>) -> bool {
    let has_date = |d: Option<&str>| d.is_some_and(|d| !d.trim().is_empty());
    if has_date(actual) || has_date(scheduled) {
        return true;
    }
    status.is_some_and(|s| {
        let s = s.to_lowercase();
        s.contains("delivered") && !s.contains("undelivered") && !s.contains("not delivered")
    })
}

/// First item title, shortened for the Parcel label.
fn describe(order: &Order) -> String {
    let title = order
        .transactions()
        .first()
        .and_then(|txn| txn.item.as_ref())
        .and_then(|item| item.title.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION);

    if title.chars().count() > MAX_DESCRIPTION_CHARS {
        let head: String = title.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

/// Parse an eBay ISO 8601 timestamp (`2024-11-10T12:00:00.000Z`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
