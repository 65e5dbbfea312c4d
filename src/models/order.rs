// src/models/order.rs

//! eBay Trading API `GetOrders` response types.
//!
//! Only the fields the sync reads are modelled. Every field is optional or
//! defaulted so a sparse or partially malformed order still decodes; the
//! extractor decides what is usable.

use serde::Deserialize;

/// Top-level `GetOrdersResponse` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetOrdersResponse {
    /// `Success`, `Warning` or `Failure`
    #[serde(default)]
    pub ack: Option<String>,

    #[serde(default)]
    pub errors: Vec<ApiError>,

    #[serde(default)]
    pub order_array: Option<OrderArray>,

    #[serde(default)]
    pub has_more_orders: Option<bool>,

    #[serde(default)]
    pub pagination_result: Option<PaginationResult>,
}

impl GetOrdersResponse {
    /// Consume the response and return its orders in document order.
    pub fn into_orders(self) -> Vec<Order> {
        self.order_array.map(|a| a.orders).unwrap_or_default()
    }

    /// Whether another page follows `page`. `HasMoreOrders` wins; without it
    /// the page count from `PaginationResult` decides.
    pub fn has_more_after(&self, page: u32) -> bool {
        match self.has_more_orders {
            Some(more) => more,
            None => self
                .pagination_result
                .as_ref()
                .and_then(|p| p.total_number_of_pages)
                .is_some_and(|total| page < total),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.ack
            .as_deref()
            .is_some_and(|ack| ack.eq_ignore_ascii_case("failure"))
    }

    pub fn is_warning(&self) -> bool {
        self.ack
            .as_deref()
            .is_some_and(|ack| ack.eq_ignore_ascii_case("warning"))
    }
}

/// An entry of the `Errors` list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiError {
    #[serde(default)]
    pub short_message: Option<String>,

    #[serde(default)]
    pub long_message: Option<String>,

    #[serde(default)]
    pub error_code: Option<String>,

    #[serde(default)]
    pub severity_code: Option<String>,
}

impl ApiError {
    /// Best human-readable message available.
    pub fn message(&self) -> String {
        let text = self
            .long_message
            .as_deref()
            .or(self.short_message.as_deref())
            .unwrap_or("unknown error");
        match &self.error_code {
            Some(code) => format!("[{code}] {text}"),
            None => text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaginationResult {
    #[serde(default)]
    pub total_number_of_pages: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderArray {
    #[serde(rename = "Order", default)]
    pub orders: Vec<Order>,
}

/// One buyer order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    #[serde(rename = "OrderID", default)]
    pub order_id: Option<String>,

    #[serde(default)]
    pub created_time: Option<String>,

    #[serde(default)]
    pub shipped_time: Option<String>,

    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,

    #[serde(default)]
    pub transaction_array: Option<TransactionArray>,

    #[serde(default)]
    pub shipment_array: Option<ShipmentArray>,
}

impl Order {
    /// Transactions in document order (empty if absent).
    pub fn transactions(&self) -> &[Transaction] {
        self.transaction_array
            .as_ref()
            .map(|a| a.transactions.as_slice())
            .unwrap_or_default()
    }

    /// Delivery records from `ShipmentArray` (empty if absent).
    pub fn shipment_records(&self) -> &[ShipmentRecord] {
        self.shipment_array
            .as_ref()
            .map(|a| a.shipments.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingDetails {
    #[serde(rename = "ShipmentTrackingDetails", default)]
    pub tracking_details: Vec<TrackingDetails>,
}

/// Tracking number and carrier as reported by the seller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrackingDetails {
    #[serde(default)]
    pub shipment_tracking_number: Option<String>,

    #[serde(default)]
    pub shipping_carrier_used: Option<String>,

    #[serde(default)]
    pub shipping_carrier_code: Option<String>,

    #[serde(default)]
    pub delivery_status: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub actual_delivery_date: Option<String>,

    #[serde(default)]
    pub delivery_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionArray {
    #[serde(rename = "Transaction", default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    #[serde(default)]
    pub item: Option<Item>,

    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipmentArray {
    #[serde(rename = "Shipment", default)]
    pub shipments: Vec<ShipmentRecord>,
}

/// Delivery-side view of a shipment, used only to detect delivered parcels.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShipmentRecord {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub actual_delivery_date: Option<String>,

    #[serde(default)]
    pub delivery_date: Option<String>,

    #[serde(rename = "ShipmentTrackingDetails", default)]
    pub tracking_details: Vec<TrackingDetails>,
}
