// src/models/mod.rs

//! Domain models for the sync application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod account;
mod config;
mod history;
pub mod order;
mod shipment;

// Re-export all public types
pub use account::{AccountCredentials, redact};
pub use config::{
    CarrierConfig, Config, EbayConfig, HistoryConfig, LoggingConfig, MAX_LOOKBACK_DAYS,
    MAX_SHIPMENT_AGE_DAYS, ParcelConfig, RunPolicy, UnmappedCarrierPolicy,
};
pub use history::{HistoryEntry, StoredEntry};
pub use order::Order;
pub use shipment::{
    CarrierId, NormalizedCarrier, PLACEHOLDER_CARRIER_CODE, Shipment, ShipmentStatus,
};
