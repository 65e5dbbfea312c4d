// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::{EbayConfig, ParcelConfig};

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Client for the Parcel API.
pub fn parcel_client(config: &ParcelConfig) -> Result<reqwest::Client> {
    create_async_client(&config.user_agent, config.timeout_secs)
}

/// Client for the eBay Trading API. Shares the Parcel user agent.
pub fn ebay_client(config: &EbayConfig, user_agent: &str) -> Result<reqwest::Client> {
    create_async_client(user_agent, config.timeout_secs)
}

/// Read an HTTP header as an owned string, ignoring non-ASCII values.
pub fn header_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
