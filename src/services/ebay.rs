// src/services/ebay.rs

//! eBay Trading API `GetOrders` client (buyer role).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::{AppError, Result};
use crate::models::order::{ApiError, GetOrdersResponse};
use crate::models::{AccountCredentials, EbayConfig, Order};
use crate::services::OrderSource;
use crate::utils::http::ebay_client;

const CALL_NAME: &str = "GetOrders";

/// eBay error codes meaning the token or application keys were rejected.
const AUTH_ERROR_CODES: &[&str] = &["931", "932", "16110", "21916013", "21917053"];

/// `GetOrders` client for buyer-side orders.
pub struct EbayClient {
    client: reqwest::Client,
    config: EbayConfig,
}

impl EbayClient {
    pub fn new(config: &EbayConfig, user_agent: &str) -> Result<Self> {
        Ok(Self {
            client: ebay_client(config, user_agent)?,
            config: config.clone(),
        })
    }

    /// Fetch a single page.
    async fn fetch_page(
        &self,
        account: &AccountCredentials,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: u32,
    ) -> Result<GetOrdersResponse> {
        let body = request_body(from, to, self.config.entries_per_page, page);

        let response = self
            .client
            .post(&self.config.api_url)
            .header("X-EBAY-API-CALL-NAME", CALL_NAME)
            .header("X-EBAY-API-SITEID", self.config.site_id.to_string())
            .header(
                "X-EBAY-API-COMPATIBILITY-LEVEL",
                self.config.compatibility_level.to_string(),
            )
            .header("X-EBAY-API-APP-NAME", &account.app_id)
            .header("X-EBAY-API-DEV-NAME", &account.dev_id)
            .header("X-EBAY-API-CERT-NAME", &account.client_secret)
            .header("X-EBAY-API-IAF-TOKEN", &account.access_token)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::auth(&account.run_name, "HTTP 401 Unauthorized"));
        }
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AppError::ebay(&account.run_name, format!("HTTP {status}")));
        }

        parse_response(&account.run_name, &text)
    }
}

#[async_trait]
impl OrderSource for EbayClient {
    async fn fetch_orders(
        &self,
        account: &AccountCredentials,
        lookback_days: u32,
    ) -> Result<Vec<Order>> {
        if !account.has_access_token() {
            return Err(AppError::auth(
                &account.run_name,
                "no user access token configured",
            ));
        }

        let to = Utc::now();
        let from = to - Duration::days(i64::from(lookback_days));
        let mut orders = Vec::new();

        for page in 1..=self.config.max_pages {
            let response = self.fetch_page(account, from, to, page).await?;
            let has_more = response.has_more_after(page);
            let batch = response.into_orders();
            log::debug!(
                "account={} GetOrders page {} returned {} orders",
                account.run_name,
                page,
                batch.len()
            );
            orders.extend(batch);

            if !has_more {
                break;
            }
            if page == self.config.max_pages {
                log::warn!(
                    "account={} stopped paging after {} pages; older orders were not fetched",
                    account.run_name,
                    page
                );
            }
        }

        log::info!(
            "account={} GetOrders retrieved {} orders",
            account.run_name,
            orders.len()
        );
        Ok(orders)
    }
}

/// Build the `GetOrdersRequest` XML body.
pub fn request_body(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    entries_per_page: u32,
    page: u32,
) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<GetOrdersRequest xmlns="urn:ebay:apis:eBLBaseComponents">
  <CreateTimeFrom>{}</CreateTimeFrom>
  <CreateTimeTo>{}</CreateTimeTo>
  <OrderRole>Buyer</OrderRole>
  <DetailLevel>ReturnAll</DetailLevel>
  <Pagination>
    <EntriesPerPage>{}</EntriesPerPage>
    <PageNumber>{}</PageNumber>
  </Pagination>
</GetOrdersRequest>"#,
        api_timestamp(from),
        api_timestamp(to),
        entries_per_page,
        page
    )
}

/// Trading API timestamp (`YYYY-MM-DDTHH:MM:SS.sssZ`).
fn api_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Decode a response body and check its acknowledgement.
pub fn parse_response(account: &str, xml: &str) -> Result<GetOrdersResponse> {
    let response: GetOrdersResponse = quick_xml::de::from_str(xml)?;

    if response.is_failure() {
        if let Some(err) = response.errors.iter().find(|e| is_auth_error(e)) {
            return Err(AppError::auth(account, err.message()));
        }
        let message = if response.errors.is_empty() {
            "Ack=Failure with no error details".to_string()
        } else {
            join_messages(&response.errors)
        };
        return Err(AppError::ebay(account, message));
    }

    if response.is_warning() {
        log::warn!(
            "account={} GetOrders returned Ack=Warning: {}",
            account,
            join_messages(&response.errors)
        );
    }

    Ok(response)
}

fn is_auth_error(error: &ApiError) -> bool {
    error
        .error_code
        .as_deref()
        .is_some_and(|code| AUTH_ERROR_CODES.contains(&code.trim()))
}

fn join_messages(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(ApiError::message)
        .collect::<Vec<_>>()
        .join("; ")
}
