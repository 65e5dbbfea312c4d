// src/services/parcel.rs

//! Parcel `add-delivery` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::ParcelConfig;
use crate::services::{Submission, SubmitOutcome, TrackingSink};
use crate::utils::http::{header_value, parcel_client};

/// Request body for `add-delivery`.
#[derive(Debug, Serialize)]
struct AddDeliveryRequest<'a> {
    tracking_number: &'a str,
    carrier_code: &'a str,
    description: &'a str,
    send_push_confirmation: bool,
}

/// Error body Parcel returns on rejection.
#[derive(Debug, Default, Deserialize)]
struct ParcelErrorBody {
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client submitting tracking numbers to Parcel.
pub struct ParcelClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    send_push_confirmation: bool,
}

impl ParcelClient {
    pub fn new(config: &ParcelConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            log::warn!("PARCEL_API_KEY is not set; every submission will fail");
        }
        Ok(Self {
            client: parcel_client(config)?,
            base_url: config.base_url.clone(),
            api_key,
            send_push_confirmation: config.send_push_confirmation,
        })
    }
}

#[async_trait]
impl TrackingSink for ParcelClient {
    async fn submit(&self, submission: &Submission) -> SubmitOutcome {
        if self.api_key.trim().is_empty() {
            return SubmitOutcome::Failed("missing Parcel API key".to_string());
        }

        let body = AddDeliveryRequest {
            tracking_number: &submission.tracking_number,
            carrier_code: &submission.carrier_code,
            description: &submission.description,
            send_push_confirmation: self.send_push_confirmation,
        };

        let response = match self
            .client
            .post(&self.base_url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return SubmitOutcome::Failed(format!("request error: {e}")),
        };

        let status = response.status().as_u16();
        let retry_after = header_value(response.headers(), "retry-after");
        let text = body_or_empty(response.text().await, &submission.tracking_number);

        let outcome = classify_response(status, &text, retry_after);
        log::debug!(
            "Parcel responded {} for {}: {}",
            status,
            submission.tracking_number,
            outcome
        );
        outcome
    }
}

/// An unreadable body is classified as empty; the status code still decides.
fn body_or_empty(body: reqwest::Result<String>, tracking: &str) -> String {
    body.unwrap_or_else(|e| {
        log::debug!("Parcel response body for {tracking} could not be read: {e}");
        String::new()
    })
}

/// Map a Parcel HTTP response onto a submission outcome.
pub fn classify_response(status: u16, body: &str, retry_after: Option<String>) -> SubmitOutcome {
    match status {
        200 => SubmitOutcome::Accepted,
        429 => SubmitOutcome::Throttled { retry_after },
        _ => {
            let message = error_message(body);
            if status == 400
                && message
                    .as_deref()
                    .is_some_and(|m| m.to_lowercase().contains("already added"))
            {
                return SubmitOutcome::AlreadyTracked;
            }
            let detail = message.unwrap_or_else(|| body.trim().to_string());
            if detail.is_empty() {
                SubmitOutcome::Failed(format!("HTTP {status}"))
            } else {
                SubmitOutcome::Failed(format!("HTTP {status}: {detail}"))
            }
        }
    }
}

fn error_message(body: &str) -> Option<String> {
    let parsed: ParcelErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error_message
        .or(parsed.message)
        .filter(|m| !m.trim().is_empty())
}
