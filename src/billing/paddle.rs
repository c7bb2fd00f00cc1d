use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal client for the Paddle Billing transactions API.
pub struct PaddleClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Serialize)]
struct TransactionItem<'a> {
    price_id: &'a str,
    quantity: u32,
}

#[derive(Serialize)]
struct CustomData<'a> {
    #[serde(rename = "clerkUserId")]
    external_id: &'a str,
}

#[derive(Serialize)]
struct Checkout<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct CreateTransaction<'a> {
    items: [TransactionItem<'a>; 1],
    custom_data: CustomData<'a>,
    checkout: Checkout<'a>,
}

#[derive(Deserialize)]
struct Envelope {
    data: TransactionData,
}

#[derive(Deserialize)]
struct TransactionData {
    id: String,
}

impl PaddleClient {
    pub fn new(api_key: &str, base_url: &str) -> crate::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::ConfigError(format!("invalid billing.base_url: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::InternalError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    /// Create a one-item transaction tagged with the buyer's external id. Returns the transaction id.
    pub async fn create_transaction(&self, price_id: &str, external_id: &str, checkout_url: &str) -> crate::Result<String> {
        let url = self
            .base_url
            .join("transactions")
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        let body = CreateTransaction {
            items: [TransactionItem { price_id, quantity: 1 }],
            custom_data: CustomData { external_id },
            checkout: Checkout { url: checkout_url },
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalError(format!("billing request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalError(format!("billing provider responded with HTTP {}", status.as_u16())));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| AppError::ExternalError(format!("unreadable billing response: {}", e)))?;

        Ok(envelope.data.id)
    }
}
