//! Billing collaborator: checkout creation and the signed payment webhook.

mod paddle;
pub mod signature;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::auth::Identity;
use crate::config::BillingConfig;
use crate::db::UserStore;
use crate::error::{AppError, WebhookError};

pub use paddle::PaddleClient;

pub const TRANSACTION_COMPLETED: &str = "transaction.completed";

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    event_type: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Upgraded(String),
    UnknownUser(String),
    Ignored(String),
}

pub struct BillingService {
    users: Arc<dyn UserStore>,
    webhook_secret: Option<String>,
    checkout: Option<Checkout>,
}

struct Checkout {
    client: PaddleClient,
    price_id: String,
    return_url: String,
}

impl BillingService {
    pub fn new(users: Arc<dyn UserStore>, config: &BillingConfig) -> crate::Result<Self> {
        let checkout = match (config.api_key.as_deref(), config.price_id.as_deref()) {
            (Some(key), Some(price)) if !key.is_empty() && !price.is_empty() => Some(Checkout {
                client: PaddleClient::new(key, &config.base_url)?,
                price_id: price.to_string(),
                return_url: config.checkout_url.clone(),
            }),
            _ => {
                tracing::warn!("Billing API key or price id missing, checkout disabled");
                None
            }
        };

        if config.webhook_secret.as_deref().map_or(true, str::is_empty) {
            tracing::warn!("No billing webhook secret configured, every webhook will be rejected");
        }

        Ok(Self {
            users,
            webhook_secret: config.webhook_secret.clone(),
            checkout,
        })
    }

    /// Verify and apply a webhook delivery. Nothing is touched unless the signature checks out.
    pub async fn handle_webhook(&self, signature: Option<&str>, body: &[u8]) -> crate::Result<WebhookOutcome> {
        if let Err(e) = signature::verify(self.webhook_secret.as_deref(), signature, body) {
            tracing::warn!(error = %e, "Rejected billing webhook");
            return Err(e.into());
        }

        let event: WebhookEvent =
            serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        if event.event_type != TRANSACTION_COMPLETED {
            tracing::debug!(event_type = %event.event_type, "Ignoring billing event");
            return Ok(WebhookOutcome::Ignored(event.event_type));
        }

        let Some(external_id) = event
            .data
            .pointer("/custom_data/clerkUserId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        else {
            tracing::warn!("Completed transaction carries no user reference");
            return Ok(WebhookOutcome::Ignored(event.event_type));
        };

        if self.users.set_unlimited(external_id, true).await? {
            tracing::info!(external_id, "User upgraded to unlimited");
            Ok(WebhookOutcome::Upgraded(external_id.to_string()))
        } else {
            tracing::warn!(external_id, "Payment for a user that does not exist yet");
            Ok(WebhookOutcome::UnknownUser(external_id.to_string()))
        }
    }

    pub async fn create_checkout(&self, identity: &Identity) -> crate::Result<String> {
        let checkout = self
            .checkout
            .as_ref()
            .ok_or_else(|| AppError::ConfigError("billing is not configured".into()))?;

        let transaction_id = checkout
            .client
            .create_transaction(&checkout.price_id, &identity.external_id, &checkout.return_url)
            .await?;

        tracing::info!(external_id = %identity.external_id, transaction_id = %transaction_id, "Checkout created");
        Ok(transaction_id)
    }
}
