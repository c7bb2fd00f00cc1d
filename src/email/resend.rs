use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use super::{Email, Mailer};
use crate::error::AppError;

pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

#[derive(Serialize)]
struct SendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    pub fn new(api_key: &str, base_url: &str) -> crate::Result<Self> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join("emails"))
            .map_err(|e| AppError::ConfigError(format!("invalid email.base_url: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InternalError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: Email) -> crate::Result<()> {
        let body = SendEmail {
            from: &email.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalError(format!("mail request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::error!(status, "Mail provider rejected message");
            return Err(AppError::ExternalError(format!("mail provider responded with HTTP {}", status)));
        }

        tracing::debug!(to = %email.to, "Mail sent");
        Ok(())
    }
}
