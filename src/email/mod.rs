//! Outbound notification mail.

mod resend;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::EmailConfig;
use crate::error::AppError;

pub use resend::ResendMailer;

pub const MAX_FEEDBACK_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> crate::Result<()>;
}

/// Used when no mail API key is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> crate::Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "Mail delivery disabled, logging instead");
        Ok(())
    }
}

pub fn mailer_from_config(config: &EmailConfig) -> crate::Result<std::sync::Arc<dyn Mailer>> {
    match config.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => Ok(std::sync::Arc::new(ResendMailer::new(key, &config.base_url)?)),
        None => {
            tracing::warn!("No mail API key configured, feedback will only be logged");
            Ok(std::sync::Arc::new(LogMailer))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub decision_id: String,
    pub rating: u8,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl FeedbackRequest {
    pub fn validate(&self) -> crate::Result<()> {
        if self.decision_id.trim().is_empty() {
            return Err(AppError::ValidationError("decisionId is required".into()));
        }
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::ValidationError("Rating must be between 1 and 5".into()));
        }
        if self
            .feedback
            .as_deref()
            .is_some_and(|f| f.chars().count() > MAX_FEEDBACK_CHARS)
        {
            return Err(AppError::ValidationError(format!(
                "Feedback must be at most {} characters",
                MAX_FEEDBACK_CHARS
            )));
        }
        Ok(())
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn feedback_email(
    config: &EmailConfig,
    request: &FeedbackRequest,
    external_id: &str,
    received_at: DateTime<Utc>,
) -> Email {
    let rating = request.rating;
    let stars = "⭐".repeat(rating as usize);

    let body = match request.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(text) => format!(
            "<p><strong>Feedback:</strong></p>\n<p style=\"background: white; padding: 15px; border-left: 4px solid #8B6FD4;\">{}</p>",
            escape_html(text)
        ),
        None => "<p><em>No additional feedback provided</em></p>".to_string(),
    };

    let html = format!(
        "<div style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto;\">\n\
         <h2 style=\"color: #8B6FD4;\">New Feedback Received</h2>\n\
         <p><strong>Rating:</strong> {stars} ({rating}/5)</p>\n\
         {body}\n\
         <hr>\n\
         <p style=\"font-size: 12px; color: #666;\">\
         <strong>Decision ID:</strong> {decision}<br>\
         <strong>User ID:</strong> {user}<br>\
         <strong>Time:</strong> {time}</p>\n\
         </div>",
        decision = escape_html(&request.decision_id),
        user = escape_html(external_id),
        time = received_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    Email {
        from: config.from.clone(),
        to: config.feedback_to.clone(),
        subject: format!("⭐ New Feedback: {}/5 stars", rating),
        html,
    }
}
