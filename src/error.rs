use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

use crate::quota::LimitCheck;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Generation error: {0}")]
    GenerationError(#[from] GenerationError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Webhook error: {0}")]
    WebhookError(#[from] WebhookError),

    #[error("Rate limit exceeded: {message}")]
    RateLimited { check: LimitCheck, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl AppError {
    pub fn not_found() -> Self {
        AppError::DatabaseError(DatabaseError::NotFound)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::DatabaseError(DatabaseError::NotFound))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::DatabaseError(DatabaseError::NotFound),
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
                AppError::DatabaseError(DatabaseError::Duplicate)
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::DatabaseError(DatabaseError::ConnectionError(err.to_string()))
            }
            _ => AppError::DatabaseError(DatabaseError::QueryError(err.to_string())),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(DatabaseError::QueryError(err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let body = match self {
            AppError::RateLimited { check, message } => json!({
                "error": "rate_limit_exceeded",
                "limitType": check.limit_type,
                "message": message,
                "remainingDaily": check.remaining_daily,
                "remainingMonthly": check.remaining_monthly,
            }),
            AppError::ValidationError(message) => json!({ "error": message }),
            AppError::AuthError(_) => json!({ "error": "Unauthorized" }),
            AppError::DatabaseError(DatabaseError::NotFound) => json!({ "error": "Decision not found" }),
            AppError::GenerationError(e) => {
                tracing::error!(error = %e, "Generation failed");
                json!({ "error": e.to_string() })
            }
            AppError::WebhookError(e) => json!({ "error": format!("Webhook Error: {}", e) }),
            AppError::DatabaseError(e) => {
                tracing::error!(error = %e, "Storage failure");
                json!({ "error": "Could not save or load your data. Please try again." })
            }
            AppError::ConfigError(e) => {
                tracing::error!(error = %e, "Feature not configured");
                json!({ "error": "This feature is not available right now" })
            }
            AppError::ExternalError(e) | AppError::InternalError(e) => {
                tracing::error!(error = %e, "Request failed");
                json!({ "error": "Internal Server Error" })
            }
        };

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::WebhookError(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::DatabaseError(DatabaseError::NotFound) => StatusCode::NOT_FOUND,
            AppError::ConfigError(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Text generator unavailable: {0}")]
    Unavailable(String),

    #[error("Text generator timed out after {0}s")]
    Timeout(u64),

    #[error("No content from AI")]
    EmptyResponse,

    #[error("{0}")]
    Decode(#[from] DecodeError),
}

/// Failure to turn raw generator text into a typed artifact.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Generator returned malformed JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid {artifact} format: {reason}")]
    InvalidShape { artifact: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WebhookError {
    #[error("signing secret is not configured")]
    MissingSecret,

    #[error("missing signature header")]
    MissingSignature,

    #[error("malformed signature header")]
    MalformedSignature,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
