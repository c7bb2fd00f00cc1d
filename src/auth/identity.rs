use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};

use crate::error::{AppError, AuthError};
use crate::AppState;

/// Session cookie set by the identity provider's frontend SDK.
pub const SESSION_COOKIE: &str = "__session";

/// The authenticated caller, identified by the provider's user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub external_id: String,
    pub email: Option<String>,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    from_header.or_else(|| req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()))
}

impl Identity {
    fn extract(req: &HttpRequest) -> Result<Self, AppError> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| AppError::InternalError("application state not registered".into()))?;

        let token = bearer_token(req).ok_or(AuthError::MissingToken)?;
        let identity = state.auth.validate_token(&token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            e
        })?;

        Ok(identity)
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::extract(req))
    }
}
