use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::auth::Identity;
use crate::billing::signature::SIGNATURE_HEADER;
use crate::{AppState, Result};

pub async fn checkout(state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse> {
    let transaction_id = state.billing.create_checkout(&identity).await?;
    Ok(HttpResponse::Ok().json(json!({ "transactionId": transaction_id })))
}

/// Takes the body as raw bytes: the signature covers them exactly as sent.
pub async fn payment_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state.billing.handle_webhook(signature, &body).await?;
    tracing::debug!(?outcome, "Webhook processed");
    Ok(HttpResponse::Ok().json(json!({ "received": true })))
}
