use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::auth::Identity;
use crate::email::{feedback_email, FeedbackRequest};
use crate::{AppState, Result};

pub async fn submit_feedback(
    state: web::Data<AppState>,
    identity: Identity,
    req: web::Json<FeedbackRequest>,
) -> Result<HttpResponse> {
    req.validate()?;

    let email = feedback_email(&state.config.email, &req, &identity.external_id, chrono::Utc::now());
    state.mailer.send(email).await?;

    tracing::info!(rating = req.rating, external_id = %identity.external_id, "Feedback sent");
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
