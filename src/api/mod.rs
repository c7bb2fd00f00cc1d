//! REST surface.

mod billing;
mod decisions;
mod feedback;
mod generation;

use actix_web::{error, web, HttpRequest};

use crate::error::AppError;

/// Largest JSON body accepted; a full save carries every generated artifact.
pub const JSON_LIMIT: usize = 256 * 1024;

fn json_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), error = %err, "Rejected request body");
    AppError::ValidationError(format!("Invalid request body: {}", err)).into()
}

/// Mount every route. Shared by the binary and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(JSON_LIMIT).error_handler(json_error))
        .route("/health", web::get().to(crate::health_check))
        .service(
            web::scope("/api")
                .route("/questions", web::post().to(generation::questions))
                .route("/simulate-paths", web::post().to(generation::simulate_paths))
                .route("/flashcards", web::post().to(generation::flashcards))
                .route("/save-decision", web::post().to(decisions::save_decision))
                .route("/decisions", web::get().to(decisions::list_decisions))
                .route("/decisions/{id}", web::get().to(decisions::get_decision))
                .route("/decisions/{id}", web::delete().to(decisions::delete_decision))
                .route("/decisions/{id}/check-in", web::post().to(decisions::check_in))
                .route("/feedback", web::post().to(feedback::submit_feedback))
                .route("/checkout", web::post().to(billing::checkout))
                .route("/webhooks/payment", web::post().to(billing::payment_webhook)),
        );
}
