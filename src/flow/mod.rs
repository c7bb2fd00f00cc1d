//! Session wizard client.
//!
//! `state` holds the pure state machine, `controller` drives it against a
//! [`FlowBackend`], which is either the in-process services or the HTTP API.

mod backends;
mod controller;
mod draft;
pub mod loading;
pub mod state;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::decisions::SaveDecisionRequest;
use crate::error::AppError;
use crate::generation::{DualPathSimulation, FlashcardSet, Question, QuestionAnswer};

pub use backends::{HttpBackend, LocalBackend};
pub use controller::FlowController;
pub use draft::{DraftStore, MemoryDraftStore};
pub use state::{Effect, Event, FlowError, Pending, Session, Stage, Ticket};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Please sign in to continue")]
    Unauthenticated,

    #[error("{message}")]
    RateLimited { limit_type: Option<String>, message: String },

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Transport(String),
}

impl From<AppError> for BackendError {
    fn from(err: AppError) -> Self {
        use actix_web::ResponseError;

        match err {
            AppError::AuthError(_) => BackendError::Unauthenticated,
            AppError::RateLimited { check, message } => BackendError::RateLimited {
                limit_type: check.limit_type.map(|l| l.as_str().to_string()),
                message,
            },
            AppError::ValidationError(message) => BackendError::Rejected { status: 400, message },
            AppError::GenerationError(e) => BackendError::Rejected {
                status: 500,
                message: e.to_string(),
            },
            other => BackendError::Rejected {
                status: other.status_code().as_u16(),
                message: other.to_string(),
            },
        }
    }
}

/// What the wizard needs from the outside world.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlowBackend: Send + Sync {
    fn is_authenticated(&self) -> bool;

    async fn questions(&self, decision: &str) -> Result<Vec<Question>, BackendError>;

    async fn simulate(&self, decision: &str, answers: &[QuestionAnswer]) -> Result<DualPathSimulation, BackendError>;

    async fn flashcards(
        &self,
        decision: &str,
        answers: &[QuestionAnswer],
        simulations: &DualPathSimulation,
    ) -> Result<FlashcardSet, BackendError>;

    async fn save(&self, request: SaveDecisionRequest) -> Result<Uuid, BackendError>;
}
