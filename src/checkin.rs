use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Identity;
use crate::db::{CheckIn, DecisionStore, UserStore};
use crate::error::AppError;

pub const MAX_REFLECTION_CHARS: usize = 5000;
pub const MAX_STATUS_CHARS: usize = 32;

/// Appends reflections to decisions the caller already owns.
pub struct CheckInService {
    users: Arc<dyn UserStore>,
    store: Arc<dyn DecisionStore>,
}

impl CheckInService {
    pub fn new(users: Arc<dyn UserStore>, store: Arc<dyn DecisionStore>) -> Self {
        Self { users, store }
    }

    pub async fn submit_check_in(
        &self,
        identity: &Identity,
        decision_id: Uuid,
        reflection: &str,
        status: Option<&str>,
    ) -> crate::Result<CheckIn> {
        let reflection = reflection.trim();
        if reflection.is_empty() {
            return Err(AppError::ValidationError("Reflection cannot be empty".into()));
        }
        if reflection.chars().count() > MAX_REFLECTION_CHARS {
            return Err(AppError::ValidationError(format!(
                "Reflection must be at most {} characters",
                MAX_REFLECTION_CHARS
            )));
        }

        let status = status.map(str::trim).filter(|s| !s.is_empty());
        if status.is_some_and(|s| s.chars().count() > MAX_STATUS_CHARS) {
            return Err(AppError::ValidationError(format!(
                "Status must be at most {} characters",
                MAX_STATUS_CHARS
            )));
        }

        let owner = self
            .users
            .find_by_external_id(&identity.external_id)
            .await?
            .ok_or_else(AppError::not_found)?;

        let check_in = self
            .store
            .append_check_in(owner.id, decision_id, reflection, status.map(str::to_string))
            .await?;

        tracing::info!(decision_id = %decision_id, check_in_id = %check_in.id, "Check-in recorded");
        Ok(check_in)
    }
}
