//! Persistence for users and decision aggregates.
//!
//! Two backends implement the same traits: [`DbOperations`] over Postgres and
//! [`MemoryStore`] for offline runs and tests. Every decision operation takes
//! the owner id first; a decision owned by someone else is reported as
//! missing.

pub mod memory;
pub mod models;
pub mod operations;

use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use models::{CheckIn, Decision, DecisionSummary, FlashcardRecord, NewDecision, User, UserChoice};
pub use operations::DbOperations;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_external_id(&self, external_id: &str) -> crate::Result<Option<User>>;

    /// Return the user for `external_id`, creating it on first sight.
    async fn get_or_create(&self, external_id: &str, email: Option<String>) -> crate::Result<User>;

    /// Returns false if no user has that external id.
    async fn set_unlimited(&self, external_id: &str, unlimited: bool) -> crate::Result<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Persist the decision and all its children atomically.
    async fn create(&self, owner: Uuid, decision: NewDecision) -> crate::Result<Decision>;

    async fn get_by_id(&self, owner: Uuid, id: Uuid) -> crate::Result<Decision>;

    /// Newest first, each with at most its latest check-in.
    async fn list_summaries(&self, owner: Uuid) -> crate::Result<Vec<DecisionSummary>>;

    async fn delete(&self, owner: Uuid, id: Uuid) -> crate::Result<()>;

    /// Record a check-in and, when `new_status` differs, move the decision to it.
    async fn append_check_in(
        &self,
        owner: Uuid,
        id: Uuid,
        reflection: &str,
        new_status: Option<String>,
    ) -> crate::Result<CheckIn>;
}
