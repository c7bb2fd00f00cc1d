//! Saving and reading decisions on behalf of an authenticated caller.
//!
//! Saving is the one quota checkpoint: check, create, then consume, with
//! the three steps serialised per user so two concurrent saves cannot both
//! pass the same check.

mod locks;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Identity;
use crate::db::{Decision, DecisionStore, DecisionSummary, NewDecision, UserChoice, UserStore};
use crate::error::AppError;
use crate::generation::{DualPathSimulation, FlashcardSet, QuestionAnswer};
use crate::quota::{LimitType, QuotaLedger};

use locks::UserLocks;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDecisionRequest {
    pub decision: String,
    pub answers: Vec<QuestionAnswer>,
    pub simulations: DualPathSimulation,
    pub flashcards: FlashcardSet,
    pub user_choice: UserChoice,
}

impl From<SaveDecisionRequest> for NewDecision {
    fn from(req: SaveDecisionRequest) -> Self {
        NewDecision {
            query: req.decision,
            choice: req.user_choice,
            answers: req.answers,
            simulation: req.simulations,
            flashcards: req.flashcards,
        }
    }
}

pub struct DecisionService {
    users: Arc<dyn UserStore>,
    store: Arc<dyn DecisionStore>,
    ledger: Arc<dyn QuotaLedger>,
    locks: UserLocks,
}

impl DecisionService {
    pub fn new(users: Arc<dyn UserStore>, store: Arc<dyn DecisionStore>, ledger: Arc<dyn QuotaLedger>) -> Self {
        Self {
            users,
            store,
            ledger,
            locks: UserLocks::default(),
        }
    }

    pub async fn save(&self, identity: &Identity, request: SaveDecisionRequest) -> crate::Result<Decision> {
        let new_decision = NewDecision::from(request);
        new_decision.validate()?;

        let user = self
            .users
            .get_or_create(&identity.external_id, identity.email.clone())
            .await?;

        let _guard = self.locks.acquire(user.id).await;

        let check = self.ledger.check_limit(user.id).await?;
        if !check.allowed {
            let limit_type = check.limit_type.unwrap_or(LimitType::Daily);
            tracing::info!(user_id = %user.id, limit_type = limit_type.as_str(), "Decision save refused by quota");
            return Err(AppError::RateLimited {
                message: self.ledger.policy().denial_message(limit_type),
                check,
            });
        }

        let decision = self.store.create(user.id, new_decision).await?;

        // Already committed; a failed consume is logged, not returned.
        if let Err(e) = self.ledger.consume(user.id).await {
            tracing::error!(user_id = %user.id, decision_id = %decision.id, error = %e, "Failed to record quota usage");
        }

        tracing::info!(user_id = %user.id, decision_id = %decision.id, "Decision saved");
        Ok(decision)
    }

    /// Internal id for the caller, if they have ever saved anything.
    pub async fn owner_id(&self, identity: &Identity) -> crate::Result<Option<Uuid>> {
        Ok(self
            .users
            .find_by_external_id(&identity.external_id)
            .await?
            .map(|u| u.id))
    }

    pub async fn list(&self, identity: &Identity) -> crate::Result<Vec<DecisionSummary>> {
        match self.owner_id(identity).await? {
            Some(owner) => self.store.list_summaries(owner).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn get(&self, identity: &Identity, id: Uuid) -> crate::Result<Decision> {
        let owner = self.owner_id(identity).await?.ok_or_else(AppError::not_found)?;
        self.store.get_by_id(owner, id).await
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> crate::Result<()> {
        let owner = self.owner_id(identity).await?.ok_or_else(AppError::not_found)?;
        self.store.delete(owner, id).await?;
        tracing::info!(user_id = %owner, decision_id = %id, "Decision deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockDecisionStore, MockUserStore, User};
    use crate::error::DatabaseError;
    use crate::generation::fallback;
    use crate::quota::{LimitCheck, MockQuotaLedger, QuotaPolicy};
    use chrono::Utc;

    fn identity() -> Identity {
        Identity { external_id: "user_abc".into(), email: None }
    }

    fn request() -> SaveDecisionRequest {
        SaveDecisionRequest {
            decision: "Should I quit my job to start a bakery?".into(),
            answers: vec![QuestionAnswer { question: "Why?".into(), answer: "Bread".into(), order: 1 }],
            simulations: fallback::simulation(),
            flashcards: fallback::flashcards(),
            user_choice: UserChoice::Go,
        }
    }

    fn users_returning(user: User) -> MockUserStore {
        let mut users = MockUserStore::new();
        users.expect_get_or_create().returning(move |_, _| Ok(user.clone()));
        users
    }

    #[tokio::test]
    async fn test_denied_save_creates_nothing() {
        let user = User::new("user_abc".into(), None);
        let mut ledger = MockQuotaLedger::new();
        ledger
            .expect_check_limit()
            .returning(|_| Ok(LimitCheck::denied(LimitType::Daily, 0, 3)));
        ledger.expect_policy().returning(QuotaPolicy::default);
        ledger.expect_consume().never();
        let mut store = MockDecisionStore::new();
        store.expect_create().never();

        let service = DecisionService::new(Arc::new(users_returning(user)), Arc::new(store), Arc::new(ledger));
        let err = service.save(&identity(), request()).await.unwrap_err();

        match err {
            AppError::RateLimited { check, message } => {
                assert_eq!(check.limit_type, Some(LimitType::Daily));
                assert!(message.contains("daily limit of 2"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_consume_quota() {
        let user = User::new("user_abc".into(), None);
        let mut ledger = MockQuotaLedger::new();
        ledger.expect_check_limit().returning(|_| Ok(LimitCheck::unlimited()));
        ledger.expect_consume().never();
        let mut store = MockDecisionStore::new();
        store
            .expect_create()
            .returning(|_, _| Err(AppError::DatabaseError(DatabaseError::ConnectionError("down".into()))));

        let service = DecisionService::new(Arc::new(users_returning(user)), Arc::new(store), Arc::new(ledger));
        let err = service.save(&identity(), request()).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(DatabaseError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_successful_save_consumes_once() {
        let user = User::new("user_abc".into(), None);
        let owner = user.id;
        let mut ledger = MockQuotaLedger::new();
        ledger.expect_check_limit().times(1).returning(|_| Ok(LimitCheck::unlimited()));
        ledger
            .expect_consume()
            .withf(move |id| *id == owner)
            .times(1)
            .returning(|_| Ok(()));
        let mut store = MockDecisionStore::new();
        store
            .expect_create()
            .times(1)
            .returning(|_, new| Ok(Decision::from_new(Uuid::new_v4(), Utc::now(), new)));

        let service = DecisionService::new(Arc::new(users_returning(user)), Arc::new(store), Arc::new(ledger));
        let decision = service.save(&identity(), request()).await.unwrap();
        assert_eq!(decision.query, "Should I quit my job to start a bakery?");
    }

    #[tokio::test]
    async fn test_invalid_request_touches_nothing() {
        let mut users = MockUserStore::new();
        users.expect_get_or_create().never();
        let service = DecisionService::new(
            Arc::new(users),
            Arc::new(MockDecisionStore::new()),
            Arc::new(MockQuotaLedger::new()),
        );

        let mut bad = request();
        bad.decision = "no".into();
        assert!(matches!(service.save(&identity(), bad).await, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_unknown_caller_reads_as_empty() {
        let mut users = MockUserStore::new();
        users.expect_find_by_external_id().returning(|_| Ok(None));
        let service = DecisionService::new(
            Arc::new(users),
            Arc::new(MockDecisionStore::new()),
            Arc::new(MockQuotaLedger::new()),
        );

        assert!(service.list(&identity()).await.unwrap().is_empty());
        assert!(service.get(&identity(), Uuid::new_v4()).await.unwrap_err().is_not_found());
        assert!(service.delete(&identity(), Uuid::new_v4()).await.unwrap_err().is_not_found());
    }
}
