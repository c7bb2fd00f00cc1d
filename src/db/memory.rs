use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{CheckIn, Decision, DecisionSummary, NewDecision, User};
use super::{DecisionStore, UserStore};
use crate::error::AppError;
use crate::quota::{LimitCheck, QuotaLedger, QuotaPolicy};

struct StoredDecision {
    owner: Uuid,
    // Tiebreak for decisions created within the same clock tick.
    seq: u64,
    decision: Decision,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    by_external_id: HashMap<String, Uuid>,
    decisions: HashMap<Uuid, StoredDecision>,
    next_seq: u64,
}

impl Inner {
    fn owned_mut(&mut self, owner: Uuid, id: Uuid) -> crate::Result<&mut StoredDecision> {
        self.decisions
            .get_mut(&id)
            .filter(|d| d.owner == owner)
            .ok_or_else(AppError::not_found)
    }
}

/// Process-local store implementing every persistence trait.
pub struct MemoryStore {
    inner: RwLock<Inner>,
    policy: QuotaPolicy,
}

impl MemoryStore {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            policy,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(QuotaPolicy::default())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_external_id(&self, external_id: &str) -> crate::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_external_id
            .get(external_id)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn get_or_create(&self, external_id: &str, email: Option<String>) -> crate::Result<User> {
        let mut inner = self.inner.write().await;

        if let Some(id) = inner.by_external_id.get(external_id).copied() {
            if let Some(user) = inner.users.get_mut(&id) {
                if user.email.is_none() && email.is_some() {
                    user.email = email;
                    user.updated_at = Utc::now();
                }
                return Ok(user.clone());
            }
        }

        let user = User::new(external_id.to_string(), email);
        tracing::info!(user_id = %user.id, external_id, "Created user");
        inner.by_external_id.insert(external_id.to_string(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_unlimited(&self, external_id: &str, unlimited: bool) -> crate::Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(id) = inner.by_external_id.get(external_id).copied() else {
            return Ok(false);
        };
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.unlimited = unlimited;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl QuotaLedger for MemoryStore {
    async fn check_limit(&self, user_id: Uuid) -> crate::Result<LimitCheck> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&user_id) else {
            return Ok(LimitCheck::unknown_user());
        };

        let mut usage = user.usage();
        let check = self.policy.evaluate(&mut usage, Utc::now());
        if usage != user.usage() {
            user.apply_usage(&usage);
        }
        Ok(check)
    }

    async fn consume(&self, user_id: Uuid) -> crate::Result<()> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(&user_id).ok_or_else(AppError::not_found)?;

        let mut usage = user.usage();
        QuotaPolicy::consume(&mut usage);
        user.apply_usage(&usage);
        Ok(())
    }

    fn policy(&self) -> QuotaPolicy {
        self.policy
    }
}

#[async_trait]
impl DecisionStore for MemoryStore {
    async fn create(&self, owner: Uuid, decision: NewDecision) -> crate::Result<Decision> {
        decision.validate()?;

        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&owner) {
            return Err(AppError::not_found());
        }

        let decision = Decision::from_new(Uuid::new_v4(), Utc::now(), decision);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.decisions.insert(
            decision.id,
            StoredDecision {
                owner,
                seq,
                decision: decision.clone(),
            },
        );
        Ok(decision)
    }

    async fn get_by_id(&self, owner: Uuid, id: Uuid) -> crate::Result<Decision> {
        let inner = self.inner.read().await;
        inner
            .decisions
            .get(&id)
            .filter(|d| d.owner == owner)
            .map(|d| d.decision.clone())
            .ok_or_else(AppError::not_found)
    }

    async fn list_summaries(&self, owner: Uuid) -> crate::Result<Vec<DecisionSummary>> {
        let inner = self.inner.read().await;
        let mut owned: Vec<&StoredDecision> = inner.decisions.values().filter(|d| d.owner == owner).collect();
        owned.sort_by_key(|d| Reverse((d.decision.created_at, d.seq)));
        Ok(owned.into_iter().map(|d| d.decision.summary()).collect())
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> crate::Result<()> {
        let mut inner = self.inner.write().await;
        inner.owned_mut(owner, id)?;
        inner.decisions.remove(&id);
        Ok(())
    }

    async fn append_check_in(
        &self,
        owner: Uuid,
        id: Uuid,
        reflection: &str,
        new_status: Option<String>,
    ) -> crate::Result<CheckIn> {
        if reflection.trim().is_empty() {
            return Err(AppError::ValidationError("Reflection cannot be empty".into()));
        }

        let mut inner = self.inner.write().await;
        let stored = inner.owned_mut(owner, id)?;

        let check_in = CheckIn::manual(id, reflection.to_string());
        stored.decision.check_ins.insert(0, check_in.clone());

        if let Some(status) = new_status.filter(|s| !s.is_empty()) {
            if status != stored.decision.status {
                tracing::info!(decision_id = %id, from = %stored.decision.status, to = %status, "Decision status changed");
                stored.decision.status = status;
            }
        }

        Ok(check_in)
    }
}
