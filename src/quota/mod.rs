//! Per-user decision quota.
//!
//! Checking a limit and consuming it are separate calls: a caller checks
//! before doing work and consumes only after the decision was persisted.

mod policy;

use async_trait::async_trait;
use uuid::Uuid;

pub use policy::{LimitCheck, LimitType, QuotaPolicy, Usage, DEFAULT_DAILY_LIMIT, DEFAULT_MONTHLY_LIMIT};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Roll expired windows for `user_id`, then report whether a new decision is allowed.
    async fn check_limit(&self, user_id: Uuid) -> crate::Result<LimitCheck>;

    /// Increment both counters by one.
    async fn consume(&self, user_id: Uuid) -> crate::Result<()>;

    fn policy(&self) -> QuotaPolicy;
}
