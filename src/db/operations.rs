use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::models::{CheckIn, Decision, DecisionSummary, FlashcardRecord, NewDecision, User, DEFAULT_STATUS};
use super::{DecisionStore, UserStore};
use crate::error::{AppError, DatabaseError};
use crate::generation::{Flashcard, PathType, Phase, QuestionAnswer, TimelineSimulation};
use crate::quota::{LimitCheck, QuotaLedger, QuotaPolicy};

const USER_COLUMNS: &str = "id, external_id, email, unlimited, daily_decision_count, monthly_decision_count, \
     last_daily_reset, last_monthly_reset, created_at, updated_at";

/// Postgres-backed implementation of every persistence trait.
pub struct DbOperations {
    pool: Arc<PgPool>,
    policy: QuotaPolicy,
}

#[derive(Debug, Clone)]
pub struct DbPoolStatus {
    pub total_connections: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
}

#[derive(FromRow)]
struct DecisionRow {
    id: Uuid,
    query: String,
    user_choice: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AnswerRow {
    question: String,
    answer: String,
    position: i32,
}

#[derive(FromRow)]
struct SimulationRow {
    path_type: String,
    path_title: String,
    phases: Json<Vec<Phase>>,
}

#[derive(FromRow)]
struct FlashcardRow {
    path_type: String,
    position: i32,
    content: String,
    category: String,
    likelihood: String,
    emoji_before: String,
    emoji_after: String,
}

#[derive(FromRow)]
struct SummaryRow {
    id: Uuid,
    query: String,
    user_choice: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    check_in_id: Option<Uuid>,
    check_in_prompt: Option<String>,
    check_in_response: Option<String>,
    check_in_scheduled_for: Option<DateTime<Utc>>,
    check_in_completed_at: Option<DateTime<Utc>>,
    check_in_created_at: Option<DateTime<Utc>>,
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::DatabaseError(DatabaseError::QueryError(format!("corrupt {} column: {}", what, detail)))
}

fn position(order: usize) -> crate::Result<i32> {
    i32::try_from(order).map_err(|_| AppError::ValidationError("too many items".into()))
}

impl DecisionRow {
    fn user_choice(&self) -> crate::Result<Option<super::UserChoice>> {
        self.user_choice
            .as_deref()
            .map(|c| c.parse().map_err(|e| corrupt("user_choice", e)))
            .transpose()
    }
}

impl FlashcardRow {
    fn into_record(self) -> crate::Result<FlashcardRecord> {
        Ok(FlashcardRecord {
            order: self.position.max(0) as u32,
            card: Flashcard {
                content: self.content,
                path_type: self.path_type.parse().map_err(|e| corrupt("path_type", e))?,
                category: self.category,
                likelihood: self.likelihood.parse().map_err(|e| corrupt("likelihood", e))?,
                emoji_before: self.emoji_before,
                emoji_after: self.emoji_after,
            },
        })
    }
}

impl SummaryRow {
    fn into_summary(self) -> crate::Result<DecisionSummary> {
        let user_choice = self
            .user_choice
            .as_deref()
            .map(|c| c.parse().map_err(|e| corrupt("user_choice", e)))
            .transpose()?;

        let most_recent_check_in = match (self.check_in_id, self.check_in_response, self.check_in_created_at) {
            (Some(id), Some(response), Some(created_at)) => Some(CheckIn {
                id,
                decision_id: self.id,
                prompt: self.check_in_prompt,
                response,
                scheduled_for: self.check_in_scheduled_for,
                completed_at: self.check_in_completed_at,
                created_at,
            }),
            _ => None,
        };

        Ok(DecisionSummary {
            id: self.id,
            query: self.query,
            user_choice,
            status: self.status,
            created_at: self.created_at,
            most_recent_check_in,
        })
    }
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>, policy: QuotaPolicy) -> Self {
        Self { pool, policy }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
        policy: QuotaPolicy,
    ) -> crate::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| AppError::DatabaseError(DatabaseError::ConnectionError(e.to_string())))?;

        Ok(Self::new(Arc::new(pool), policy))
    }

    pub fn pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    pub async fn run_migrations(&self) -> crate::Result<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    pub fn get_pool_status(&self) -> DbPoolStatus {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;

        DbPoolStatus {
            total_connections: size,
            active_connections: size.saturating_sub(idle),
            idle_connections: idle,
        }
    }

    pub async fn begin_transaction(&self) -> crate::Result<Transaction<'_, Postgres>> {
        Ok(self.pool.as_ref().begin().await?)
    }

    async fn create_with_transaction(
        &self,
        owner: Uuid,
        new: &NewDecision,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> crate::Result<(Uuid, DateTime<Utc>)> {
        let id = Uuid::new_v4();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO decisions (id, user_id, query, user_choice, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&new.query)
        .bind(new.choice.as_str())
        .bind(DEFAULT_STATUS)
        .fetch_one(&mut **transaction)
        .await?;

        for answer in &new.answers {
            sqlx::query(
                "INSERT INTO question_answers (id, decision_id, question, answer, position) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&answer.question)
            .bind(&answer.answer)
            .bind(position(answer.order as usize)?)
            .execute(&mut **transaction)
            .await?;
        }

        for timeline in [&new.simulation.path_a, &new.simulation.path_b] {
            sqlx::query(
                "INSERT INTO simulations (id, decision_id, path_type, path_title, phases) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(timeline.path_type.as_str())
            .bind(&timeline.path_title)
            .bind(Json(&timeline.phases))
            .execute(&mut **transaction)
            .await?;
        }

        for path in PathType::BOTH {
            for (i, card) in new.flashcards.side(path).iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO flashcards
                        (id, decision_id, path_type, position, content, category, likelihood, emoji_before, emoji_after)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(id)
                .bind(path.as_str())
                .bind(position(i + 1)?)
                .bind(&card.content)
                .bind(&card.category)
                .bind(card.likelihood.as_str())
                .bind(&card.emoji_before)
                .bind(&card.emoji_after)
                .execute(&mut **transaction)
                .await?;
            }
        }

        Ok((id, created_at))
    }

    async fn load_aggregate(
        &self,
        row: DecisionRow,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> crate::Result<Decision> {
        let answers: Vec<AnswerRow> = sqlx::query_as(
            "SELECT question, answer, position FROM question_answers WHERE decision_id = $1 ORDER BY position ASC",
        )
        .bind(row.id)
        .fetch_all(&mut **transaction)
        .await?;

        let simulations: Vec<SimulationRow> = sqlx::query_as(
            "SELECT path_type, path_title, phases FROM simulations WHERE decision_id = $1 \
             ORDER BY CASE path_type WHEN 'go' THEN 0 ELSE 1 END",
        )
        .bind(row.id)
        .fetch_all(&mut **transaction)
        .await?;

        let flashcards: Vec<FlashcardRow> = sqlx::query_as(
            "SELECT path_type, position, content, category, likelihood, emoji_before, emoji_after \
             FROM flashcards WHERE decision_id = $1 \
             ORDER BY CASE path_type WHEN 'go' THEN 0 ELSE 1 END, position ASC",
        )
        .bind(row.id)
        .fetch_all(&mut **transaction)
        .await?;

        let check_ins: Vec<CheckIn> = sqlx::query_as(
            "SELECT id, decision_id, prompt, response, scheduled_for, completed_at, created_at \
             FROM check_ins WHERE decision_id = $1 ORDER BY created_at DESC",
        )
        .bind(row.id)
        .fetch_all(&mut **transaction)
        .await?;

        let simulations = simulations
            .into_iter()
            .map(|s| {
                Ok(TimelineSimulation {
                    path_type: s.path_type.parse().map_err(|e| corrupt("path_type", e))?,
                    path_title: s.path_title,
                    phases: s.phases.0,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let flashcards = flashcards
            .into_iter()
            .map(FlashcardRow::into_record)
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Decision {
            id: row.id,
            user_choice: row.user_choice()?,
            query: row.query,
            status: row.status,
            created_at: row.created_at,
            question_answers: answers
                .into_iter()
                .map(|a| QuestionAnswer { question: a.question, answer: a.answer, order: a.position.max(0) as u32 })
                .collect(),
            simulations,
            flashcards,
            check_ins,
        })
    }
}

#[async_trait]
impl UserStore for DbOperations {
    async fn find_by_external_id(&self, external_id: &str) -> crate::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE external_id = $1", USER_COLUMNS))
            .bind(external_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn get_or_create(&self, external_id: &str, email: Option<String>) -> crate::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, external_id, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (external_id) DO UPDATE SET email = COALESCE(users.email, EXCLUDED.email)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(external_id)
        .bind(email)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn set_unlimited(&self, external_id: &str, unlimited: bool) -> crate::Result<bool> {
        let result = sqlx::query("UPDATE users SET unlimited = $1, updated_at = NOW() WHERE external_id = $2")
            .bind(unlimited)
            .bind(external_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl QuotaLedger for DbOperations {
    async fn check_limit(&self, user_id: Uuid) -> crate::Result<LimitCheck> {
        let mut transaction = self.begin_transaction().await?;

        let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&mut *transaction)
            .await?;

        let Some(user) = user else {
            transaction.rollback().await?;
            return Ok(LimitCheck::unknown_user());
        };

        let mut usage = user.usage();
        let check = self.policy.evaluate(&mut usage, Utc::now());

        if usage != user.usage() {
            sqlx::query(
                r#"
                UPDATE users
                SET daily_decision_count = $1, monthly_decision_count = $2,
                    last_daily_reset = $3, last_monthly_reset = $4, updated_at = NOW()
                WHERE id = $5
                "#,
            )
            .bind(usage.daily_count as i32)
            .bind(usage.monthly_count as i32)
            .bind(usage.last_daily_reset)
            .bind(usage.last_monthly_reset)
            .bind(user_id)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        Ok(check)
    }

    async fn consume(&self, user_id: Uuid) -> crate::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET daily_decision_count = daily_decision_count + 1,
                monthly_decision_count = monthly_decision_count + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    fn policy(&self) -> QuotaPolicy {
        self.policy
    }
}

#[async_trait]
impl DecisionStore for DbOperations {
    async fn create(&self, owner: Uuid, decision: NewDecision) -> crate::Result<Decision> {
        decision.validate()?;

        let mut transaction = self.begin_transaction().await?;
        let result = self.create_with_transaction(owner, &decision, &mut transaction).await;

        match result {
            Ok((id, created_at)) => {
                transaction.commit().await?;
                Ok(Decision::from_new(id, created_at, decision))
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e)
            }
        }
    }

    async fn get_by_id(&self, owner: Uuid, id: Uuid) -> crate::Result<Decision> {
        let mut transaction = self.begin_transaction().await?;

        let row: Option<DecisionRow> = sqlx::query_as(
            "SELECT id, query, user_choice, status, created_at FROM decisions WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *transaction)
        .await?;

        let row = row.ok_or_else(AppError::not_found)?;
        let decision = self.load_aggregate(row, &mut transaction).await?;
        transaction.commit().await?;
        Ok(decision)
    }

    async fn list_summaries(&self, owner: Uuid) -> crate::Result<Vec<DecisionSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT d.id, d.query, d.user_choice, d.status, d.created_at,
                   c.id AS check_in_id, c.prompt AS check_in_prompt, c.response AS check_in_response,
                   c.scheduled_for AS check_in_scheduled_for, c.completed_at AS check_in_completed_at,
                   c.created_at AS check_in_created_at
            FROM decisions d
            LEFT JOIN LATERAL (
                SELECT id, prompt, response, scheduled_for, completed_at, created_at
                FROM check_ins
                WHERE decision_id = d.id
                ORDER BY created_at DESC
                LIMIT 1
            ) c ON TRUE
            WHERE d.user_id = $1
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(SummaryRow::into_summary).collect()
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> crate::Result<()> {
        let result = sqlx::query("DELETE FROM decisions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found());
        }
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

        let mut transaction = self.begin_transaction().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM decisions WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut *transaction)
                .await?;

        let Some(current) = current else {
            transaction.rollback().await?;
            return Err(AppError::not_found());
        };

        let draft = CheckIn::manual(id, reflection.to_string());
        let result: Result<CheckIn, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO check_ins (id, decision_id, prompt, response, scheduled_for, completed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, decision_id, prompt, response, scheduled_for, completed_at, created_at
            "#,
        )
        .bind(draft.id)
        .bind(draft.decision_id)
        .bind(&draft.prompt)
        .bind(&draft.response)
        .bind(draft.scheduled_for)
        .bind(draft.completed_at)
        .bind(draft.created_at)
        .fetch_one(&mut *transaction)
        .await;

        let check_in = match result {
            Ok(check_in) => check_in,
            Err(e) => {
                transaction.rollback().await?;
                return Err(e.into());
            }
        };

        if let Some(status) = new_status.filter(|s| !s.is_empty() && *s != current) {
            sqlx::query("UPDATE decisions SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(&status)
                .bind(id)
                .execute(&mut *transaction)
                .await?;
            tracing::info!(decision_id = %id, from = %current, to = %status, "Decision status changed");
        }

        transaction.commit().await?;
        Ok(check_in)
    }
}
