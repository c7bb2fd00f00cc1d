pub mod api;
pub mod auth;
pub mod billing;
pub mod checkin;
pub mod config;
pub mod db;
pub mod decisions;
pub mod email;
pub mod error;
pub mod flow;
pub mod generation;
pub mod quota;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpResponse};
use sqlx::PgPool;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, Identity};
pub use db::{DbOperations, MemoryStore};

use billing::BillingService;
use checkin::CheckInService;
use config::StorageBackend;
use db::{DecisionStore, UserStore};
use decisions::DecisionService;
use email::Mailer;
use generation::GenerationGateway;
use quota::{QuotaLedger, QuotaPolicy};

/// Health check endpoint handler
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "generation": if state.gateway.is_live() { "live" } else { "offline" },
        "storage": state.config.storage.backend.as_str(),
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth: Arc<AuthService>,
    pub gateway: Arc<GenerationGateway>,
    pub users: Arc<dyn UserStore>,
    pub decisions: Arc<DecisionService>,
    pub check_ins: Arc<CheckInService>,
    pub billing: Arc<BillingService>,
    pub mailer: Arc<dyn Mailer>,
    pub db_pool: Option<Arc<PgPool>>,
}

impl AppState {
    pub async fn new(config: Settings) -> Result<Self> {
        let policy = QuotaPolicy::new(config.quota.daily_limit, config.quota.monthly_limit);

        match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; nothing survives a restart");
                Self::in_memory(config)
            }
            StorageBackend::Postgres => {
                let db = DbOperations::new_with_options(
                    &config.database.url,
                    config.database.max_connections,
                    Duration::from_secs(config.database.acquire_timeout_secs),
                    policy,
                )
                .await?;
                db.run_migrations().await?;
                tracing::info!("Database migrations applied");

                let pool = db.pool();
                let db = Arc::new(db);
                let mut state = Self::assemble(config, db.clone(), db.clone(), db)?;
                state.db_pool = Some(pool);
                Ok(state)
            }
        }
    }

    /// State backed by [`MemoryStore`], regardless of `storage.backend`.
    pub fn in_memory(config: Settings) -> Result<Self> {
        let policy = QuotaPolicy::new(config.quota.daily_limit, config.quota.monthly_limit);
        let store = Arc::new(MemoryStore::new(policy));
        Self::assemble(config, store.clone(), store.clone(), store)
    }

    fn assemble(
        config: Settings,
        users: Arc<dyn UserStore>,
        store: Arc<dyn DecisionStore>,
        ledger: Arc<dyn QuotaLedger>,
    ) -> Result<Self> {
        let auth = AuthService::from_config(&config.auth)?;
        let gateway = GenerationGateway::from_config(&config.generation)?;
        let billing = BillingService::new(users.clone(), &config.billing)?;
        let mailer = email::mailer_from_config(&config.email)?;

        Ok(Self {
            auth: Arc::new(auth),
            gateway: Arc::new(gateway),
            decisions: Arc::new(DecisionService::new(users.clone(), store.clone(), ledger)),
            check_ins: Arc::new(CheckInService::new(users.clone(), store)),
            billing: Arc::new(billing),
            users,
            mailer,
            db_pool: None,
            config: Arc::new(config),
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
        Ok(())
    }
}
