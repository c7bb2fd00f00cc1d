use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::{BackendError, FlowBackend};
use crate::auth::Identity;
use crate::decisions::{DecisionService, SaveDecisionRequest};
use crate::error::AppError;
use crate::generation::{DualPathSimulation, FlashcardSet, GenerationGateway, Question, QuestionAnswer};

/// Calls the services directly, for embedding the flow in-process.
pub struct LocalBackend {
    gateway: Arc<GenerationGateway>,
    decisions: Arc<DecisionService>,
    identity: Option<Identity>,
}

impl LocalBackend {
    pub fn new(gateway: Arc<GenerationGateway>, decisions: Arc<DecisionService>, identity: Option<Identity>) -> Self {
        Self {
            gateway,
            decisions,
            identity,
        }
    }
}

#[async_trait]
impl FlowBackend for LocalBackend {
    fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    async fn questions(&self, decision: &str) -> Result<Vec<Question>, BackendError> {
        Ok(self.gateway.questions(decision).await?)
    }

    async fn simulate(&self, decision: &str, answers: &[QuestionAnswer]) -> Result<DualPathSimulation, BackendError> {
        Ok(self.gateway.simulate(decision, answers).await?)
    }

    async fn flashcards(
        &self,
        decision: &str,
        answers: &[QuestionAnswer],
        simulations: &DualPathSimulation,
    ) -> Result<FlashcardSet, BackendError> {
        Ok(self.gateway.flashcards(decision, answers, simulations).await?)
    }

    async fn save(&self, request: SaveDecisionRequest) -> Result<Uuid, BackendError> {
        let identity = self.identity.as_ref().ok_or(BackendError::Unauthenticated)?;
        let decision = self.decisions.save(identity, request).await?;
        Ok(decision.id)
    }
}

/// Talks to a running server's REST surface.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Deserialize)]
struct QuestionsResponse {
    questions: Vec<Question>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveResponse {
    decision_id: Uuid,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
    limit_type: Option<String>,
}

#[derive(Serialize)]
struct DecisionBody<'a> {
    decision: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    answers: Option<&'a [QuestionAnswer]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulations: Option<&'a DualPathSimulation>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> crate::Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| AppError::ConfigError(format!("invalid server url: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, BackendError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Transport("the server took too long to respond".into())
            } else {
                BackendError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| BackendError::Transport(format!("unreadable response: {}", e)));
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => BackendError::Unauthenticated,
            StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited {
                limit_type: body.limit_type,
                message: body
                    .message
                    .or(body.error)
                    .unwrap_or_else(|| "Rate limit exceeded".into()),
            },
            other => BackendError::Rejected {
                status: other.as_u16(),
                message: body.error.unwrap_or_else(|| format!("Request failed with HTTP {}", other.as_u16())),
            },
        })
    }
}

#[async_trait]
impl FlowBackend for HttpBackend {
    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn questions(&self, decision: &str) -> Result<Vec<Question>, BackendError> {
        let body = DecisionBody {
            decision,
            answers: None,
            simulations: None,
        };
        let response: QuestionsResponse = self.post("api/questions", &body).await?;
        Ok(response.questions)
    }

    async fn simulate(&self, decision: &str, answers: &[QuestionAnswer]) -> Result<DualPathSimulation, BackendError> {
        let body = DecisionBody {
            decision,
            answers: Some(answers),
            simulations: None,
        };
        self.post("api/simulate-paths", &body).await
    }

    async fn flashcards(
        &self,
        decision: &str,
        answers: &[QuestionAnswer],
        simulations: &DualPathSimulation,
    ) -> Result<FlashcardSet, BackendError> {
        let body = DecisionBody {
            decision,
            answers: Some(answers),
            simulations: Some(simulations),
        };
        self.post("api/flashcards", &body).await
    }

    async fn save(&self, request: SaveDecisionRequest) -> Result<Uuid, BackendError> {
        if self.token.is_none() {
            return Err(BackendError::Unauthenticated);
        }
        let response: SaveResponse = self.post("api/save-decision", &request).await?;
        Ok(response.decision_id)
    }
}
