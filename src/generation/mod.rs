//! Generation gateway.
//!
//! Produces the three artifacts of a session (clarifying questions, the
//! dual-path simulation, regret flashcards) either from a live text generator
//! or, when none is configured, from the canned offline set. A gateway is one
//! or the other for its whole lifetime, so live and offline output are never
//! mixed within a call.

pub mod decode;
pub mod fallback;
pub mod gemini;
pub mod prompts;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::GenerationConfig;
use crate::error::{AppError, GenerationError};

pub use gemini::GeminiClient;
pub use types::{
    DualPathSimulation, Flashcard, FlashcardSet, Likelihood, PathType, Phase, Question, QuestionAnswer,
    QuestionType, TimelineSimulation,
};

pub const MIN_DECISION_CHARS: usize = 5;
pub const MAX_DECISION_CHARS: usize = 500;

/// Raw text completion from an external model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub fn validate_decision_text(decision: &str) -> crate::Result<()> {
    let len = decision.chars().count();
    if !(MIN_DECISION_CHARS..=MAX_DECISION_CHARS).contains(&len) {
        return Err(AppError::ValidationError(format!(
            "Decision must be between {} and {} characters",
            MIN_DECISION_CHARS, MAX_DECISION_CHARS
        )));
    }
    Ok(())
}

pub struct GenerationGateway {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl GenerationGateway {
    pub fn offline() -> Self {
        Self {
            generator: None,
            timeout: Duration::from_secs(crate::config::DEFAULT_GENERATION_TIMEOUT_SECS),
        }
    }

    pub fn live(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            generator: Some(generator),
            timeout,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> crate::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        match config.live_api_key() {
            Some(key) => {
                let client = GeminiClient::new(key, &config.model, &config.base_url, timeout)?;
                tracing::info!(model = %config.model, "Generation gateway running against live model");
                Ok(Self::live(Arc::new(client), timeout))
            }
            None => {
                tracing::warn!("No generation API key configured, serving offline artifacts");
                Ok(Self::offline())
            }
        }
    }

    pub fn is_live(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn questions(&self, decision: &str) -> crate::Result<Vec<Question>> {
        validate_decision_text(decision)?;

        let Some(generator) = &self.generator else {
            return Ok(fallback::questions());
        };

        let raw = self.complete(generator.as_ref(), &prompts::questions_prompt(decision)).await?;
        let questions = decode::decode_questions(&raw).map_err(GenerationError::from)?;
        tracing::debug!(count = questions.len(), "Generated questions");
        Ok(questions)
    }

    pub async fn simulate(&self, decision: &str, answers: &[QuestionAnswer]) -> crate::Result<DualPathSimulation> {
        validate_decision_text(decision)?;

        let Some(generator) = &self.generator else {
            return Ok(fallback::simulation());
        };

        let raw = self
            .complete(generator.as_ref(), &prompts::simulation_prompt(decision, answers))
            .await?;
        Ok(decode::decode_simulation(&raw).map_err(GenerationError::from)?)
    }

    pub async fn flashcards(
        &self,
        decision: &str,
        answers: &[QuestionAnswer],
        simulation: &DualPathSimulation,
    ) -> crate::Result<FlashcardSet> {
        validate_decision_text(decision)?;

        let Some(generator) = &self.generator else {
            return Ok(fallback::flashcards());
        };

        let raw = self
            .complete(generator.as_ref(), &prompts::flashcards_prompt(decision, answers, simulation))
            .await?;
        let set = decode::decode_flashcards(&raw).map_err(GenerationError::from)?;
        tracing::debug!(go = set.go_flashcards.len(), stay = set.stay_flashcards.len(), "Generated flashcards");
        Ok(set)
    }

    async fn complete(&self, generator: &dyn TextGenerator, prompt: &str) -> Result<String, GenerationError> {
        let text = tokio::time::timeout(self.timeout, generator.generate(prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout.as_secs()))??;

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::function;

    fn gateway_with(mock: MockTextGenerator) -> GenerationGateway {
        GenerationGateway::live(Arc::new(mock), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_offline_questions() {
        let gateway = GenerationGateway::offline();
        let questions = gateway.questions("Should I quit my job to start a bakery?").await.unwrap();
        assert_eq!(questions.len(), 4);
        assert!(!gateway.is_live());
    }

    #[tokio::test]
    async fn test_decision_length_is_validated_before_generation() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().never();
        let gateway = gateway_with(mock);

        let err = gateway.questions("hey").await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let long = "x".repeat(MAX_DECISION_CHARS + 1);
        assert!(gateway.questions(&long).await.is_err());
    }

    #[tokio::test]
    async fn test_live_questions_are_decoded() {
        let payload = serde_json::to_string(&fallback::questions()).unwrap();
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .with(function(|p: &str| p.contains("Decision being contemplated: \"Should I move abroad?\"")))
            .times(1)
            .returning(move |_| Ok(format!("```json\n{}\n```", payload)));

        let questions = gateway_with(mock).questions("Should I move abroad?").await.unwrap();
        assert_eq!(questions, fallback::questions());
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(|_| Ok("   ".to_string()));

        let err = gateway_with(mock).questions("Should I move abroad?").await.unwrap_err();
        assert!(matches!(err, AppError::GenerationError(GenerationError::EmptyResponse)));
        assert_eq!(err.to_string(), "Generation error: No content from AI");
    }

    #[tokio::test]
    async fn test_ill_shaped_simulation_is_rejected() {
        let mut sim = fallback::simulation();
        sim.path_a.phases.truncate(1);
        let payload = serde_json::to_string(&sim).unwrap();
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(move |_| Ok(payload.clone()));

        let err = gateway_with(mock).simulate("Should I move abroad?", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::GenerationError(GenerationError::Decode(crate::error::DecodeError::InvalidShape { .. }))
        ));
    }

    #[tokio::test]
    async fn test_generator_failure_is_surfaced() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|_| Err(GenerationError::Unavailable("connection refused".into())));

        let err = gateway_with(mock)
            .flashcards("Should I move abroad?", &[], &fallback::simulation())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationError(GenerationError::Unavailable(_))));
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_generator_times_out() {
        let gateway = GenerationGateway::live(Arc::new(SlowGenerator), Duration::from_secs(15));
        let err = gateway.questions("Should I move abroad?").await.unwrap_err();
        assert!(matches!(err, AppError::GenerationError(GenerationError::Timeout(15))));
    }
}
