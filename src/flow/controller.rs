use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::loading;
use super::state::{self, Effect, Event, FlowError, Session};
use super::{BackendError, DraftStore, FlowBackend};
use crate::db::UserChoice;
use crate::decisions::SaveDecisionRequest;

/// Drives a [`Session`] against a backend.
///
/// The session lock is never held across a backend call, so `reset` is
/// always responsive; whatever the abandoned call returns is dropped by the
/// ticket check in [`state::transition`].
pub struct FlowController {
    backend: Arc<dyn FlowBackend>,
    drafts: Arc<dyn DraftStore>,
    session: Mutex<Session>,
    timeout: Duration,
}

impl FlowController {
    pub fn new(backend: Arc<dyn FlowBackend>, drafts: Arc<dyn DraftStore>, timeout: Duration) -> Self {
        Self {
            backend,
            drafts,
            session: Mutex::new(Session::default()),
            timeout,
        }
    }

    pub async fn snapshot(&self) -> Session {
        self.session.lock().await.clone()
    }

    pub async fn loading_message(&self, elapsed: Duration) -> Option<&'static str> {
        loading::message_at(self.session.lock().await.stage, elapsed)
    }

    /// Stays in `Input` with the text stashed when the backend has no identity.
    pub async fn start(&self, decision: &str) -> Result<Session, FlowError> {
        self.dispatch(Event::Start {
            decision: decision.to_string(),
            authenticated: self.backend.is_authenticated(),
        })
        .await
    }

    /// Picks a stashed draft back up once the user is signed in.
    pub async fn resume_after_auth(&self) -> Result<Option<Session>, FlowError> {
        if !self.backend.is_authenticated() {
            return Ok(None);
        }
        let Some(draft) = self.drafts.load() else {
            return Ok(None);
        };
        tracing::debug!("Resuming stashed draft");
        let session = self.start(&draft).await?;
        self.drafts.clear();
        Ok(Some(session))
    }

    pub async fn retry_questions(&self) -> Result<Session, FlowError> {
        self.dispatch(Event::RetryQuestions).await
    }

    pub async fn answer(&self, text: &str) -> Result<Session, FlowError> {
        self.dispatch(Event::Answer { text: text.to_string() }).await
    }

    pub async fn submit_answers(&self) -> Result<Session, FlowError> {
        self.dispatch(Event::SubmitAnswers).await
    }

    pub async fn continue_to_flashcards(&self) -> Result<Session, FlowError> {
        self.dispatch(Event::ContinueToFlashcards).await
    }

    pub async fn dismiss_flashcard(&self) -> Result<Session, FlowError> {
        self.dispatch(Event::DismissFlashcard).await
    }

    pub async fn choose(&self, choice: UserChoice) -> Result<Session, FlowError> {
        self.dispatch(Event::Choose {
            choice,
            authenticated: self.backend.is_authenticated(),
        })
        .await
    }

    pub async fn reset(&self) -> Session {
        let mut session = self.session.lock().await;
        if let Ok((next, _)) = state::transition(&session, Event::Reset) {
            *session = next;
        }
        session.clone()
    }

    async fn dispatch(&self, event: Event) -> Result<Session, FlowError> {
        let name = event.name();
        let effect = {
            let mut session = self.session.lock().await;
            let (next, effect) = state::transition(&session, event)?;
            tracing::debug!(event = name, from = session.stage.as_str(), to = next.stage.as_str(), "Flow transition");
            *session = next;
            effect
        };

        match effect {
            Some(effect) => self.perform(effect).await,
            None => Ok(self.snapshot().await),
        }
    }

    async fn perform(&self, effect: Effect) -> Result<Session, FlowError> {
        let response = match effect {
            Effect::StashDraft(text) => {
                self.drafts.save(&text);
                return Ok(self.snapshot().await);
            }
            Effect::FetchQuestions { ticket, decision } => match self.bounded(self.backend.questions(&decision)).await {
                Ok(questions) => Event::QuestionsLoaded { ticket, questions },
                Err(e) => Event::QuestionsFailed {
                    ticket,
                    message: e.to_string(),
                },
            },
            Effect::FetchSimulation {
                ticket,
                decision,
                answers,
            } => match self.bounded(self.backend.simulate(&decision, &answers)).await {
                Ok(simulations) => Event::SimulationLoaded { ticket, simulations },
                Err(e) => Event::SimulationFailed {
                    ticket,
                    message: e.to_string(),
                },
            },
            Effect::FetchFlashcards {
                ticket,
                decision,
                answers,
                simulations,
            } => match self
                .bounded(self.backend.flashcards(&decision, &answers, &simulations))
                .await
            {
                Ok(flashcards) => Event::FlashcardsLoaded { ticket, flashcards },
                Err(e) => Event::FlashcardsFailed {
                    ticket,
                    message: e.to_string(),
                },
            },
            Effect::Persist {
                ticket,
                decision,
                answers,
                simulations,
                flashcards,
                choice,
            } => {
                let request = SaveDecisionRequest {
                    decision,
                    answers,
                    simulations,
                    flashcards,
                    user_choice: choice,
                };
                match self.bounded(self.backend.save(request)).await {
                    Ok(decision_id) => Event::Saved { ticket, decision_id },
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not save decision");
                        Event::SaveFailed {
                            ticket,
                            message: e.to_string(),
                        }
                    }
                }
            }
        };

        self.apply_response(response).await
    }

    async fn apply_response(&self, event: Event) -> Result<Session, FlowError> {
        let mut session = self.session.lock().await;
        match state::transition(&session, event) {
            Ok((next, _)) => {
                *session = next;
                Ok(session.clone())
            }
            Err(FlowError::StaleResponse) => {
                tracing::debug!("Dropping response for an abandoned request");
                Ok(session.clone())
            }
            Err(e) => Err(e),
        }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T, BackendError>>) -> Result<T, BackendError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| BackendError::Timeout(self.timeout.as_secs()))?
    }
}
