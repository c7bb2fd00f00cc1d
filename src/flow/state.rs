//! The session wizard as a value.
//!
//! [`transition`] is pure: it takes the current [`Session`] and an [`Event`]
//! and yields the next session plus at most one [`Effect`] for the driver to
//! perform. Responses to effects come back as events carrying the
//! [`Ticket`] they were issued with; a ticket that no longer matches the
//! pending one is stale and rejected without touching the session.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::UserChoice;
use crate::generation::{
    validate_decision_text, DualPathSimulation, FlashcardSet, Question, QuestionAnswer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Questions,
    Simulating(Pending),
    Simulation,
    Flashcards,
    Decision,
    Saved,
}

/// Which artifact a `Simulating` stage is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pending {
    Simulation,
    Flashcards,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Questions => "questions",
            Self::Simulating(_) => "simulating",
            Self::Simulation => "simulation",
            Self::Flashcards => "flashcards",
            Self::Decision => "decision",
            Self::Saved => "saved",
        }
    }
}

/// Identifies one outstanding backend call. `epoch` changes on every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Ticket {
    pub epoch: u64,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub stage: Stage,
    pub decision: String,
    pub questions: Vec<Question>,
    pub answers: Vec<QuestionAnswer>,
    pub simulations: Option<DualPathSimulation>,
    pub flashcards: Option<FlashcardSet>,
    pub dismissed_flashcards: usize,
    pub choice: Option<UserChoice>,
    pub error: Option<String>,
    pub saved_decision_id: Option<Uuid>,
    pending: Option<Ticket>,
    epoch: u64,
    next_seq: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::fresh(0)
    }
}

impl Session {
    fn fresh(epoch: u64) -> Self {
        Self {
            stage: Stage::Input,
            decision: String::new(),
            questions: Vec::new(),
            answers: Vec::new(),
            simulations: None,
            flashcards: None,
            dismissed_flashcards: 0,
            choice: None,
            error: None,
            saved_decision_id: None,
            pending: None,
            epoch,
            next_seq: 0,
        }
    }

    pub fn pending(&self) -> Option<Ticket> {
        self.pending
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn all_answered(&self) -> bool {
        !self.questions.is_empty() && self.answers.len() == self.questions.len()
    }

    /// The question the next `Answer` event will fill, if any.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.answers.len())
    }

    fn issue(&mut self) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.pending = Some(ticket);
        ticket
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Start { decision: String, authenticated: bool },
    QuestionsLoaded { ticket: Ticket, questions: Vec<Question> },
    QuestionsFailed { ticket: Ticket, message: String },
    RetryQuestions,
    Answer { text: String },
    SubmitAnswers,
    SimulationLoaded { ticket: Ticket, simulations: DualPathSimulation },
    SimulationFailed { ticket: Ticket, message: String },
    ContinueToFlashcards,
    FlashcardsLoaded { ticket: Ticket, flashcards: FlashcardSet },
    FlashcardsFailed { ticket: Ticket, message: String },
    DismissFlashcard,
    Choose { choice: UserChoice, authenticated: bool },
    Saved { ticket: Ticket, decision_id: Uuid },
    SaveFailed { ticket: Ticket, message: String },
    Reset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::QuestionsLoaded { .. } => "questions_loaded",
            Self::QuestionsFailed { .. } => "questions_failed",
            Self::RetryQuestions => "retry_questions",
            Self::Answer { .. } => "answer",
            Self::SubmitAnswers => "submit_answers",
            Self::SimulationLoaded { .. } => "simulation_loaded",
            Self::SimulationFailed { .. } => "simulation_failed",
            Self::ContinueToFlashcards => "continue_to_flashcards",
            Self::FlashcardsLoaded { .. } => "flashcards_loaded",
            Self::FlashcardsFailed { .. } => "flashcards_failed",
            Self::DismissFlashcard => "dismiss_flashcard",
            Self::Choose { .. } => "choose",
            Self::Saved { .. } => "saved",
            Self::SaveFailed { .. } => "save_failed",
            Self::Reset => "reset",
        }
    }

    fn ticket(&self) -> Option<Ticket> {
        match self {
            Self::QuestionsLoaded { ticket, .. }
            | Self::QuestionsFailed { ticket, .. }
            | Self::SimulationLoaded { ticket, .. }
            | Self::SimulationFailed { ticket, .. }
            | Self::FlashcardsLoaded { ticket, .. }
            | Self::FlashcardsFailed { ticket, .. }
            | Self::Saved { ticket, .. }
            | Self::SaveFailed { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }
}

/// Work the driver performs on behalf of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Keep the text until the user has signed in.
    StashDraft(String),
    FetchQuestions {
        ticket: Ticket,
        decision: String,
    },
    FetchSimulation {
        ticket: Ticket,
        decision: String,
        answers: Vec<QuestionAnswer>,
    },
    FetchFlashcards {
        ticket: Ticket,
        decision: String,
        answers: Vec<QuestionAnswer>,
        simulations: DualPathSimulation,
    },
    Persist {
        ticket: Ticket,
        decision: String,
        answers: Vec<QuestionAnswer>,
        simulations: DualPathSimulation,
        flashcards: FlashcardSet,
        choice: UserChoice,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("'{event}' is not allowed while in '{stage}'")]
    InvalidTransition { stage: &'static str, event: &'static str },

    #[error("Response arrived for a request that is no longer pending")]
    StaleResponse,

    #[error("{0}")]
    Invalid(String),

    #[error("Another request is already in flight")]
    Busy,
}

pub type Transition = (Session, Option<Effect>);

fn invalid(session: &Session, event: &Event) -> FlowError {
    FlowError::InvalidTransition {
        stage: session.stage.as_str(),
        event: event.name(),
    }
}

pub fn transition(session: &Session, event: Event) -> Result<Transition, FlowError> {
    if let Some(ticket) = event.ticket() {
        if session.pending != Some(ticket) {
            return Err(FlowError::StaleResponse);
        }
    }

    let mut next = session.clone();

    match (session.stage, event) {
        (_, Event::Reset) => Ok((Session::fresh(session.epoch + 1), None)),

        (Stage::Input, Event::Start { decision, authenticated }) => {
            validate_decision_text(&decision).map_err(|e| FlowError::Invalid(client_message(&e)))?;
            next.error = None;
            if !authenticated {
                next.decision = decision.clone();
                return Ok((next, Some(Effect::StashDraft(decision))));
            }
            next.decision = decision.clone();
            next.stage = Stage::Questions;
            let ticket = next.issue();
            Ok((next, Some(Effect::FetchQuestions { ticket, decision })))
        }

        (Stage::Questions, Event::QuestionsLoaded { questions, .. }) => {
            next.pending = None;
            next.questions = questions;
            next.answers.clear();
            Ok((next, None))
        }
        (Stage::Questions, Event::QuestionsFailed { message, .. }) => {
            next.pending = None;
            next.error = Some(message);
            Ok((next, None))
        }
        (Stage::Questions, Event::RetryQuestions) if next.questions.is_empty() => {
            if next.pending.is_some() {
                return Err(FlowError::Busy);
            }
            next.error = None;
            let ticket = next.issue();
            let decision = next.decision.clone();
            Ok((next, Some(Effect::FetchQuestions { ticket, decision })))
        }

        (Stage::Questions, Event::Answer { text }) => {
            let Some(question) = next.current_question().map(|q| q.question.clone()) else {
                return Err(FlowError::Invalid("Every question already has an answer".into()));
            };
            let text = text.trim();
            if text.is_empty() {
                return Err(FlowError::Invalid("Answer cannot be empty".into()));
            }
            let order = next.answers.len() as u32 + 1;
            next.answers.push(QuestionAnswer {
                question,
                answer: text.to_string(),
                order,
            });
            Ok((next, None))
        }

        (Stage::Questions, Event::SubmitAnswers) => {
            if !next.all_answered() {
                return Err(FlowError::Invalid("Answer every question before continuing".into()));
            }
            next.error = None;
            next.stage = Stage::Simulating(Pending::Simulation);
            let ticket = next.issue();
            Ok((
                next.clone(),
                Some(Effect::FetchSimulation {
                    ticket,
                    decision: next.decision,
                    answers: next.answers,
                }),
            ))
        }

        (Stage::Simulating(Pending::Simulation), Event::SimulationLoaded { simulations, .. }) => {
            next.pending = None;
            next.simulations = Some(simulations);
            next.stage = Stage::Simulation;
            Ok((next, None))
        }
        (Stage::Simulating(Pending::Simulation), Event::SimulationFailed { message, .. }) => {
            next.pending = None;
            next.error = Some(message);
            next.stage = Stage::Questions;
            Ok((next, None))
        }

        (Stage::Simulation, Event::ContinueToFlashcards) => {
            let Some(simulations) = next.simulations.clone() else {
                return Err(FlowError::Invalid("No simulation to build flashcards from".into()));
            };
            next.error = None;
            next.stage = Stage::Simulating(Pending::Flashcards);
            let ticket = next.issue();
            Ok((
                next.clone(),
                Some(Effect::FetchFlashcards {
                    ticket,
                    decision: next.decision,
                    answers: next.answers,
                    simulations,
                }),
            ))
        }

        (Stage::Simulating(Pending::Flashcards), Event::FlashcardsLoaded { flashcards, .. }) => {
            next.pending = None;
            next.flashcards = Some(flashcards);
            next.dismissed_flashcards = 0;
            next.stage = Stage::Flashcards;
            Ok((next, None))
        }
        (Stage::Simulating(Pending::Flashcards), Event::FlashcardsFailed { message, .. }) => {
            next.pending = None;
            next.error = Some(message);
            next.stage = Stage::Simulation;
            Ok((next, None))
        }

        (Stage::Flashcards, Event::DismissFlashcard) => {
            let total = next.flashcards.as_ref().map_or(0, FlashcardSet::len);
            next.dismissed_flashcards = (next.dismissed_flashcards + 1).min(total);
            if next.dismissed_flashcards >= total {
                next.stage = Stage::Decision;
            }
            Ok((next, None))
        }

        (Stage::Decision, Event::Choose { choice, authenticated }) => {
            if next.pending.is_some() {
                return Err(FlowError::Busy);
            }
            next.choice = Some(choice);
            next.error = None;

            match (authenticated, next.simulations.clone(), next.flashcards.clone()) {
                (true, Some(simulations), Some(flashcards)) => {
                    let ticket = next.issue();
                    let effect = Effect::Persist {
                        ticket,
                        decision: next.decision.clone(),
                        answers: next.answers.clone(),
                        simulations,
                        flashcards,
                        choice,
                    };
                    Ok((next, Some(effect)))
                }
                _ => {
                    next.stage = Stage::Saved;
                    Ok((next, None))
                }
            }
        }
        (Stage::Decision, Event::Saved { decision_id, .. }) => {
            next.pending = None;
            next.saved_decision_id = Some(decision_id);
            next.stage = Stage::Saved;
            Ok((next, None))
        }
        (Stage::Decision, Event::SaveFailed { message, .. }) => {
            next.pending = None;
            next.error = Some(message);
            Ok((next, None))
        }

        (_, event) => Err(invalid(session, &event)),
    }
}

fn client_message(err: &crate::error::AppError) -> String {
    match err {
        crate::error::AppError::ValidationError(message) => message.clone(),
        other => other.to_string(),
    }
}
