use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;
use crate::generation::decode::MIN_PHASES;
use crate::generation::{
    validate_decision_text, DualPathSimulation, Flashcard, FlashcardSet, PathType, QuestionAnswer, TimelineSimulation,
};
use crate::quota::Usage;

pub const DEFAULT_STATUS: &str = "active";
pub const MANUAL_CHECK_IN_PROMPT: &str = "Manual Check-in";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserChoice {
    Go,
    Stay,
    Undecided,
}

impl UserChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserChoice::Go => "go",
            UserChoice::Stay => "stay",
            UserChoice::Undecided => "undecided",
        }
    }
}

impl fmt::Display for UserChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "go" => Ok(UserChoice::Go),
            "stay" => Ok(UserChoice::Stay),
            "undecided" => Ok(UserChoice::Undecided),
            other => Err(format!("unknown choice: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: Option<String>,
    pub unlimited: bool,
    pub daily_decision_count: i32,
    pub monthly_decision_count: i32,
    pub last_daily_reset: DateTime<Utc>,
    pub last_monthly_reset: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(external_id: String, email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id,
            email,
            unlimited: false,
            daily_decision_count: 0,
            monthly_decision_count: 0,
            last_daily_reset: now,
            last_monthly_reset: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn usage(&self) -> Usage {
        Usage {
            unlimited: self.unlimited,
            daily_count: self.daily_decision_count.max(0) as u32,
            monthly_count: self.monthly_decision_count.max(0) as u32,
            last_daily_reset: self.last_daily_reset,
            last_monthly_reset: self.last_monthly_reset,
        }
    }

    pub fn apply_usage(&mut self, usage: &Usage) {
        self.daily_decision_count = i32::try_from(usage.daily_count).unwrap_or(i32::MAX);
        self.monthly_decision_count = i32::try_from(usage.monthly_count).unwrap_or(i32::MAX);
        self.last_daily_reset = usage.last_daily_reset;
        self.last_monthly_reset = usage.last_monthly_reset;
        self.updated_at = Utc::now();
    }
}

/// Everything needed to persist a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDecision {
    pub query: String,
    pub choice: UserChoice,
    pub answers: Vec<QuestionAnswer>,
    pub simulation: DualPathSimulation,
    pub flashcards: FlashcardSet,
}

impl NewDecision {
    pub fn validate(&self) -> crate::Result<()> {
        validate_decision_text(&self.query)?;

        for (i, answer) in self.answers.iter().enumerate() {
            if answer.order as usize != i + 1 {
                return Err(AppError::ValidationError(
                    "Answers must be ordered 1..N in the order they were given".into(),
                ));
            }
        }

        for path in PathType::BOTH {
            let timeline = self.simulation.path(path);
            if timeline.path_type != path {
                return Err(AppError::ValidationError(format!("Expected a {} simulation path", path)));
            }
            if timeline.phases.len() < MIN_PHASES {
                return Err(AppError::ValidationError(format!(
                    "The {} path needs at least {} phases",
                    path, MIN_PHASES
                )));
            }

            let side = self.flashcards.side(path);
            if side.is_empty() {
                return Err(AppError::ValidationError(format!("At least one {} flashcard is required", path)));
            }
            if side.iter().any(|c| c.path_type != path) {
                return Err(AppError::ValidationError(format!("Flashcard in the {} group has the wrong path", path)));
            }
        }

        Ok(())
    }
}

/// A flashcard with its 1-based position within its path group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardRecord {
    pub order: u32,
    #[serde(flatten)]
    pub card: Flashcard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub prompt: Option<String>,
    pub response: String,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CheckIn {
    pub fn manual(decision_id: Uuid, response: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            decision_id,
            prompt: Some(MANUAL_CHECK_IN_PROMPT.to_string()),
            response,
            scheduled_for: Some(now),
            completed_at: Some(now),
            created_at: now,
        }
    }
}

/// The full decision aggregate. Check-ins are newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: Uuid,
    pub query: String,
    pub user_choice: Option<UserChoice>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub question_answers: Vec<QuestionAnswer>,
    pub simulations: Vec<TimelineSimulation>,
    pub flashcards: Vec<FlashcardRecord>,
    pub check_ins: Vec<CheckIn>,
}

impl Decision {
    pub fn from_new(id: Uuid, created_at: DateTime<Utc>, new: NewDecision) -> Self {
        let flashcards = PathType::BOTH
            .iter()
            .flat_map(|path| {
                new.flashcards
                    .side(*path)
                    .iter()
                    .enumerate()
                    .map(|(i, card)| FlashcardRecord { order: i as u32 + 1, card: card.clone() })
                    .collect::<Vec<_>>()
            })
            .collect();

        Self {
            id,
            query: new.query,
            user_choice: Some(new.choice),
            status: DEFAULT_STATUS.to_string(),
            created_at,
            question_answers: new.answers,
            simulations: vec![new.simulation.path_a, new.simulation.path_b],
            flashcards,
            check_ins: Vec::new(),
        }
    }

    pub fn simulation(&self, path: PathType) -> Option<&TimelineSimulation> {
        self.simulations.iter().find(|s| s.path_type == path)
    }

    /// Regroup the stored flashcards by path, in display order.
    pub fn flashcard_set(&self) -> FlashcardSet {
        let side = |path: PathType| {
            let mut cards: Vec<&FlashcardRecord> = self.flashcards.iter().filter(|r| r.card.path_type == path).collect();
            cards.sort_by_key(|r| r.order);
            cards.into_iter().map(|r| r.card.clone()).collect()
        };
        FlashcardSet {
            go_flashcards: side(PathType::Go),
            stay_flashcards: side(PathType::Stay),
        }
    }

    pub fn summary(&self) -> DecisionSummary {
        DecisionSummary {
            id: self.id,
            query: self.query.clone(),
            user_choice: self.user_choice,
            status: self.status.clone(),
            created_at: self.created_at,
            most_recent_check_in: self.check_ins.first().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSummary {
    pub id: Uuid,
    pub query: String,
    pub user_choice: Option<UserChoice>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub most_recent_check_in: Option<CheckIn>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::fallback;

    fn sample() -> NewDecision {
        NewDecision {
            query: "Should I quit my job to start a bakery?".into(),
            choice: UserChoice::Go,
            answers: vec![
                QuestionAnswer { question: "Why?".into(), answer: "Bread".into(), order: 1 },
                QuestionAnswer { question: "Fear?".into(), answer: "Money".into(), order: 2 },
            ],
            simulation: fallback::simulation(),
            flashcards: fallback::flashcards(),
        }
    }

    #[test]
    fn test_valid_decision() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_answer_orders_must_be_contiguous() {
        let mut d = sample();
        d.answers[1].order = 3;
        assert!(matches!(d.validate(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_flashcard_side_required() {
        let mut d = sample();
        d.flashcards.stay_flashcards.clear();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_query_bounds() {
        let mut d = sample();
        d.query = "hm".into();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_from_new_numbers_cards_per_path() {
        let decision = Decision::from_new(Uuid::new_v4(), Utc::now(), sample());
        let go: Vec<u32> = decision
            .flashcards
            .iter()
            .filter(|r| r.card.path_type == PathType::Go)
            .map(|r| r.order)
            .collect();
        assert_eq!(go, vec![1, 2, 3, 4]);
        assert_eq!(decision.flashcard_set(), fallback::flashcards());
        assert_eq!(decision.status, "active");
        assert_eq!(decision.simulation(PathType::Stay), Some(&fallback::simulation().path_b));
    }

    #[test]
    fn test_flashcard_record_is_flat_on_the_wire() {
        let decision = Decision::from_new(Uuid::new_v4(), Utc::now(), sample());
        let value = serde_json::to_value(&decision).unwrap();
        let first = &value["flashcards"][0];
        assert_eq!(first["order"], 1);
        assert_eq!(first["pathType"], "go");
        assert!(first.get("card").is_none());
        assert!(value.get("questionAnswers").is_some());
    }

    #[test]
    fn test_usage_round_trip() {
        let mut user = User::new("user_1".into(), None);
        let mut usage = user.usage();
        usage.daily_count = 2;
        usage.monthly_count = 4;
        user.apply_usage(&usage);
        assert_eq!(user.daily_decision_count, 2);
        assert_eq!(user.usage(), usage);
    }
}
