//! Turning raw generator text into validated artifacts.
//!
//! The generator may wrap its JSON in a fenced code block; the first fenced
//! block wins, otherwise the whole text is parsed. Any structural problem
//! rejects the whole artifact.

use serde::de::DeserializeOwned;
use serde_json::error::Category;

use super::types::{DualPathSimulation, FlashcardSet, PathType, Question, QuestionType, TimelineSimulation};
use crate::error::DecodeError;

pub const MIN_QUESTIONS: usize = 3;
pub const MAX_QUESTIONS: usize = 5;
pub const MIN_CHOICE_OPTIONS: usize = 4;
pub const MAX_CHOICE_OPTIONS: usize = 5;
pub const MIN_PHASES: usize = 3;
pub const PHASE_DETAILS: usize = 2;
pub const MIN_FLASHCARDS_PER_PATH: usize = 4;
pub const MAX_FLASHCARDS_PER_PATH: usize = 5;

const FENCE: &str = "```";

/// Return the JSON payload inside the first fenced block, or the trimmed text.
pub fn extract_json(raw: &str) -> &str {
    if let Some(start) = raw.find(FENCE) {
        let rest = &raw[start + FENCE.len()..];
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.find(FENCE) {
            return rest[..end].trim();
        }
    }
    raw.trim()
}

fn parse<T: DeserializeOwned>(raw: &str, artifact: &'static str) -> Result<T, DecodeError> {
    serde_json::from_str(extract_json(raw)).map_err(|e| match e.classify() {
        Category::Data => DecodeError::InvalidShape { artifact, reason: e.to_string() },
        _ => DecodeError::InvalidJson(e.to_string()),
    })
}

fn shape(artifact: &'static str, reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidShape { artifact, reason: reason.into() }
}

pub fn decode_questions(raw: &str) -> Result<Vec<Question>, DecodeError> {
    let mut questions: Vec<Question> = parse(raw, "questions")?;
    for q in questions.iter_mut() {
        if q.kind != QuestionType::MultipleChoice && q.options.as_ref().is_some_and(|o| o.is_empty()) {
            q.options = None;
        }
    }
    validate_questions(&questions)?;
    Ok(questions)
}

pub fn validate_questions(questions: &[Question]) -> Result<(), DecodeError> {
    const ARTIFACT: &str = "questions";

    if questions.len() < MIN_QUESTIONS || questions.len() > MAX_QUESTIONS {
        return Err(shape(
            ARTIFACT,
            format!("expected {}-{} questions, got {}", MIN_QUESTIONS, MAX_QUESTIONS, questions.len()),
        ));
    }

    for (i, q) in questions.iter().enumerate() {
        if q.question.trim().is_empty() {
            return Err(shape(ARTIFACT, format!("question {} is empty", i + 1)));
        }
        match (q.kind, &q.options) {
            (QuestionType::MultipleChoice, Some(options))
                if (MIN_CHOICE_OPTIONS..=MAX_CHOICE_OPTIONS).contains(&options.len()) => {}
            (QuestionType::MultipleChoice, _) => {
                return Err(shape(
                    ARTIFACT,
                    format!(
                        "multiple choice question {} needs {}-{} options",
                        i + 1,
                        MIN_CHOICE_OPTIONS,
                        MAX_CHOICE_OPTIONS
                    ),
                ));
            }
            (_, Some(_)) => {
                return Err(shape(ARTIFACT, format!("question {} has options but is not multiple choice", i + 1)));
            }
            (_, None) => {}
        }
    }

    Ok(())
}

pub fn decode_simulation(raw: &str) -> Result<DualPathSimulation, DecodeError> {
    let simulation: DualPathSimulation = parse(raw, "simulation")?;
    validate_simulation(&simulation)?;
    Ok(simulation)
}

pub fn validate_simulation(simulation: &DualPathSimulation) -> Result<(), DecodeError> {
    validate_timeline(&simulation.path_a, PathType::Go)?;
    validate_timeline(&simulation.path_b, PathType::Stay)
}

fn validate_timeline(timeline: &TimelineSimulation, expected: PathType) -> Result<(), DecodeError> {
    const ARTIFACT: &str = "simulation";

    if timeline.path_type != expected {
        return Err(shape(
            ARTIFACT,
            format!("expected a {} path, got {}", expected, timeline.path_type),
        ));
    }
    if timeline.phases.len() < MIN_PHASES {
        return Err(shape(
            ARTIFACT,
            format!("{} path needs at least {} phases, got {}", expected, MIN_PHASES, timeline.phases.len()),
        ));
    }
    if let Some(i) = timeline.phases.iter().position(|p| p.details.len() != PHASE_DETAILS) {
        return Err(shape(
            ARTIFACT,
            format!(
                "{} phase {} needs {} details, got {}",
                expected,
                i + 1,
                PHASE_DETAILS,
                timeline.phases[i].details.len()
            ),
        ));
    }
    Ok(())
}

pub fn decode_flashcards(raw: &str) -> Result<FlashcardSet, DecodeError> {
    let set: FlashcardSet = parse(raw, "flashcards")?;
    validate_flashcards(&set)?;
    Ok(set)
}

pub fn validate_flashcards(set: &FlashcardSet) -> Result<(), DecodeError> {
    for path in PathType::BOTH {
        let side = set.side(path);
        if !(MIN_FLASHCARDS_PER_PATH..=MAX_FLASHCARDS_PER_PATH).contains(&side.len()) {
            return Err(shape(
                "flashcards",
                format!(
                    "{} side needs {}-{} cards, got {}",
                    path,
                    MIN_FLASHCARDS_PER_PATH,
                    MAX_FLASHCARDS_PER_PATH,
                    side.len()
                ),
            ));
        }
        if side.iter().any(|card| card.path_type != path) {
            return Err(shape("flashcards", format!("{} side contains a card for the other path", path)));
        }
    }
    Ok(())
}
