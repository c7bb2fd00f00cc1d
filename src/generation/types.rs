use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the two futures being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    Go,
    Stay,
}

impl PathType {
    pub const BOTH: [PathType; 2] = [PathType::Go, PathType::Stay];

    pub fn as_str(&self) -> &'static str {
        match self {
            PathType::Go => "go",
            PathType::Stay => "stay",
        }
    }
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PathType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "go" => Ok(PathType::Go),
            "stay" => Ok(PathType::Stay),
            other => Err(format!("unknown path type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Text,
    Scale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl Question {
    pub fn text(question: impl Into<String>) -> Self {
        Self { question: question.into(), kind: QuestionType::Text, options: None }
    }

    pub fn scale(question: impl Into<String>) -> Self {
        Self { question: question.into(), kind: QuestionType::Scale, options: None }
    }

    pub fn multiple_choice(question: impl Into<String>, options: &[&str]) -> Self {
        Self {
            question: question.into(),
            kind: QuestionType::MultipleChoice,
            options: Some(options.iter().map(|o| o.to_string()).collect()),
        }
    }
}

/// A user's answer to one generated question. `order` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub title: String,
    pub emoji: String,
    pub time_label: String,
    pub feeling: String,
    pub short_summary: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSimulation {
    pub path_type: PathType,
    pub path_title: String,
    pub phases: Vec<Phase>,
}

/// `path_a` is the "go" timeline, `path_b` the "stay" timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualPathSimulation {
    pub path_a: TimelineSimulation,
    pub path_b: TimelineSimulation,
}

impl DualPathSimulation {
    pub fn path(&self, path_type: PathType) -> &TimelineSimulation {
        match path_type {
            PathType::Go => &self.path_a,
            PathType::Stay => &self.path_b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Likelihood {
    High,
    Medium,
    Low,
}

impl Likelihood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Likelihood::High => "high",
            Likelihood::Medium => "medium",
            Likelihood::Low => "low",
        }
    }
}

impl FromStr for Likelihood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Likelihood::High),
            "medium" => Ok(Likelihood::Medium),
            "low" => Ok(Likelihood::Low),
            other => Err(format!("unknown likelihood: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub content: String,
    pub path_type: PathType,
    pub category: String,
    pub likelihood: Likelihood,
    pub emoji_before: String,
    pub emoji_after: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSet {
    pub go_flashcards: Vec<Flashcard>,
    pub stay_flashcards: Vec<Flashcard>,
}

impl FlashcardSet {
    pub fn side(&self, path_type: PathType) -> &[Flashcard] {
        match path_type {
            PathType::Go => &self.go_flashcards,
            PathType::Stay => &self.stay_flashcards,
        }
    }

    pub fn len(&self) -> usize {
        self.go_flashcards.len() + self.stay_flashcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_wire_format() {
        let q = Question::multiple_choice("Pick one", &["a", "b", "c", "d"]);
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "multiple_choice");
        assert_eq!(value["options"].as_array().unwrap().len(), 4);

        let text = serde_json::to_value(Question::text("Why?")).unwrap();
        assert!(text.get("options").is_none());
    }

    #[test]
    fn test_simulation_uses_camel_case_keys() {
        let raw = json!({
            "pathA": { "pathType": "go", "pathTitle": "If You Go", "phases": [{
                "title": "The Leap", "emoji": "🚀", "timeLabel": "Now",
                "feeling": "terrified exhilaration", "shortSummary": "You sign.",
                "details": ["one", "two"]
            }]},
            "pathB": { "pathType": "stay", "pathTitle": "If You Stay", "phases": [] }
        });

        let sim: DualPathSimulation = serde_json::from_value(raw).unwrap();
        assert_eq!(sim.path(PathType::Go).phases[0].time_label, "Now");
        assert_eq!(sim.path(PathType::Stay).path_type, PathType::Stay);
    }

    #[test]
    fn test_unknown_likelihood_is_rejected() {
        let raw = json!({
            "content": "x", "pathType": "go", "category": "financial",
            "likelihood": "certain", "emojiBefore": "💸", "emojiAfter": "😖"
        });
        assert!(serde_json::from_value::<Flashcard>(raw).is_err());
    }

    #[test]
    fn test_path_type_parsing() {
        assert_eq!("go".parse::<PathType>().unwrap(), PathType::Go);
        assert_eq!("stay".parse::<PathType>().unwrap(), PathType::Stay);
        assert!("maybe".parse::<PathType>().is_err());
    }
}
