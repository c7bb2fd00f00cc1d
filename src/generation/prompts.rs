use super::types::{DualPathSimulation, Phase, QuestionAnswer};

const QUESTIONS_TEMPLATE: &str = r#"You are a decision clarity coach. Given a life decision, generate exactly 4-5 pointed, interactive questions to help the user gain clarity.

Your goal is to get to the emotional core and practical reality of the decision.

Generate a mix of these question types:
- "multiple_choice" (2-3 questions): Use this for categorical factors (e.g., primary driver, time pressure, emotional state). Provide 4-5 short, punchy options.
- "text" (1-2 questions): Use this for specific fears or scenarios.
- "scale" (1 question): Use this for gut feeling or confidence (1-10).

Return a JSON array with this structure:
[
  {
    "question": "What's the main emotion driving this decision?",
    "type": "multiple_choice",
    "options": ["Fear of missing out", "Boredom", "Financial pressure", "Excitement", "Anxiety"]
  },
  {
    "question": "What is the worst-case scenario if you do this?",
    "type": "text"
  },
  {
    "question": "On a scale of 1-10, how much do you trust your gut on this?",
    "type": "scale"
  }
]

Rules:
- Keep questions short (max 15 words).
- Keep options short (max 5 words).
- For "scale" type, the UI handles the 1-10 slider, so just return type "scale".
- Return ONLY valid JSON.
"#;

const SIMULATION_TEMPLATE: &str = r#"You are a future-self simulator. Given a life decision and user context, generate two distinct timelines: one where they make the change (Path A), and one where they don't (Path B).

For each path, simulate 4 key moments:
1. "Immediate" (First month)
2. "Short Term" (3 months)
3. "Medium Term" (1 year)
4. "Long Term" (3 years)

For each moment, provide:
- title: A specific, evocative title for that phase (e.g., "The Honeymoon Crash", "The Quiet Resignation")
- emoji: A single emoji representing the dominant vibe
- timeLabel: "Now", "3 months", "1 year", "3 years"
- feeling: A 2-4 word emotional summary (lowercased)
- shortSummary: 2 concise sentences describing the reality. Focus on sensory details and internal monologue.
- details: 2 specific bullet points (concrete events, thoughts, or observations).

Return a JSON object with this exact structure:
{
  "pathA": {
    "pathType": "go",
    "pathTitle": "If You Go",
    "phases": [
      {
        "title": "The Leap",
        "emoji": "🚀",
        "timeLabel": "Now",
        "feeling": "terrified exhilaration",
        "shortSummary": "You sign the papers. Your hands are shaking but the air smells different.",
        "details": ["waking up at 4am wondering if you messed up", "a surprising text from an old friend"]
      },
      ... (3 more phases)
    ]
  },
  "pathB": {
    "pathType": "stay",
    "pathTitle": "If You Stay",
    "phases": [ ... 4 phases ... ]
  }
}

Rules:
- Be realistic, not idealistic.
- Path A should show the struggle of change.
- Path B should show the subtle decay of stagnation (or the comfort of safety, depending on context).
- Use the user's answers to personalize details.
- Return ONLY valid JSON."#;

const FLASHCARDS_TEMPLATE: &str = r#"You are a regret simulation engine. Generate highly specific, scenario-based regrets that might haunt someone after making (or not making) a major life decision.

For each path (Path A = Go, Path B = Stay), generate 4-5 flashcards.

Each flashcard must have:
- content: A specific "what if" scenario or realization. "What if I'm 40 and broke?"
- category: One of "financial", "relationships", "emotional", "time", "identity", "general"
- likelihood: "high", "medium", or "low" (how probable is this regret?)
- emojiBefore: An emoji representing the fear (e.g., 💸)
- emojiAfter: An emoji representing the aftermath or reaction (e.g., 😰)

Return a JSON object with this exact structure:
{
  "goFlashcards": [
    {
      "content": "You see your friends getting promoted while you're still struggling to make rent in a new city.",
      "pathType": "go",
      "category": "financial",
      "likelihood": "high",
      "emojiBefore": "📉",
      "emojiAfter": "🙈"
    }
  ],
  "stayFlashcards": [
    {
      "content": "Five years pass and you realize you never left your hometown.",
      "pathType": "stay",
      "category": "time",
      "likelihood": "high",
      "emojiBefore": "⏳",
      "emojiAfter": "🕸️"
    }
  ]
}

Rules:
- Be visceral and specific. "You wake up at 3am..."
- Use their context to make it hurt (constructively).
- Return ONLY valid JSON."#;

/// `Qn: question\nA: answer`, one block per answer, blank line between blocks.
pub fn format_answers(answers: &[QuestionAnswer]) -> String {
    answers
        .iter()
        .enumerate()
        .map(|(i, a)| format!("Q{}: {}\nA: {}", i + 1, a.question, a.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_phases(phases: &[Phase]) -> String {
    phases
        .iter()
        .map(|p| format!("{}: {}\n{}", p.title, p.feeling, p.short_summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn questions_prompt(decision: &str) -> String {
    format!("{}\n\nDecision being contemplated: \"{}\"", QUESTIONS_TEMPLATE, decision)
}

pub fn simulation_prompt(decision: &str, answers: &[QuestionAnswer]) -> String {
    format!(
        "{}\n\nDecision: \"{}\"\n\nUser's answers to probing questions:\n{}",
        SIMULATION_TEMPLATE,
        decision,
        format_answers(answers)
    )
}

pub fn flashcards_prompt(decision: &str, answers: &[QuestionAnswer], simulation: &DualPathSimulation) -> String {
    let context = format!(
        "Decision: \"{}\"\n\nUser's answers:\n{}\n\nPath A (Go) simulation summary:\n{}\n\nPath B (Stay) simulation summary:\n{}",
        decision,
        format_answers(answers),
        format_phases(&simulation.path_a.phases),
        format_phases(&simulation.path_b.phases),
    );
    format!("{}\n\nContext:\n{}", FLASHCARDS_TEMPLATE, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::fallback;

    fn answers() -> Vec<QuestionAnswer> {
        vec![
            QuestionAnswer { question: "Why now?".into(), answer: "Burnout".into(), order: 1 },
            QuestionAnswer { question: "Gut?".into(), answer: "7".into(), order: 2 },
        ]
    }

    #[test]
    fn test_format_answers() {
        assert_eq!(format_answers(&answers()), "Q1: Why now?\nA: Burnout\n\nQ2: Gut?\nA: 7");
        assert_eq!(format_answers(&[]), "");
    }

    #[test]
    fn test_questions_prompt_quotes_decision() {
        let prompt = questions_prompt("Should I move to Lisbon?");
        assert!(prompt.starts_with("You are a decision clarity coach."));
        assert!(prompt.ends_with("Decision being contemplated: \"Should I move to Lisbon?\""));
    }

    #[test]
    fn test_simulation_prompt_includes_answers() {
        let prompt = simulation_prompt("Should I move to Lisbon?", &answers());
        assert!(prompt.contains("Decision: \"Should I move to Lisbon?\""));
        assert!(prompt.contains("User's answers to probing questions:\nQ1: Why now?\nA: Burnout"));
    }

    #[test]
    fn test_flashcards_prompt_summarises_both_paths() {
        let sim = fallback::simulation();
        let prompt = flashcards_prompt("Should I move to Lisbon?", &answers(), &sim);
        assert!(prompt.contains("Context:\nDecision:"));
        assert!(prompt.contains("Path A (Go) simulation summary:\nThe Plunge: shock and awe\n"));
        assert!(prompt.contains("Path B (Stay) simulation summary:\nThe Relief: safe but heavy\n"));
    }
}
