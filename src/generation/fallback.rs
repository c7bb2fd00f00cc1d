//! Canned artifacts served when no text generator is configured.
//!
//! Every payload here passes the same shape validation as live output, and
//! none of them depend on the caller's input.

use super::types::{
    DualPathSimulation, Flashcard, FlashcardSet, Likelihood, PathType, Phase, Question, TimelineSimulation,
};

pub fn questions() -> Vec<Question> {
    vec![
        Question::multiple_choice(
            "What is the primary driver for this decision?",
            &[
                "Financial Freedom",
                "Passion/Purpose",
                "Escaping current situation",
                "External Pressure",
                "Curiosity",
            ],
        ),
        Question::text("What is your biggest fear about saying YES?"),
        Question::scale("How confident do you feel right now? (1 = Terrified, 10 = Ready)"),
        Question::multiple_choice(
            "What would you regret more in 10 years?",
            &["Doing it and failing", "Never trying at all", "Burning bridges", "Losing money"],
        ),
    ]
}

fn phase(title: &str, emoji: &str, time_label: &str, feeling: &str, summary: &str, details: [&str; 2]) -> Phase {
    Phase {
        title: title.to_string(),
        emoji: emoji.to_string(),
        time_label: time_label.to_string(),
        feeling: feeling.to_string(),
        short_summary: summary.to_string(),
        details: details.iter().map(|d| d.to_string()).collect(),
    }
}

pub fn simulation() -> DualPathSimulation {
    DualPathSimulation {
        path_a: TimelineSimulation {
            path_type: PathType::Go,
            path_title: "If You Go".to_string(),
            phases: vec![
                phase(
                    "The Plunge",
                    "🌊",
                    "Now",
                    "shock and awe",
                    "The water is colder than you thought. You gasp, but you're swimming.",
                    ["Deleting the old apps from your phone", "That first awkward dinner conversation"],
                ),
                phase(
                    "The Grind",
                    "🧗",
                    "3 months",
                    "exhausted determination",
                    "The novelty has worn off. Now it's just work. You miss your old comfort zone.",
                    ["Checking your bank account nervously", "Questioning if you have what it takes"],
                ),
                phase(
                    "The Breakthrough",
                    "💡",
                    "1 year",
                    "steady competence",
                    "You aren't the new person anymore. You have scars, but you have skills.",
                    ["Teaching someone else how to do it", "Sleeping soundly for the first time"],
                ),
                phase(
                    "The Transformation",
                    "🦋",
                    "3 years",
                    "integrated wholeness",
                    "You can't imagine fitting into your old life. It feels like a skin you shed.",
                    ["Laughing at your old fears", "Planning the next big leap"],
                ),
            ],
        },
        path_b: TimelineSimulation {
            path_type: PathType::Stay,
            path_title: "If You Stay".to_string(),
            phases: vec![
                phase(
                    "The Relief",
                    "🛋️",
                    "Now",
                    "safe but heavy",
                    "You close the door on the opportunity. It's safe here. Warm.",
                    ["Ordering the usual take-out", "Ignoring the nagging voice in your head"],
                ),
                phase(
                    "The Itch",
                    "🐜",
                    "3 months",
                    "restless irritation",
                    "Everything is fine. Just fine. Why does that make you want to scream?",
                    ["Snapping at a coworker for no reason", "Doomscrolling until 2am"],
                ),
                phase(
                    "The Resignation",
                    "😐",
                    "1 year",
                    "numb acceptance",
                    "You've convinced yourself it was for the best. The dream feels childish now.",
                    ["Deleting the bookmark folder", "Focusing entirely on the weekend"],
                ),
                phase(
                    "The Hollow",
                    "🕳️",
                    "3 years",
                    "quiet regret",
                    "You see someone else take that leap. You feel a pang in your chest that doesn't go away.",
                    ["Wondering 'what if' during your commute", "Feeling older than you are"],
                ),
            ],
        },
    }
}

fn card(path_type: PathType, content: &str, category: &str, likelihood: Likelihood, before: &str, after: &str) -> Flashcard {
    Flashcard {
        content: content.to_string(),
        path_type,
        category: category.to_string(),
        likelihood,
        emoji_before: before.to_string(),
        emoji_after: after.to_string(),
    }
}

pub fn flashcards() -> FlashcardSet {
    use Likelihood::{High, Low, Medium};
    use PathType::{Go, Stay};

    FlashcardSet {
        go_flashcards: vec![
            card(Go, "You run out of savings in month 4 and have to ask your parents for a loan.", "financial", Medium, "💸", "😖"),
            card(Go, "You realize you miss the routine you used to complain about every day.", "emotional", High, "🏠", "😢"),
            card(
                Go,
                "Your old friends stop inviting you out because you're 'too busy' or 'too different'.",
                "relationships",
                Medium,
                "📱",
                "🔕",
            ),
            card(Go, "A year in, you catch yourself wondering who you were trying to prove wrong.", "identity", Low, "🪞", "😶"),
        ],
        stay_flashcards: vec![
            card(Stay, "You see a LinkedIn update that someone else launched your idea.", "identity", Low, "👀", "💔"),
            card(Stay, "Ten years pass and you realize you never left your hometown.", "time", High, "⏳", "🕸️"),
            card(
                Stay,
                "You become bitter towards people who took risks, calling them 'lucky'.",
                "emotional",
                Medium,
                "😒",
                "😠",
            ),
            card(Stay, "The raise you stayed for arrives, and it buys nothing you actually wanted.", "financial", Medium, "💰", "😑"),
        ],
    }
}
