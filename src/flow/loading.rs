//! Copy shown while an artifact is being generated.

use std::time::Duration;

use super::state::{Pending, Stage};

/// How long each message stays up before the next one.
pub const ROTATE_EVERY: Duration = Duration::from_secs(3);

pub const QUESTION_MESSAGES: &[&str] = &[
    "Reading between the lines...",
    "Asking the questions you're avoiding...",
    "Getting nosy...",
    "Preparing the hard questions...",
];

pub const SIMULATION_MESSAGES: &[&str] = &[
    "Fast-forwarding to next year...",
    "Checking the multiverse...",
    "Simulating 847 possible futures...",
    "Consulting your future self...",
    "Time traveling (legally)...",
    "Running the numbers your brain won't...",
    "Calculating regret probability...",
    "Mapping emotional trajectories...",
];

pub const FLASHCARD_MESSAGES: &[&str] = &[
    "Gathering your regrets...",
    "Collecting what keeps you up at night...",
    "Finding the skeletons...",
    "Identifying future 3am thoughts...",
];

pub fn messages_for(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Questions => QUESTION_MESSAGES,
        Stage::Simulating(Pending::Simulation) => SIMULATION_MESSAGES,
        Stage::Simulating(Pending::Flashcards) => FLASHCARD_MESSAGES,
        _ => &[],
    }
}

/// The message to show after `elapsed` in `stage`.
pub fn message_at(stage: Stage, elapsed: Duration) -> Option<&'static str> {
    let messages = messages_for(stage);
    if messages.is_empty() {
        return None;
    }
    let index = (elapsed.as_secs() / ROTATE_EVERY.as_secs()) as usize % messages.len();
    Some(messages[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps() {
        let stage = Stage::Simulating(Pending::Simulation);
        assert_eq!(message_at(stage, Duration::ZERO), Some(SIMULATION_MESSAGES[0]));
        assert_eq!(message_at(stage, Duration::from_secs(7)), Some(SIMULATION_MESSAGES[2]));
        assert_eq!(message_at(stage, Duration::from_secs(24)), Some(SIMULATION_MESSAGES[0]));
    }

    #[test]
    fn test_flashcard_copy_differs_from_simulation_copy() {
        assert_eq!(
            message_at(Stage::Simulating(Pending::Flashcards), Duration::ZERO),
            Some("Gathering your regrets...")
        );
        assert_eq!(message_at(Stage::Decision, Duration::ZERO), None);
    }
}
