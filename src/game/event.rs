//! Events emitted while the machine runs.
//! The presentation layer consumes these for messages and screen changes.

use crate::domain::validate::ValidationError;

#[derive(Clone, Debug)]
pub enum GameEvent {
    GameStarted,
    LevelStarted { level: u32, digit_count: usize },
    DigitRevealed { index: usize },
    InputOpened { level: u32 },
    AnswerRejected(ValidationError),
    AnswerScored { level: u32, correct: bool, score: u32 },
    GameEnded { total_score: u32 },
}
