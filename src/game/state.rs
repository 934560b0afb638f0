//! Game state: the record of a single run.
//!
//! Invariants (checked by the machine's tests):
//!   - `results.len() == level` once a level has been scored
//!   - `total_score == sum(score)` over results where `correct`
//!
//! The state is created by `start()`, mutated one level at a time, and
//! replaced wholesale on restart. Nothing here is persisted.

/// Where the machine is in the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GamePhase {
    Idle,
    LevelIntro,
    Displaying,
    AwaitingInput,
    Scored { correct: bool },
    Ended,
}

/// Outcome of one scored level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelResult {
    pub level: u32,
    pub correct: bool,
    pub score: u32,
}

/// Mutable run state owned by the machine.
#[derive(Clone, Debug)]
pub struct GameState {
    pub level: u32,
    pub total_score: u32,
    pub active: bool,
    /// The digit string the player must recall for the current level.
    pub target: String,
    pub results: Vec<LevelResult>,
    /// Ticks elapsed since `start()`, for the completion-time readout.
    pub elapsed_ticks: u64,
}

impl GameState {
    pub fn new() -> Self {
        GameState {
            level: 0,
            total_score: 0,
            active: false,
            target: String::new(),
            results: Vec::new(),
            elapsed_ticks: 0,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only snapshot handed to callers. Owns deep copies, so mutating
/// a snapshot can never reach back into the machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSnapshot {
    pub level: u32,
    pub total_score: u32,
    pub active: bool,
    pub target: String,
    pub results: Vec<LevelResult>,
}

impl GameState {
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            level: self.level,
            total_score: self.total_score,
            active: self.active,
            target: self.target.clone(),
            results: self.results.clone(),
        }
    }
}
