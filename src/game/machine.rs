//! The game state machine.
//!
//! Phase graph:
//!   Idle → LevelIntro → Displaying → AwaitingInput
//!        → Scored{correct|incorrect} → LevelIntro (next) | Ended
//!
//! The machine owns the run state and the timer chain and talks to the
//! outside world through two seams: a `DisplaySurface` it pushes updates
//! into, and the `GameEvent`s it returns from `tick`/`submit_answer`.
//! It never blocks — the host loop calls `tick()` once per tick interval
//! and forwards submitted input.
//!
//! Reentrancy: `submit_answer` is a no-op outside `AwaitingInput`, so a
//! double Enter (or a submit racing the feedback delay) cannot score a
//! level twice. Restarts and level starts cancel the previous timer
//! chain before scheduling a new one.

use rand::Rng;
use tracing::debug;

use crate::config::{RevealMode, RulesConfig, TimingConfig};
use crate::domain::scoring::{self, ScoreBand};
use crate::domain::{sequence, validate};

use super::event::GameEvent;
use super::state::{GamePhase, GameSnapshot, GameState, LevelResult};
use super::surface::{BoxStatus, DisplaySurface};
use super::timer::{TimerChain, TimerKind};

pub struct DigitSpanGame<R: Rng> {
    rules: RulesConfig,
    timing: TimingConfig,
    bands: Vec<ScoreBand>,
    rng: R,
    state: GameState,
    phase: GamePhase,
    timers: TimerChain,
    /// Next digit to reveal in sequential mode (0-based).
    reveal_index: usize,
}

impl<R: Rng> DigitSpanGame<R> {
    pub fn new(rules: RulesConfig, timing: TimingConfig, bands: Vec<ScoreBand>, rng: R) -> Self {
        DigitSpanGame {
            rules,
            timing,
            bands,
            rng,
            state: GameState::new(),
            phase: GamePhase::Idle,
            timers: TimerChain::new(),
            reveal_index: 0,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Deep, defensive snapshot of the run state.
    pub fn state(&self) -> GameSnapshot {
        self.state.snapshot()
    }

    pub fn bands(&self) -> &[ScoreBand] {
        &self.bands
    }

    /// Wall-clock length of the run so far (ticks counted while active).
    pub fn elapsed_ms(&self) -> u64 {
        self.state.elapsed_ticks * self.timing.tick_rate_ms
    }

    // ── Lifecycle ──

    /// Begin a fresh run. Also serves as restart: any pending timer from
    /// a previous run is cancelled before state is reset.
    pub fn start(&mut self, surface: &mut impl DisplaySurface) -> Vec<GameEvent> {
        self.timers.cancel();
        self.state = GameState::new();
        self.state.active = true;
        self.phase = GamePhase::LevelIntro;
        debug!("game started, max_level={}", self.rules.max_level);

        surface.reset_boxes(self.rules.max_level);
        surface.set_score(0);
        surface.set_input_enabled(false);

        let mut events = vec![GameEvent::GameStarted];
        self.start_level(surface, &mut events);
        events
    }

    fn start_level(&mut self, surface: &mut impl DisplaySurface, events: &mut Vec<GameEvent>) {
        if !self.state.active {
            return;
        }
        // Invariant: exactly one live timer chain. A leftover reveal or
        // feedback timer from the previous level must not fire into this one.
        self.timers.cancel();
        self.phase = GamePhase::LevelIntro;

        self.state.level += 1;
        if self.state.level > self.rules.max_level {
            self.finish(surface, events);
            return;
        }

        let digit_count = (self.state.level + self.rules.digit_offset) as usize;
        // Single-flash reads as one natural number, so no leading zero there.
        let first_nonzero = self.rules.reveal_mode == RevealMode::SingleFlash;
        self.state.target = sequence::generate(&mut self.rng, digit_count, first_nonzero);
        debug!(level = self.state.level, digit_count, "level started");

        surface.set_level(self.state.level, self.rules.max_level);
        surface.set_score(self.state.total_score);
        surface.clear_display();
        surface.set_input_enabled(false);
        surface.set_box_status(self.state.level - 1, BoxStatus::Current);

        events.push(GameEvent::LevelStarted { level: self.state.level, digit_count });
        self.phase = GamePhase::Displaying;
        self.reveal_index = 0;

        match self.rules.reveal_mode {
            RevealMode::Sequential => {
                self.timers
                    .schedule(TimerKind::RevealStep, self.timing.ticks(self.timing.digit_interval_ms));
            }
            RevealMode::SingleFlash => {
                surface.show_number(&self.state.target.clone());
                surface.set_countdown(1.0);
                self.timers
                    .schedule(TimerKind::DisplayDone, self.timing.ticks(self.timing.flash_duration_ms));
            }
        }
    }

    /// Advance one tick. Drives reveal, countdown, and feedback delays.
    pub fn tick(&mut self, surface: &mut impl DisplaySurface) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if self.state.active {
            self.state.elapsed_ticks += 1;
        }

        match self.timers.advance() {
            Some(TimerKind::RevealStep) => self.reveal_step(surface, &mut events),
            Some(TimerKind::DisplayDone) => {
                if self.phase == GamePhase::Displaying {
                    surface.set_countdown(0.0);
                    self.open_input(surface, &mut events);
                }
            }
            Some(TimerKind::FeedbackDone) => {
                if let GamePhase::Scored { correct } = self.phase {
                    if correct || !self.rules.stop_on_first_mistake {
                        self.start_level(surface, &mut events);
                    } else {
                        self.finish(surface, &mut events);
                    }
                }
            }
            None => {}
        }

        // Countdown readout while the flash window is open
        if self.phase == GamePhase::Displaying && self.rules.reveal_mode == RevealMode::SingleFlash {
            if let Some(remaining) = self.timers.remaining_fraction() {
                surface.set_countdown(remaining);
            }
        }

        events
    }

    fn reveal_step(&mut self, surface: &mut impl DisplaySurface, events: &mut Vec<GameEvent>) {
        if self.phase != GamePhase::Displaying {
            return;
        }
        if let Some(digit) = self.state.target.chars().nth(self.reveal_index) {
            surface.show_digit(digit);
            events.push(GameEvent::DigitRevealed { index: self.reveal_index });
            self.reveal_index += 1;
            self.timers
                .schedule(TimerKind::RevealStep, self.timing.ticks(self.timing.digit_interval_ms));
        } else {
            self.open_input(surface, events);
        }
    }

    fn open_input(&mut self, surface: &mut impl DisplaySurface, events: &mut Vec<GameEvent>) {
        self.phase = GamePhase::AwaitingInput;
        surface.clear_display();
        surface.set_input_enabled(true);
        events.push(GameEvent::InputOpened { level: self.state.level });
    }

    // ── Answering ──

    /// Score a submitted answer. No-op unless the machine is awaiting
    /// input. Validation failures re-prompt without consuming the turn.
    pub fn submit_answer(
        &mut self,
        raw: &str,
        surface: &mut impl DisplaySurface,
    ) -> Vec<GameEvent> {
        if !self.state.active || self.phase != GamePhase::AwaitingInput {
            return vec![];
        }

        let answer = match validate::validate(raw, self.state.target.len()) {
            Ok(answer) => answer,
            Err(err) => {
                let echo = match &err {
                    validate::ValidationError::NonDigit { cleaned } => Some(cleaned.as_str()),
                    _ => None,
                };
                surface.show_error(&err.to_string(), echo);
                return vec![GameEvent::AnswerRejected(err)];
            }
        };

        // Forward order, exact match. No backward-recall mode.
        let correct = answer == self.state.target;
        let level = self.state.level;
        let score = if correct { scoring::level_score(level) } else { 0 };

        self.state.results.push(LevelResult { level, correct, score });
        if correct {
            self.state.total_score += score;
        }
        debug!(level, correct, score, total = self.state.total_score, "answer scored");

        surface.set_input_enabled(false);
        surface.set_box_status(
            level - 1,
            if correct { BoxStatus::Correct } else { BoxStatus::Incorrect },
        );
        surface.show_feedback(correct);
        surface.set_score(self.state.total_score);

        self.phase = GamePhase::Scored { correct };
        self.timers
            .schedule(TimerKind::FeedbackDone, self.timing.ticks(self.timing.feedback_delay_ms));

        vec![GameEvent::AnswerScored { level, correct, score }]
    }

    /// Abandon the run mid-flight (player backed out). No result screen,
    /// no event; the next `start()` begins fresh.
    pub fn abort(&mut self, surface: &mut impl DisplaySurface) {
        self.timers.cancel();
        self.state.active = false;
        self.phase = GamePhase::Idle;
        surface.clear_display();
        surface.set_input_enabled(false);
        debug!("run aborted");
    }

    fn finish(&mut self, surface: &mut impl DisplaySurface, events: &mut Vec<GameEvent>) {
        self.timers.cancel();
        self.state.active = false;
        self.phase = GamePhase::Ended;

        let band = scoring::band_for(&self.bands, self.state.total_score);
        debug!(total = self.state.total_score, tier = band.tier.as_str(), "game ended");
        surface.show_result(self.state.total_score, &band.label, band.tier);
        events.push(GameEvent::GameEnded { total_score: self.state.total_score });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::validate::ValidationError;
    use crate::game::surface::MockSurface;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Fast timings: every delay is a single tick.
    fn fast_timing() -> TimingConfig {
        TimingConfig {
            tick_rate_ms: 100,
            digit_interval_ms: 100,
            flash_duration_ms: 100,
            feedback_delay_ms: 100,
            error_flash_ms: 100,
        }
    }

    fn game(rules: RulesConfig) -> DigitSpanGame<StdRng> {
        DigitSpanGame::new(
            rules,
            fast_timing(),
            scoring::default_bands(),
            StdRng::seed_from_u64(99),
        )
    }

    fn variant_a() -> RulesConfig {
        let mut rules = GameConfig::default_config().rules;
        rules.max_level = 12;
        rules
    }

    /// Tick until input opens (bounded so a broken machine fails loudly).
    fn run_to_input(g: &mut DigitSpanGame<StdRng>, s: &mut MockSurface) {
        for _ in 0..200 {
            g.tick(s);
            if g.phase() == GamePhase::AwaitingInput {
                return;
            }
        }
        panic!("input never opened, phase {:?}", g.phase());
    }

    /// Tick through the post-feedback delay.
    fn run_feedback(g: &mut DigitSpanGame<StdRng>, s: &mut MockSurface) {
        for _ in 0..10 {
            g.tick(s);
            if !matches!(g.phase(), GamePhase::Scored { .. }) {
                return;
            }
        }
        panic!("stuck in Scored");
    }

    #[test]
    fn five_correct_then_mistake_ends_run() {
        let mut g = game(variant_a());
        let mut s = MockSurface::default();
        g.start(&mut s);

        for _ in 1..=5 {
            run_to_input(&mut g, &mut s);
            let target = g.state().target;
            g.submit_answer(&target, &mut s);
            run_feedback(&mut g, &mut s);
        }

        run_to_input(&mut g, &mut s);
        g.submit_answer("0", &mut s); // wrong length → rejected, retry
        let target = g.state().target;
        let wrong: String = target.chars().map(|c| if c == '9' { '8' } else { '9' }).collect();
        g.submit_answer(&wrong, &mut s);
        run_feedback(&mut g, &mut s);

        assert_eq!(g.phase(), GamePhase::Ended);
        let snap = g.state();
        assert!(!snap.active);
        assert_eq!(snap.results.len(), 6);
        assert_eq!(snap.total_score, 5 + 10 + 15 + 20 + 25);
        assert!(s.result.is_some());
    }

    #[test]
    fn results_len_tracks_level_and_score_sums() {
        let mut g = game(variant_a());
        let mut s = MockSurface::default();
        g.start(&mut s);

        for round in 1..=4 {
            run_to_input(&mut g, &mut s);
            let target = g.state().target;
            g.submit_answer(&target, &mut s);

            let snap = g.state();
            assert_eq!(snap.results.len(), round as usize);
            assert_eq!(snap.results.len() as u32, snap.level);
            let correct_sum: u32 =
                snap.results.iter().filter(|r| r.correct).map(|r| r.score).sum();
            assert_eq!(snap.total_score, correct_sum);

            run_feedback(&mut g, &mut s);
        }
    }

    #[test]
    fn digit_count_is_level_plus_offset() {
        let mut g = game(variant_a());
        let mut s = MockSurface::default();
        let events = g.start(&mut s);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::LevelStarted { level: 1, digit_count: 2 })));
        run_to_input(&mut g, &mut s);
        assert_eq!(g.state().target.len(), 2);
    }

    #[test]
    fn validation_precedence_and_no_turn_consumed() {
        let mut g = game(variant_a());
        let mut s = MockSurface::default();
        g.start(&mut s);
        run_to_input(&mut g, &mut s);

        let ev = g.submit_answer("  ", &mut s);
        assert!(matches!(ev[0], GameEvent::AnswerRejected(ValidationError::Empty)));

        let ev = g.submit_answer("1a", &mut s);
        assert!(matches!(ev[0], GameEvent::AnswerRejected(ValidationError::NonDigit { .. })));
        assert_eq!(s.last_echo.as_deref(), Some("1"));

        let ev = g.submit_answer("1", &mut s);
        assert!(
            matches!(ev[0], GameEvent::AnswerRejected(ValidationError::WrongLength { expected: 2 }))
        );

        // Still awaiting the same level's answer
        assert_eq!(g.phase(), GamePhase::AwaitingInput);
        assert_eq!(g.state().results.len(), 0);
    }

    #[test]
    fn double_submit_is_ignored() {
        let mut g = game(variant_a());
        let mut s = MockSurface::default();
        g.start(&mut s);
        run_to_input(&mut g, &mut s);

        let target = g.state().target;
        let first = g.submit_answer(&target, &mut s);
        assert!(matches!(first[0], GameEvent::AnswerScored { .. }));
        // Rapid second Enter lands in Scored and must do nothing
        let second = g.submit_answer(&target, &mut s);
        assert!(second.is_empty());
        assert_eq!(g.state().results.len(), 1);
    }

    #[test]
    fn snapshot_is_defensive_copy() {
        let mut g = game(variant_a());
        let mut s = MockSurface::default();
        g.start(&mut s);
        run_to_input(&mut g, &mut s);

        let a = g.state();
        let b = g.state();
        assert_eq!(a, b);

        let mut mutated = g.state();
        mutated.results.push(LevelResult { level: 99, correct: true, score: 495 });
        mutated.total_score = 9999;
        assert_eq!(g.state(), a);
    }

    #[test]
    fn restart_cancels_previous_timer_chain() {
        let mut g = game(variant_a());
        let mut s = MockSurface::default();
        g.start(&mut s);
        // Mid-display of level 1, restart
        g.tick(&mut s);
        g.start(&mut s);
        let snap = g.state();
        assert_eq!(snap.level, 1);
        assert_eq!(snap.total_score, 0);
        assert!(snap.results.is_empty());

        // The old chain must not fast-forward the new level: a full
        // fresh reveal still takes its scheduled ticks.
        let mut reveals = 0;
        for _ in 0..200 {
            for e in g.tick(&mut s) {
                if matches!(e, GameEvent::DigitRevealed { .. }) {
                    reveals += 1;
                }
            }
            if g.phase() == GamePhase::AwaitingInput {
                break;
            }
        }
        assert_eq!(reveals, g.state().target.len());
    }

    #[test]
    fn play_through_variant_continues_after_mistake() {
        let mut rules = variant_a();
        rules.stop_on_first_mistake = false;
        rules.max_level = 3;
        let mut g = game(rules);
        let mut s = MockSurface::default();
        g.start(&mut s);

        for _ in 1..=3 {
            run_to_input(&mut g, &mut s);
            let target = g.state().target;
            let wrong: String =
                target.chars().map(|c| if c == '9' { '8' } else { '9' }).collect();
            g.submit_answer(&wrong, &mut s);
            run_feedback(&mut g, &mut s);
        }

        assert_eq!(g.phase(), GamePhase::Ended);
        let snap = g.state();
        assert_eq!(snap.results.len(), 3);
        assert_eq!(snap.total_score, 0);
    }

    #[test]
    fn single_flash_masks_then_opens_input() {
        let mut rules = variant_a();
        rules.reveal_mode = RevealMode::SingleFlash;
        let mut g = game(rules);
        let mut s = MockSurface::default();
        g.start(&mut s);

        assert!(s.calls.iter().any(|c| c.starts_with("number ")));
        // No leading zero in the flashed number
        let shown = s.calls.iter().find(|c| c.starts_with("number ")).unwrap();
        assert_ne!(shown.as_bytes()[7], b'0');

        run_to_input(&mut g, &mut s);
        assert!(s.input_enabled);
        // Masked before input: a clear must come after the number
        let num_pos = s.calls.iter().position(|c| c.starts_with("number ")).unwrap();
        let clear_pos = s.calls.iter().rposition(|c| c == "clear").unwrap();
        assert!(clear_pos > num_pos);
    }

    #[test]
    fn completing_all_levels_ends_cleanly() {
        let mut rules = variant_a();
        rules.max_level = 2;
        let mut g = game(rules);
        let mut s = MockSurface::default();
        g.start(&mut s);

        for _ in 1..=2 {
            run_to_input(&mut g, &mut s);
            let target = g.state().target;
            g.submit_answer(&target, &mut s);
            run_feedback(&mut g, &mut s);
        }

        assert_eq!(g.phase(), GamePhase::Ended);
        assert_eq!(g.state().total_score, 5 + 10);
    }

    #[test]
    fn abort_stops_timers_and_events() {
        let mut g = game(variant_a());
        let mut s = MockSurface::default();
        g.start(&mut s);
        g.abort(&mut s);
        assert_eq!(g.phase(), GamePhase::Idle);
        assert!(!g.state().active);
        for _ in 0..50 {
            assert!(g.tick(&mut s).is_empty());
        }
    }

    #[test]
    fn submit_before_start_is_noop() {
        let mut g = game(variant_a());
        let mut s = MockSurface::default();
        assert!(g.submit_answer("123", &mut s).is_empty());
        assert_eq!(g.phase(), GamePhase::Idle);
    }
}
