//! Presentation state: the `DisplaySurface` the machine pushes into.
//!
//! Holds everything the renderer needs to compose a frame and nothing
//! the machine needs to run. The renderer reads it; only the machine
//! (through the surface trait) and the key handler write it.

use crate::domain::scoring::Tier;
use crate::game::surface::{BoxStatus, DisplaySurface};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Title,
    Game,
    Results,
}

#[derive(Clone, Debug)]
pub struct ResultView {
    pub total_score: u32,
    pub label: String,
    pub tier: Tier,
}

pub struct ViewState {
    pub screen: Screen,
    pub level: u32,
    pub max_level: u32,
    pub total_score: u32,
    /// What the big display area shows: one digit, or the whole number.
    pub display: String,
    /// Single-flash countdown fraction, 1.0 → 0.0.
    pub countdown: Option<f32>,
    pub input_enabled: bool,
    /// Digits typed so far.
    pub entry: String,
    pub boxes: Vec<BoxStatus>,
    pub feedback: Option<bool>,
    pub result: Option<ResultView>,
    /// Transient status line plus its remaining ticks (0 = sticky).
    pub message: String,
    pub message_timer: u32,
    pub anim_tick: u32,
    /// How long a validation message stays up, in ticks.
    error_ticks: u32,
}

impl ViewState {
    pub fn new(max_level: u32, error_ticks: u32) -> ViewState {
        ViewState {
            screen: Screen::Title,
            level: 0,
            max_level,
            total_score: 0,
            display: String::new(),
            countdown: None,
            input_enabled: false,
            entry: String::new(),
            boxes: vec![BoxStatus::Neutral; max_level as usize],
            feedback: None,
            result: None,
            message: String::new(),
            message_timer: 0,
            anim_tick: 0,
            error_ticks,
        }
    }

    pub fn set_message(&mut self, text: &str, ticks: u32) {
        self.message = text.to_string();
        self.message_timer = ticks;
    }

    /// Per-tick housekeeping: expire the message bar, advance blink.
    pub fn tick(&mut self) {
        self.anim_tick = self.anim_tick.wrapping_add(1);
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }
}

impl DisplaySurface for ViewState {
    fn set_level(&mut self, level: u32, max_level: u32) {
        self.level = level;
        self.max_level = max_level;
        self.feedback = None;
    }

    fn set_score(&mut self, total_score: u32) {
        self.total_score = total_score;
    }

    fn show_digit(&mut self, digit: char) {
        self.display.clear();
        self.display.push(digit);
    }

    fn show_number(&mut self, number: &str) {
        self.display = number.to_string();
    }

    fn set_countdown(&mut self, remaining: f32) {
        self.countdown = if remaining > 0.0 { Some(remaining) } else { None };
    }

    fn clear_display(&mut self) {
        self.display.clear();
        self.countdown = None;
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
        if enabled {
            self.entry.clear();
        }
    }

    fn reset_boxes(&mut self, max_level: u32) {
        self.boxes = vec![BoxStatus::Neutral; max_level as usize];
        self.result = None;
        self.feedback = None;
        self.screen = Screen::Game;
    }

    fn set_box_status(&mut self, index: u32, status: BoxStatus) {
        if let Some(slot) = self.boxes.get_mut(index as usize) {
            *slot = status;
        }
    }

    fn show_error(&mut self, message: &str, echo: Option<&str>) {
        self.set_message(message, self.error_ticks);
        if let Some(cleaned) = echo {
            self.entry = cleaned.to_string();
        }
    }

    fn show_feedback(&mut self, correct: bool) {
        self.feedback = Some(correct);
    }

    fn show_result(&mut self, total_score: u32, label: &str, tier: Tier) {
        self.result = Some(ResultView { total_score, label: label.to_string(), tier });
        self.screen = Screen::Results;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabling_input_clears_the_entry() {
        let mut v = ViewState::new(12, 20);
        v.entry = "123".into();
        v.set_input_enabled(true);
        assert!(v.entry.is_empty());
        assert!(v.input_enabled);
    }

    #[test]
    fn error_echo_replaces_entry() {
        let mut v = ViewState::new(12, 20);
        v.entry = "12a".into();
        v.show_error("Only numbers are allowed", Some("12"));
        assert_eq!(v.entry, "12");
        assert_eq!(v.message, "Only numbers are allowed");
        assert!(v.message_timer > 0);
    }

    #[test]
    fn error_duration_comes_from_construction() {
        let mut v = ViewState::new(12, 5);
        v.show_error("Only numbers are allowed", None);
        assert_eq!(v.message_timer, 5);
        for _ in 0..5 {
            assert!(!v.message.is_empty());
            v.tick();
        }
        assert!(v.message.is_empty());
    }

    #[test]
    fn message_expires_after_its_ticks() {
        let mut v = ViewState::new(12, 20);
        v.set_message("hello", 2);
        v.tick();
        assert_eq!(v.message, "hello");
        v.tick();
        assert!(v.message.is_empty());
    }

    #[test]
    fn result_switches_to_results_screen() {
        let mut v = ViewState::new(12, 20);
        v.reset_boxes(12);
        assert_eq!(v.screen, Screen::Game);
        v.show_result(275, "Good! Keep it up!", Tier::Excellent);
        assert_eq!(v.screen, Screen::Results);
        assert_eq!(v.result.as_ref().unwrap().total_score, 275);
    }
}
