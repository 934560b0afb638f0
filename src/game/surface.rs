//! The display surface: everything the machine may tell a front end.
//!
//! Setter-style operations only. The machine pushes state changes through
//! this trait and never assumes what the other side renders with — the
//! shipped implementation is a crossterm view (`ui::view`), the tests use
//! a recording mock.

use crate::domain::scoring::Tier;

/// Status of one level box in the progress strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxStatus {
    Neutral,
    Current,
    Correct,
    Incorrect,
}

pub trait DisplaySurface {
    /// Current level indicator ("Level 3" of 12).
    fn set_level(&mut self, level: u32, max_level: u32);

    /// Running total score readout.
    fn set_score(&mut self, total_score: u32);

    /// Sequential reveal: show a single digit, replacing the previous one.
    fn show_digit(&mut self, digit: char);

    /// Single-flash reveal: show the whole number at once.
    fn show_number(&mut self, number: &str);

    /// Fraction of the flash window remaining, 1.0 → 0.0.
    fn set_countdown(&mut self, remaining: f32);

    /// Blank the digit/number display (mask before input opens).
    fn clear_display(&mut self);

    /// Whether the answer entry accepts input.
    fn set_input_enabled(&mut self, enabled: bool);

    /// Reset the progress strip to `max_level` neutral boxes.
    fn reset_boxes(&mut self, max_level: u32);

    /// Recolor one box (0-based level index).
    fn set_box_status(&mut self, index: u32, status: BoxStatus);

    /// Transient validation message. `echo` replaces the entry content
    /// (used to strip non-digits from what the player typed).
    fn show_error(&mut self, message: &str, echo: Option<&str>);

    /// Right/wrong flash after a scored answer.
    fn show_feedback(&mut self, correct: bool);

    /// Final screen: total score, performance line, tier badge.
    fn show_result(&mut self, total_score: u32, label: &str, tier: Tier);
}

/// Records every call for assertions. Lives here rather than in the test
/// modules because both the machine tests and the ui tests use it.
#[cfg(test)]
#[derive(Default)]
pub struct MockSurface {
    pub calls: Vec<String>,
    pub input_enabled: bool,
    pub boxes: Vec<BoxStatus>,
    pub last_error: Option<String>,
    pub last_echo: Option<String>,
    pub result: Option<(u32, String, Tier)>,
}

#[cfg(test)]
impl DisplaySurface for MockSurface {
    fn set_level(&mut self, level: u32, max_level: u32) {
        self.calls.push(format!("level {level}/{max_level}"));
    }
    fn set_score(&mut self, total_score: u32) {
        self.calls.push(format!("score {total_score}"));
    }
    fn show_digit(&mut self, digit: char) {
        self.calls.push(format!("digit {digit}"));
    }
    fn show_number(&mut self, number: &str) {
        self.calls.push(format!("number {number}"));
    }
    fn set_countdown(&mut self, remaining: f32) {
        self.calls.push(format!("countdown {remaining:.2}"));
    }
    fn clear_display(&mut self) {
        self.calls.push("clear".into());
    }
    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
        self.calls.push(format!("input {enabled}"));
    }
    fn reset_boxes(&mut self, max_level: u32) {
        self.boxes = vec![BoxStatus::Neutral; max_level as usize];
        self.calls.push(format!("boxes {max_level}"));
    }
    fn set_box_status(&mut self, index: u32, status: BoxStatus) {
        if let Some(slot) = self.boxes.get_mut(index as usize) {
            *slot = status;
        }
        self.calls.push(format!("box {index} {status:?}"));
    }
    fn show_error(&mut self, message: &str, echo: Option<&str>) {
        self.last_error = Some(message.to_string());
        self.last_echo = echo.map(str::to_string);
        self.calls.push(format!("error {message}"));
    }
    fn show_feedback(&mut self, correct: bool) {
        self.calls.push(format!("feedback {correct}"));
    }
    fn show_result(&mut self, total_score: u32, label: &str, tier: Tier) {
        self.result = Some((total_score, label.to_string(), tier));
        self.calls.push(format!("result {total_score}"));
    }
}
