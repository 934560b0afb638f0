//! Input drain: collects the key presses delivered since last frame.
//!
//! The game reads typed digits as discrete presses rather than held
//! keys, so only Press/Repeat events matter. Everything pending is
//! drained once per frame without blocking and queried from there.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub struct InputState {
    /// Key presses seen during the most recent drain, in arrival order.
    pressed: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { pressed: Vec::with_capacity(8), raw_events: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events. Call once per frame, before
    /// handling keys.
    pub fn drain_events(&mut self) {
        self.pressed.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
                if key.kind != KeyEventKind::Release {
                    self.pressed.push(key.code);
                }
            }
        }
    }

    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Digits typed this frame, in order.
    pub fn typed_digits(&self) -> impl Iterator<Item = char> + '_ {
        self.pressed.iter().filter_map(|code| match code {
            KeyCode::Char(c) if c.is_ascii_digit() => Some(*c),
            _ => None,
        })
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}
