//! Presentation layer: double-buffered, diff-based terminal renderer.
//!
//! How it works:
//!   1. Build the next frame into `front` buffer (array of Cell)
//!   2. Compare each cell with `back` buffer (previous frame)
//!   3. Only emit terminal commands for cells that changed
//!   4. All commands are batched with `queue!`, flushed once at the end
//!   5. Swap front/back
//!
//! This eliminates flicker caused by full-screen redraws.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use thiserror::Error;

use crate::game::surface::BoxStatus;
use crate::share::font;

use super::view::{Screen, ViewState};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("terminal: {0}")]
    Io(#[from] io::Error),
}

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells.
    ///
    /// Using the SAME explicit RGB for both `Clear(ClearType::All)` and
    /// every cell's background keeps inter-row gap pixels on VTE-based
    /// terminals from showing as horizontal lines.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 20, b: 34 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer: differs from any
    /// real cell, so every position diffs dirty.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Cell {
        let bg = match bg {
            Color::Reset => Cell::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell::new(ch, fg, bg));
            cx += 1;
        }
    }

    fn put_str_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    /// Render `text` as big block glyphs from the card font, two
    /// terminal columns per font pixel so the aspect ratio holds up.
    fn put_big_str(&mut self, x: usize, y: usize, text: &str, fg: Color) {
        let mut pen = x;
        for ch in text.chars() {
            let rows = font::glyph(ch);
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..font::GLYPH_WIDTH as usize {
                    if bits & (1 << (font::GLYPH_WIDTH as usize - 1 - col)) != 0 {
                        let cx = pen + col * 2;
                        self.set(cx, y + row, Cell::new('█', fg, Cell::BASE_BG));
                        self.set(cx + 1, y + row, Cell::new('█', fg, Cell::BASE_BG));
                    }
                }
            }
            pen += font::ADVANCE as usize * 2;
        }
    }

    fn big_str_width(text: &str) -> usize {
        font::text_width(text, 1) as usize * 2
    }
}

// ── Renderer ──

/// Row layout for the game screen.
const HUD_ROW: usize = 0;
const BOXES_ROW: usize = 2;
const DISPLAY_ROW: usize = 5;
const ENTRY_ROW: usize = DISPLAY_ROW + 9;
const MESSAGE_ROW: usize = ENTRY_ROW + 2;

const HUD_BG: Color = Color::Rgb { r: 28, g: 30, b: 66 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<Screen>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
        }
    }

    pub fn init(&mut self) -> Result<(), SurfaceError> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> Result<(), SurfaceError> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn render(&mut self, view: &ViewState) -> Result<(), SurfaceError> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Screen change → clear for a clean transition
        if self.last_screen != Some(view.screen) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(view.screen);
        }

        self.front.clear();
        match view.screen {
            Screen::Title => self.compose_title(view),
            Screen::Game => self.compose_game(view),
            Screen::Results => self.compose_results(view),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors at start of frame. Not ResetColor: that
        // resets to the terminal's native default, which may differ from
        // BASE_BG and cause line artifacts.
        queue!(
            self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                let mut buf = [0u8; 4];
                queue!(self.writer, Print(&*cell.ch.encode_utf8(&mut buf)))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_title(&mut self, view: &ViewState) {
        let top = self.term_h / 5;
        let x = self.front.width.saturating_sub(FrameBuffer::big_str_width("DIGIT SPAN")) / 2;
        self.front.put_big_str(x, top, "DIGIT SPAN", Color::Cyan);

        self.front.put_str_centered(
            top + 9,
            "How many digits can you hold in mind?",
            Color::Grey,
            Color::Reset,
        );
        self.front.put_str_centered(
            top + 11,
            &format!("{} levels · the digit count grows every round", view.max_level),
            Color::DarkGrey,
            Color::Reset,
        );

        // Blink the prompt on the view's animation tick
        if view.anim_tick / 4 % 2 == 0 {
            self.front.put_str_centered(top + 14, "[Enter] Start", Color::Yellow, Color::Reset);
        }
        self.front.put_str_centered(top + 16, "[Q] Quit", Color::DarkGrey, Color::Reset);

        self.compose_message_bar(view, self.term_h.saturating_sub(2));
    }

    fn compose_game(&mut self, view: &ViewState) {
        let buf_w = self.front.width;

        // ── HUD row ──
        let hud = format!(" Level {:>2}/{}  Score: {:<5}", view.level, view.max_level, view.total_score);
        for x in 0..buf_w {
            self.front.set(x, HUD_ROW, Cell::new(' ', Color::White, HUD_BG));
        }
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Progress strip: one box per level ──
        let strip_w = view.boxes.len() * 3;
        let x0 = buf_w.saturating_sub(strip_w) / 2;
        for (i, status) in view.boxes.iter().enumerate() {
            let (ch, fg) = match status {
                BoxStatus::Neutral => ('□', Color::DarkGrey),
                BoxStatus::Current => ('■', Color::Yellow),
                BoxStatus::Correct => ('■', Color::Green),
                BoxStatus::Incorrect => ('■', Color::Red),
            };
            self.front.put_str(
                x0 + i * 3,
                BOXES_ROW,
                &format!("{ch} "),
                fg,
                Color::Reset,
            );
        }

        // ── Display area: the revealed digit(s), oversized ──
        if !view.display.is_empty() {
            let w = FrameBuffer::big_str_width(&view.display);
            let x = buf_w.saturating_sub(w) / 2;
            self.front.put_big_str(x, DISPLAY_ROW, &view.display, Color::Cyan);
        }

        // ── Countdown bar under a flashed number ──
        if let Some(remaining) = view.countdown {
            let bar_w = (buf_w / 2).max(10);
            let filled = (bar_w as f32 * remaining).round() as usize;
            let x = buf_w.saturating_sub(bar_w) / 2;
            for i in 0..bar_w {
                let (ch, fg) =
                    if i < filled { ('━', Color::Yellow) } else { ('─', Color::DarkGrey) };
                self.front.set(x + i, DISPLAY_ROW + 8, Cell::new(ch, fg, Color::Reset));
            }
        }

        // ── Entry line ──
        if view.input_enabled {
            let cursor = if view.anim_tick / 3 % 2 == 0 { '_' } else { ' ' };
            let entry = format!("Your answer: {}{}", view.entry, cursor);
            self.front.put_str_centered(ENTRY_ROW, &entry, Color::White, Color::Reset);
        } else if let Some(correct) = view.feedback {
            let (text, fg) = if correct {
                ("✓ Correct!", Color::Green)
            } else {
                ("✗ Wrong!", Color::Red)
            };
            self.front.put_str_centered(ENTRY_ROW, text, fg, Color::Reset);
        }

        self.compose_message_bar(view, MESSAGE_ROW);

        // ── Help bar ──
        let help = " Type digits  [Enter] Submit  [Backspace] Delete  [Esc] Title";
        let help_row = self.term_h.saturating_sub(1);
        self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_results(&mut self, view: &ViewState) {
        let Some(result) = &view.result else { return };
        let top = self.term_h / 6;

        self.front.put_str_centered(top, "— TEST COMPLETE —", Color::Grey, Color::Reset);

        let score = format!("{}", result.total_score);
        let x = self.front.width.saturating_sub(FrameBuffer::big_str_width(&score)) / 2;
        self.front.put_big_str(x, top + 2, &score, Color::Cyan);

        self.front.put_str_centered(top + 10, "points", Color::DarkGrey, Color::Reset);

        let tier_fg = match result.tier {
            crate::domain::scoring::Tier::Master => Color::Green,
            crate::domain::scoring::Tier::Excellent => Color::Cyan,
            crate::domain::scoring::Tier::Good => Color::Magenta,
            crate::domain::scoring::Tier::Beginner => Color::Grey,
        };
        self.front.put_str_centered(
            top + 12,
            &format!("[ {} ]", result.tier.as_str()),
            tier_fg,
            Color::Reset,
        );
        self.front.put_str_centered(top + 14, &result.label, Color::White, Color::Reset);

        self.front.put_str_centered(
            top + 17,
            "[Enter] Play Again   [S] Save Share Card   [X] Share Link",
            Color::Yellow,
            Color::Reset,
        );
        self.front.put_str_centered(
            top + 18,
            "[T] Card Template   [E] Export Template   [Esc] Title   [Q] Quit",
            Color::DarkGrey,
            Color::Reset,
        );

        self.compose_message_bar(view, self.term_h.saturating_sub(2));
    }

    fn compose_message_bar(&mut self, view: &ViewState, row: usize) {
        if view.message.is_empty() || row >= self.front.height {
            return;
        }
        let msg = format!(" ◈ {} ", view.message);
        for x in 0..self.front.width {
            self.front.set(x, row, Cell::new(' ', Color::Black, MSG_BG));
        }
        self.front.put_str(0, row, &msg, Color::Black, MSG_BG);
    }
}
