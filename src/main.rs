//! Entry point and game loop.

mod config;
mod domain;
mod game;
mod share;
mod ui;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use config::GameConfig;
use game::event::GameEvent;
use game::machine::DigitSpanGame;
use share::card::CardRenderer;
use share::dispatch::{self, Platform};
use share::record::{self, ShareRecord};
use share::templates::TemplateRegistry;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::view::{Screen, ViewState};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Longest answer we let the entry line grow to. The longest target in
/// any configuration is max_level + digit_offset digits.
const ENTRY_CAP: usize = 24;

fn main() {
    init_tracing();
    let config = GameConfig::load();

    let error_ticks = config.timing.ticks(config.timing.error_flash_ms) as u32;
    let mut view = ViewState::new(config.rules.max_level, error_ticks);
    let mut machine = DigitSpanGame::new(
        config.rules,
        config.timing,
        config.bands.clone(),
        StdRng::from_entropy(),
    );

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut view, &mut machine, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Digit Span Test!");
    println!("Final Score: {}", machine.state().total_score);
}

/// Logs go to a file: the alternate screen owns stdout. Enabled only
/// when RUST_LOG is set.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    if let Ok(file) = std::fs::File::create("digitspan.log") {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(file)
            .with_ansi(false)
            .try_init();
    }
}

fn game_loop(
    view: &mut ViewState,
    machine: &mut DigitSpanGame<StdRng>,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut share = ShareContext::new(config);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_keys(view, machine, &mut share, &kb, config) {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            let events = machine.tick(view);
            process_events(view, machine, &mut share, &events, config);
            view.tick();
            last_tick = Instant::now();
        }

        renderer.render(view)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_SAVE_CARD: &[KeyCode] = &[KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_SHARE_LINK: &[KeyCode] = &[KeyCode::Char('x'), KeyCode::Char('X')];
const KEYS_TEMPLATE: &[KeyCode] = &[KeyCode::Char('t'), KeyCode::Char('T')];
const KEYS_EXPORT: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E')];

/// Handle meta keys per screen. Returns true to quit.
fn handle_keys(
    view: &mut ViewState,
    machine: &mut DigitSpanGame<StdRng>,
    share: &mut ShareContext,
    kb: &InputState,
    config: &GameConfig,
) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM);
    let esc = kb.was_pressed(KeyCode::Esc);

    match view.screen {
        // ── Title Screen ──
        Screen::Title => {
            if confirm {
                let events = machine.start(view);
                process_events(view, machine, share, &events, config);
            } else if kb.any_pressed(KEYS_QUIT) || esc {
                return true;
            }
        }

        // ── Game Screen ──
        Screen::Game => {
            if esc {
                machine.abort(view);
                view.screen = Screen::Title;
                return false;
            }
            if view.input_enabled {
                for digit in kb.typed_digits() {
                    if view.entry.len() < ENTRY_CAP {
                        view.entry.push(digit);
                    }
                }
                if kb.was_pressed(KeyCode::Backspace) {
                    view.entry.pop();
                }
                if kb.was_pressed(KeyCode::Enter) {
                    let raw = view.entry.clone();
                    let events = machine.submit_answer(&raw, view);
                    process_events(view, machine, share, &events, config);
                }
            }
        }

        // ── Results Screen ──
        Screen::Results => {
            if confirm {
                let events = machine.start(view);
                process_events(view, machine, share, &events, config);
            } else if kb.any_pressed(KEYS_SAVE_CARD) {
                share.save_card(view);
            } else if kb.any_pressed(KEYS_SHARE_LINK) {
                share.show_link(view);
            } else if kb.any_pressed(KEYS_TEMPLATE) {
                share.cycle_template(view);
            } else if kb.any_pressed(KEYS_EXPORT) {
                share.export_template(view);
            } else if esc {
                view.screen = Screen::Title;
            } else if kb.any_pressed(KEYS_QUIT) {
                return true;
            }
        }
    }

    false
}

fn process_events(
    view: &mut ViewState,
    machine: &DigitSpanGame<StdRng>,
    share: &mut ShareContext,
    events: &[GameEvent],
    config: &GameConfig,
) {
    for event in events {
        match event {
            GameEvent::GameStarted => {
                info!("run started");
                view.set_message("Watch the digits…", 15);
            }
            GameEvent::AnswerScored { level, correct, score } => {
                info!(level, correct, score, "scored");
            }
            GameEvent::GameEnded { total_score } => {
                info!(total_score, "run ended");
                share.last = Some(record::compose(
                    &machine.state(),
                    config.rules.max_level,
                    machine.bands(),
                    machine.elapsed_ms(),
                ));
            }
            _ => {}
        }
    }
}

// ── Share hand-off ──

/// Card rendering and platform hand-off for the latest finished run.
struct ShareContext {
    registry: TemplateRegistry,
    renderer: CardRenderer,
    template: String,
    output_dir: PathBuf,
    last: Option<ShareRecord>,
    /// Index into `Platform::ALL`; repeated presses cycle platforms.
    platform_idx: usize,
}

impl ShareContext {
    fn new(config: &GameConfig) -> ShareContext {
        let mut registry = TemplateRegistry::new();
        let mut template = config.card.template.clone();

        // An exported template file takes precedence over the preset name
        if let Some(path) = &config.card.template_file {
            match std::fs::read_to_string(path) {
                Ok(json) => match registry.import(&json) {
                    Ok(imported) => template = imported.name.clone(),
                    Err(e) => warn!(path = %path.display(), "template import failed: {e}"),
                },
                Err(e) => warn!(path = %path.display(), "template file unreadable: {e}"),
            }
        }
        if let Some(overrides) = &config.card.overrides {
            template = registry.create_custom(&template, overrides.clone()).name.clone();
        }
        for p in registry.previews() {
            tracing::debug!(
                name = %p.name,
                display = %p.display_name,
                description = %p.description,
                palette = %format_args!("{}/{}/{}", p.primary, p.secondary, p.accent),
                "template available"
            );
        }

        let style = registry.get(&template).style.clone();
        ShareContext {
            registry,
            renderer: CardRenderer::new(style, config.card.pixel_ratio),
            template,
            output_dir: config.card.output_dir.clone(),
            last: None,
            platform_idx: 0,
        }
    }

    /// Render the card for the last run and write it under the
    /// configured output directory.
    fn save_card(&mut self, view: &mut ViewState) {
        let Some(record) = &self.last else {
            view.set_message("No finished run to share yet", 30);
            return;
        };
        let annotated = self.registry.render(&self.template, record);
        match self.renderer.generate(&annotated.record) {
            Ok(image) => {
                // The data URL lets the card be embedded without the file
                tracing::debug!(hash = %image.hash, data_url_bytes = image.data_url.len(), "card ready");
                match dispatch::save_card(&image, &self.output_dir) {
                    Ok(path) => view.set_message(&format!("Card saved: {}", path.display()), 60),
                    Err(e) => view.set_message(&format!("Save failed: {e}"), 60),
                }
            }
            Err(e) => view.set_message(&format!("Render failed: {e}"), 60),
        }
    }

    /// Switch the card look to the next registered template.
    fn cycle_template(&mut self, view: &mut ViewState) {
        let names = self.registry.names();
        let idx = names.iter().position(|n| *n == self.template).unwrap_or(0);
        let next = names[(idx + 1) % names.len()].clone();
        let template = self.registry.get(&next);
        let display = template.display_name.clone();
        self.renderer.set_style(template.style.clone());
        self.template = next;
        view.set_message(&format!("Card template: {display}"), 40);
    }

    /// Write the active template's JSON next to the cards, so the look
    /// can be shared or re-imported via `template_file`.
    fn export_template(&mut self, view: &mut ViewState) {
        let written = self.registry.export(&self.template).map_err(|e| e.to_string()).and_then(|json| {
            std::fs::create_dir_all(&self.output_dir).map_err(|e| e.to_string())?;
            let path = self.output_dir.join(format!("template-{}.json", self.template));
            std::fs::write(&path, json).map_err(|e| e.to_string())?;
            Ok(path)
        });
        match written {
            Ok(path) => view.set_message(&format!("Template exported: {}", path.display()), 60),
            Err(e) => view.set_message(&format!("Export failed: {e}"), 60),
        }
    }

    /// Surface a platform deep link for manual copy-paste. Repeated
    /// presses cycle X → Reddit → Facebook → LinkedIn.
    fn show_link(&mut self, view: &mut ViewState) {
        let Some(record) = &self.last else {
            view.set_message("No finished run to share yet", 30);
            return;
        };
        let platform = Platform::ALL[self.platform_idx % Platform::ALL.len()];
        self.platform_idx += 1;
        let link = format!("{}: {}", platform.label(), dispatch::share_url(platform, record));
        view.set_message(&link, 120);
    }
}
