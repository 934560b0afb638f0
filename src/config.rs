//! External configuration loader.
//!
//! Reads `config.toml` from the executable's directory (or CWD).
//! Falls back to sensible defaults if the file is missing or incomplete.
//!
//! The two historical game variants live entirely in this file: variant A
//! (12 levels, sequential reveal, run ends on the first mistake) is the
//! default; variant B (20 levels, single-flash countdown, play through)
//! is reachable by overriding `[rules]` and `[scoring]` keys.

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::scoring::{self, ScoreBand, Tier};
use crate::share::templates::StyleOverrides;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub rules: RulesConfig,
    pub timing: TimingConfig,
    pub bands: Vec<ScoreBand>,
    pub card: CardConfig,
}

#[derive(Clone, Copy, Debug)]
pub struct RulesConfig {
    /// Number of levels in a full run.
    pub max_level: u32,
    /// Digit count for level `n` is `n + digit_offset`.
    pub digit_offset: u32,
    /// Variant A ends the run on the first wrong answer; variant B
    /// plays through to `max_level` regardless.
    pub stop_on_first_mistake: bool,
    pub reveal_mode: RevealMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevealMode {
    /// One digit at a time at a fixed interval.
    Sequential,
    /// The whole number at once, masked after a countdown.
    SingleFlash,
}

#[derive(Clone, Copy, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    /// Sequential mode: one digit per this interval.
    pub digit_interval_ms: u64,
    /// Single-flash mode: how long the number stays visible.
    pub flash_duration_ms: u64,
    /// Pause between scoring feedback and the next level / results.
    pub feedback_delay_ms: u64,
    /// How long a validation message stays on screen.
    pub error_flash_ms: u64,
}

impl TimingConfig {
    /// Convert a millisecond duration to game-loop ticks, minimum 1.
    pub fn ticks(&self, ms: u64) -> u64 {
        (ms / self.tick_rate_ms.max(1)).max(1)
    }
}

#[derive(Clone, Debug)]
pub struct CardConfig {
    /// Template applied to generated share cards.
    pub template: String,
    /// Exported template JSON to import and use at startup.
    pub template_file: Option<PathBuf>,
    /// Per-field color/shape tweaks layered over the chosen template.
    pub overrides: Option<StyleOverrides>,
    /// Device pixel ratio: 2 renders a retina (2400×1260) card.
    pub pixel_ratio: u32,
    /// Directory where exported cards are written.
    pub output_dir: PathBuf,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    scoring: TomlScoring,
    #[serde(default)]
    card: TomlCard,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_max_level")]
    max_level: u32,
    #[serde(default = "default_digit_offset")]
    digit_offset: u32,
    #[serde(default = "default_stop_on_first_mistake")]
    stop_on_first_mistake: bool,
    #[serde(default = "default_reveal_mode")]
    reveal_mode: RevealMode,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_digit_interval")]
    digit_interval_ms: u64,
    #[serde(default = "default_flash_duration")]
    flash_duration_ms: u64,
    #[serde(default = "default_feedback_delay")]
    feedback_delay_ms: u64,
    #[serde(default = "default_error_flash")]
    error_flash_ms: u64,
}

#[derive(Deserialize, Debug, Default)]
struct TomlScoring {
    /// Override band table; empty = built-in variant-A bands.
    #[serde(default)]
    bands: Vec<TomlBand>,
}

#[derive(Deserialize, Debug)]
struct TomlBand {
    min_score: u32,
    tier: Tier,
    label: String,
}

#[derive(Deserialize, Debug)]
struct TomlCard {
    #[serde(default = "default_template")]
    template: String,
    template_file: Option<String>,
    overrides: Option<StyleOverrides>,
    #[serde(default = "default_pixel_ratio")]
    pixel_ratio: u32,
    #[serde(default = "default_output_dir")]
    output_dir: String,
}

// ── Defaults ──

fn default_max_level() -> u32 { 12 }
fn default_digit_offset() -> u32 { 1 }   // level 1 = 2 digits (variant A)
fn default_stop_on_first_mistake() -> bool { true }
fn default_reveal_mode() -> RevealMode { RevealMode::Sequential }

fn default_tick_rate() -> u64 { 100 }    // countdown sampled at 100ms
fn default_digit_interval() -> u64 { 1000 }
fn default_flash_duration() -> u64 { 5000 }
fn default_feedback_delay() -> u64 { 1500 }
fn default_error_flash() -> u64 { 2000 }

fn default_template() -> String { "classic".into() }
fn default_pixel_ratio() -> u32 { 1 }
fn default_output_dir() -> String { "cards".into() }

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            max_level: default_max_level(),
            digit_offset: default_digit_offset(),
            stop_on_first_mistake: default_stop_on_first_mistake(),
            reveal_mode: default_reveal_mode(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            digit_interval_ms: default_digit_interval(),
            flash_duration_ms: default_flash_duration(),
            feedback_delay_ms: default_feedback_delay(),
            error_flash_ms: default_error_flash(),
        }
    }
}

impl Default for TomlCard {
    fn default() -> Self {
        TomlCard {
            template: default_template(),
            template_file: None,
            overrides: None,
            pixel_ratio: default_pixel_ratio(),
            output_dir: default_output_dir(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        match load_toml(&candidate_dirs()) {
            Some(toml_cfg) => Self::from_toml(toml_cfg),
            None => Self::default_config(),
        }
    }

    pub fn default_config() -> Self {
        Self::from_toml(TomlConfig::default())
    }

    fn from_toml(toml_cfg: TomlConfig) -> Self {
        let bands = if toml_cfg.scoring.bands.is_empty() {
            scoring::default_bands()
        } else {
            let mut bands: Vec<ScoreBand> = toml_cfg
                .scoring
                .bands
                .into_iter()
                .map(|b| ScoreBand { min_score: b.min_score, tier: b.tier, label: b.label })
                .collect();
            // Band lookup scans top-down; keep the table sorted regardless
            // of how the file orders it.
            bands.sort_by(|a, b| b.min_score.cmp(&a.min_score));
            bands
        };

        GameConfig {
            rules: RulesConfig {
                max_level: toml_cfg.rules.max_level.max(1),
                digit_offset: toml_cfg.rules.digit_offset,
                stop_on_first_mistake: toml_cfg.rules.stop_on_first_mistake,
                reveal_mode: toml_cfg.rules.reveal_mode,
            },
            timing: TimingConfig {
                tick_rate_ms: toml_cfg.timing.tick_rate_ms.max(1),
                digit_interval_ms: toml_cfg.timing.digit_interval_ms,
                flash_duration_ms: toml_cfg.timing.flash_duration_ms,
                feedback_delay_ms: toml_cfg.timing.feedback_delay_ms,
                error_flash_ms: toml_cfg.timing.error_flash_ms,
            },
            bands,
            card: CardConfig {
                template: toml_cfg.card.template,
                template_file: toml_cfg.card.template_file.map(PathBuf::from),
                overrides: toml_cfg.card.overrides,
                pixel_ratio: toml_cfg.card.pixel_ratio.clamp(1, 4),
                output_dir: PathBuf::from(toml_cfg.card.output_dir),
            },
        }
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories. `None` means no
/// usable file was found and the defaults apply.
fn load_toml(search_dirs: &[PathBuf]) -> Option<TomlConfig> {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => return Some(cfg),
                Err(e) => {
                    eprintln!("Warning: config.toml parse error: {e}");
                    eprintln!("Using default settings.");
                    return None;
                }
            },
            Err(e) => {
                eprintln!("Warning: could not read {}: {e}", path.display());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_variant_a() {
        let cfg = GameConfig::default_config();
        assert_eq!(cfg.rules.max_level, 12);
        assert_eq!(cfg.rules.digit_offset, 1);
        assert!(cfg.rules.stop_on_first_mistake);
        assert_eq!(cfg.rules.reveal_mode, RevealMode::Sequential);
        assert_eq!(cfg.bands.len(), 4);
    }

    #[test]
    fn variant_b_expressible_in_toml() {
        let text = r#"
            [rules]
            max_level = 20
            digit_offset = 0
            stop_on_first_mistake = false
            reveal_mode = "single-flash"

            [[scoring.bands]]
            min_score = 840
            tier = "Excellent"
            label = "Excellent!"

            [[scoring.bands]]
            min_score = 600
            tier = "Good"
            label = "Good!"

            [[scoring.bands]]
            min_score = 0
            tier = "Beginner"
            label = "Normal!"
        "#;
        let cfg = GameConfig::from_toml(toml::from_str(text).unwrap());
        assert_eq!(cfg.rules.max_level, 20);
        assert!(!cfg.rules.stop_on_first_mistake);
        assert_eq!(cfg.rules.reveal_mode, RevealMode::SingleFlash);
        assert_eq!(cfg.bands[0].min_score, 840);
        assert_eq!(cfg.bands.last().unwrap().min_score, 0);
    }

    #[test]
    fn bands_sorted_descending_regardless_of_file_order() {
        let text = r#"
            [[scoring.bands]]
            min_score = 0
            tier = "Beginner"
            label = "low"

            [[scoring.bands]]
            min_score = 100
            tier = "Good"
            label = "high"
        "#;
        let cfg = GameConfig::from_toml(toml::from_str(text).unwrap());
        assert_eq!(cfg.bands[0].min_score, 100);
    }

    #[test]
    fn card_overrides_parse() {
        let text = r##"
            [card]
            template = "modern"
            pixel_ratio = 2

            [card.overrides]
            primary = "#123456"
        "##;
        let cfg = GameConfig::from_toml(toml::from_str(text).unwrap());
        assert_eq!(cfg.card.template, "modern");
        assert_eq!(cfg.card.pixel_ratio, 2);
        assert!(cfg.card.template_file.is_none());
        let overrides = cfg.card.overrides.unwrap();
        assert_eq!(overrides.primary.as_deref(), Some("#123456"));
        assert!(overrides.secondary.is_none());
    }

    #[test]
    fn ms_to_ticks() {
        let cfg = GameConfig::default_config();
        assert_eq!(cfg.timing.ticks(1000), 10);
        assert_eq!(cfg.timing.ticks(50), 1); // never rounds down to zero
    }
}
