//! Share-card rendering: a fixed 1200×630 layout drawn from a
//! `ShareRecord`.
//!
//! The pipeline is deliberately stateless: identical records produce
//! byte-identical PNGs, which makes the render cache a plain map keyed
//! by the record's JSON serialization. The cache is unbounded — entries
//! are bounded by distinct score combinations in one session.

use std::collections::HashMap;
use std::f32::consts::PI;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use super::font;
use super::record::{ChartData, ShareRecord, DEFAULT_SUGGESTIONS};
use super::surface::{Color, DrawSurface, RasterSurface, Rect};
use super::templates::TemplateStyle;
use crate::domain::scoring::Tier;

pub const CARD_WIDTH: u32 = 1200;
pub const CARD_HEIGHT: u32 = 630;

const PADDING: f32 = 50.0;
const SECTION_SPACING: f32 = 30.0;

// Bitmap text scale per text role.
const TITLE_SCALE: u32 = 4;
const HEADING_SCALE: u32 = 2;
const SCORE_SCALE: u32 = 8;
const BODY_SCALE: u32 = 2;
const SMALL_SCALE: u32 = 1;

/// A finished render: PNG bytes plus the string forms callers share.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardImage {
    pub png: Vec<u8>,
    /// `data:image/png;base64,...`
    pub data_url: String,
    /// First 8 hex chars of the PNG's sha256, for filenames and dedup.
    pub hash: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("record fingerprint: {0}")]
    Fingerprint(#[from] serde_json::Error),
    #[error("png encode: {0}")]
    Encode(#[from] image::ImageError),
}

pub struct CardRenderer {
    style: TemplateStyle,
    pixel_ratio: u32,
    cache: HashMap<String, CardImage>,
}

impl CardRenderer {
    pub fn new(style: TemplateStyle, pixel_ratio: u32) -> CardRenderer {
        CardRenderer { style, pixel_ratio: pixel_ratio.clamp(1, 4), cache: HashMap::new() }
    }

    /// Swap the active style. Cached renders belong to the old style,
    /// so the cache goes with it.
    pub fn set_style(&mut self, style: TemplateStyle) {
        if style != self.style {
            self.style = style;
            self.cache.clear();
        }
    }

    #[cfg(test)]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Render `record`, or return the cached image for a field-for-field
    /// identical one.
    pub fn generate(&mut self, record: &ShareRecord) -> Result<CardImage, RenderError> {
        let key = serde_json::to_string(record)?;
        if let Some(hit) = self.cache.get(&key) {
            debug!(hash = %hit.hash, "card cache hit");
            return Ok(hit.clone());
        }

        let mut surface = RasterSurface::new(CARD_WIDTH, CARD_HEIGHT, self.pixel_ratio);
        draw_card(&mut surface, &self.style, record);

        let mut png = Vec::new();
        surface
            .into_image()
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;

        let hash = hex::encode(&Sha256::digest(&png)[..4]);
        let data_url = format!("data:image/png;base64,{}", BASE64.encode(&png));
        debug!(hash = %hash, bytes = png.len(), "card rendered");

        let image = CardImage { png, data_url, hash };
        self.cache.insert(key, image.clone());
        Ok(image)
    }
}

// ── Layout ──

fn color(hex: &str, fallback: Color) -> Color {
    Color::from_hex(hex).unwrap_or(fallback)
}

/// Draw the whole card. Order matters: later sections paint over
/// earlier ones.
pub fn draw_card(surface: &mut impl DrawSurface, style: &TemplateStyle, record: &ShareRecord) {
    draw_background(surface, style);
    draw_header(surface, style);

    let panel_w = (CARD_WIDTH as f32 - PADDING * 2.0 - SECTION_SPACING) / 2.0;
    let start_y = 130.0;
    draw_radar_panel(surface, style, PADDING + 20.0, start_y, panel_w, 200.0, &record.chart);
    draw_score_panel(
        surface,
        style,
        PADDING + 20.0 + panel_w + SECTION_SPACING,
        start_y,
        panel_w,
        200.0,
        record,
    );
    draw_suggestions_panel(
        surface,
        style,
        PADDING + 20.0,
        start_y + 220.0,
        CARD_WIDTH as f32 - PADDING * 2.0 - 40.0,
        150.0,
        &record.suggestions,
    );
    draw_footer(surface, style);
}

fn draw_background(surface: &mut impl DrawSurface, style: &TemplateStyle) {
    let full = Rect::new(0.0, 0.0, CARD_WIDTH as f32, CARD_HEIGHT as f32);
    let base = color(&style.background, Color::WHITE);
    match &style.background_gradient {
        Some([top, bottom]) => {
            surface.vertical_gradient(full, color(top, base), color(bottom, base));
        }
        None => surface.vertical_gradient(full, base, base),
    }
}

fn draw_header(surface: &mut impl DrawSurface, style: &TemplateStyle) {
    let text = color(&style.text, Color::rgb(0x1E, 0x29, 0x3B));
    let primary = color(&style.primary, Color::rgb(0x4F, 0x46, 0xE5));
    let y = PADDING + 20.0;

    // Round logo with the site monogram
    surface.circle(PADDING + 40.0, y + 15.0, 20.0, primary);
    surface.text_centered(PADDING + 40.0, y + 12.0, "DST", SMALL_SCALE, Color::WHITE);

    surface.text_centered(
        CARD_WIDTH as f32 / 2.0,
        y - 14.0,
        "Digit Span Test Results",
        TITLE_SCALE,
        text,
    );
}

fn panel(surface: &mut impl DrawSurface, style: &TemplateStyle, rect: Rect, title: &str) {
    let text = color(&style.text, Color::rgb(0x1E, 0x29, 0x3B));
    let radius = style.corner_radius as f32;
    if style.shadow {
        let shade = Rect::new(rect.x, rect.y + 4.0, rect.w, rect.h);
        surface.rounded_rect(shade, radius, Color::rgb(0, 0, 0).with_alpha(0x14));
    }
    surface.rounded_rect(rect, radius, Color::WHITE);
    surface.text(rect.x + 20.0, rect.y + 22.0, title, HEADING_SCALE, text);
}

fn draw_radar_panel(
    surface: &mut impl DrawSurface,
    style: &TemplateStyle,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    chart: &ChartData,
) {
    panel(surface, style, Rect::new(x, y, w, h), "Performance Metrics");
    draw_radar_chart(surface, style, x + w / 2.0, y + h / 2.0 + 10.0, 65.0, chart);
}

fn draw_radar_chart(
    surface: &mut impl DrawSurface,
    style: &TemplateStyle,
    cx: f32,
    cy: f32,
    size: f32,
    chart: &ChartData,
) {
    let grid = Color::rgb(0xE2, 0xE8, 0xF0);
    let primary = color(&style.primary, Color::rgb(0x4F, 0x46, 0xE5));
    let secondary = color(&style.secondary, Color::rgb(0x8B, 0x5C, 0xF6));
    let label_color = color(&style.text_secondary, Color::rgb(0x64, 0x74, 0x8B));

    let metrics: [(&str, u32, f32); 3] = [
        ("Memory", chart.memory, 0.0),
        ("Attention", chart.attention, 2.0 * PI / 3.0),
        ("Speed", chart.speed, 4.0 * PI / 3.0),
    ];

    // Concentric grid rings, then one spoke per axis
    for i in 1..=4 {
        surface.ring(cx, cy, size / 4.0 * i as f32, grid);
    }
    for (_, _, angle) in metrics {
        surface.line(cx, cy, cx + angle.cos() * size, cy + angle.sin() * size, grid);
    }

    let points: Vec<(f32, f32)> = metrics
        .iter()
        .map(|(_, value, angle)| {
            let r = size * (*value).min(100) as f32 / 100.0;
            (cx + angle.cos() * r, cy + angle.sin() * r)
        })
        .collect();
    surface.polygon(&points, primary.with_alpha(0x40), secondary.with_alpha(0x40), primary);

    for (label, _, angle) in metrics {
        let r = size + 25.0;
        surface.text_centered(
            cx + angle.cos() * r,
            cy + angle.sin() * r - 3.0,
            label,
            SMALL_SCALE,
            label_color,
        );
    }
}

fn tier_color(style: &TemplateStyle, tier: Tier) -> Color {
    let muted = color(&style.text_muted, Color::rgb(0x94, 0xA3, 0xB8));
    match tier {
        Tier::Master => color(&style.accent, muted),
        Tier::Excellent => color(&style.primary, muted),
        Tier::Good => color(&style.secondary, muted),
        Tier::Beginner => muted,
    }
}

fn draw_score_panel(
    surface: &mut impl DrawSurface,
    style: &TemplateStyle,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    record: &ShareRecord,
) {
    panel(surface, style, Rect::new(x, y, w, h), "Your Score");
    let primary = color(&style.primary, Color::rgb(0x4F, 0x46, 0xE5));
    let secondary = color(&style.text_secondary, Color::rgb(0x64, 0x74, 0x8B));
    let cx = x + w / 2.0;

    surface.text_centered(cx, y + 62.0, &record.score.to_string(), SCORE_SCALE, primary);

    // Tier badge
    let badge = tier_color(style, record.tier);
    surface.rounded_rect(Rect::new(cx - 60.0, y + 130.0 - 18.0, 120.0, 36.0), 18.0, badge);
    surface.text_centered(cx, y + 123.0, record.tier.as_str(), BODY_SCALE, Color::WHITE);

    let line = format!("Top {}% of users", 100 - record.percentile.min(95));
    surface.text_centered(cx, y + 166.0, &line, SMALL_SCALE, secondary);
}

fn draw_suggestions_panel(
    surface: &mut impl DrawSurface,
    style: &TemplateStyle,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    suggestions: &[String],
) {
    panel(surface, style, Rect::new(x, y, w, h), "Improvement Tips");
    let accent = color(&style.accent, Color::rgb(0x10, 0xB9, 0x81));
    let body = color(&style.text_secondary, Color::rgb(0x64, 0x74, 0x8B));

    let defaults: Vec<String>;
    let items: &[String] = if suggestions.is_empty() {
        defaults = DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
        &defaults
    } else {
        suggestions
    };

    let line_height = 34.0;
    for (i, item) in items.iter().take(3).enumerate() {
        let item_y = y + 55.0 + i as f32 * line_height;
        surface.circle(x + 24.0, item_y + 7.0, 3.0, accent);
        let text = truncate_to_width(item, w - 60.0, BODY_SCALE);
        surface.text(x + 40.0, item_y, &text, BODY_SCALE, body);
    }
}

fn draw_footer(surface: &mut impl DrawSurface, style: &TemplateStyle) {
    let muted = color(&style.text_muted, Color::rgb(0x94, 0xA3, 0xB8));
    let primary = color(&style.primary, Color::rgb(0x4F, 0x46, 0xE5));
    let accent = color(&style.accent, Color::rgb(0x10, 0xB9, 0x81));
    let cx = CARD_WIDTH as f32 / 2.0;
    let y = CARD_HEIGHT as f32 - 80.0;

    cta_pill(surface, cx - 160.0, y - 45.0, "Take the Test", primary);
    cta_pill(surface, cx + 160.0, y - 45.0, "Share Result", accent);
    surface.text_centered(cx, y - 7.0, "digitspantest.online", BODY_SCALE, muted);
}

fn cta_pill(surface: &mut impl DrawSurface, cx: f32, cy: f32, label: &str, fill: Color) {
    surface.rounded_rect(Rect::new(cx - 90.0, cy - 22.0, 180.0, 44.0), 22.0, fill);
    surface.text_centered(cx, cy - 7.0, label, BODY_SCALE, Color::WHITE);
}

/// Shrink character by character until the text plus an ellipsis fits.
fn truncate_to_width(text: &str, max_width: f32, scale: u32) -> String {
    if font::text_width(text, scale) as f32 <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "…";
        if font::text_width(&candidate, scale) as f32 <= max_width {
            return candidate;
        }
    }
    "…".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::templates::TemplateRegistry;

    fn record(score: u32) -> ShareRecord {
        ShareRecord {
            score,
            tier: Tier::Good,
            percentile: 40,
            error_rate: 8,
            completion_time: "3:05".into(),
            suggestions: vec![],
            chart: ChartData { memory: 40, attention: 33, speed: 50 },
        }
    }

    fn renderer() -> CardRenderer {
        let reg = TemplateRegistry::new();
        CardRenderer::new(reg.get("classic").style.clone(), 1)
    }

    #[test]
    fn identical_records_hit_the_cache() {
        let mut r = renderer();
        let a = r.generate(&record(200)).unwrap();
        let b = r.generate(&record(200)).unwrap();
        assert_eq!(a.data_url, b.data_url);
        assert_eq!(a.png, b.png);
        assert_eq!(r.cache_len(), 1);
    }

    #[test]
    fn different_records_render_separately() {
        let mut r = renderer();
        let a = r.generate(&record(200)).unwrap();
        let b = r.generate(&record(205)).unwrap();
        assert_ne!(a.data_url, b.data_url);
        assert_eq!(r.cache_len(), 2);
    }

    #[test]
    fn output_is_a_png_data_url() {
        let mut r = renderer();
        let img = r.generate(&record(95)).unwrap();
        assert!(img.data_url.starts_with("data:image/png;base64,"));
        assert_eq!(&img.png[..4], b"\x89PNG");
        assert_eq!(img.hash.len(), 8);
    }

    #[test]
    fn pixel_ratio_doubles_dimensions() {
        let reg = TemplateRegistry::new();
        let mut r = CardRenderer::new(reg.get("classic").style.clone(), 2);
        let img = r.generate(&record(150)).unwrap();
        let decoded = image::load_from_memory(&img.png).unwrap();
        assert_eq!(decoded.width(), 2400);
        assert_eq!(decoded.height(), 1260);
    }

    #[test]
    fn style_change_invalidates_cache() {
        let reg = TemplateRegistry::new();
        let mut r = renderer();
        let classic = r.generate(&record(300)).unwrap();
        r.set_style(reg.get("minimal").style.clone());
        assert_eq!(r.cache_len(), 0);
        let minimal = r.generate(&record(300)).unwrap();
        assert_ne!(classic.png, minimal.png);
    }

    #[test]
    fn truncation_appends_ellipsis() {
        let long = "Continue training to improve memory capacity and then some";
        let out = truncate_to_width(long, 120.0, 2);
        assert!(out.ends_with('…'));
        assert!(font::text_width(&out, 2) as f32 <= 120.0);

        assert_eq!(truncate_to_width("short", 1000.0, 2), "short");
    }

    /// Order-sensitive backend: records each operation name.
    #[derive(Default)]
    struct RecordingSurface {
        ops: Vec<String>,
    }

    impl DrawSurface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (CARD_WIDTH, CARD_HEIGHT)
        }
        fn vertical_gradient(&mut self, rect: Rect, _: Color, _: Color) {
            self.ops.push(format!("gradient {}x{}", rect.w, rect.h));
        }
        fn rounded_rect(&mut self, _: Rect, radius: f32, _: Color) {
            self.ops.push(format!("rounded_rect r{radius}"));
        }
        fn circle(&mut self, _: f32, _: f32, _: f32, _: Color) {
            self.ops.push("circle".into());
        }
        fn ring(&mut self, _: f32, _: f32, _: f32, _: Color) {
            self.ops.push("ring".into());
        }
        fn line(&mut self, _: f32, _: f32, _: f32, _: f32, _: Color) {
            self.ops.push("line".into());
        }
        fn polygon(&mut self, points: &[(f32, f32)], _: Color, _: Color, _: Color) {
            self.ops.push(format!("polygon {}", points.len()));
        }
        fn text(&mut self, _: f32, _: f32, text: &str, _: u32, _: Color) {
            self.ops.push(format!("text {text}"));
        }
    }

    #[test]
    fn draw_order_background_first_footer_last() {
        let reg = TemplateRegistry::new();
        let mut s = RecordingSurface::default();
        draw_card(&mut s, &reg.get("classic").style, &record(120));

        assert_eq!(s.ops[0], "gradient 1200x630");
        assert!(s.ops.contains(&"polygon 3".to_string()));
        // Four grid rings before the data polygon
        let first_ring = s.ops.iter().position(|o| o == "ring").unwrap();
        let poly = s.ops.iter().position(|o| o.starts_with("polygon")).unwrap();
        assert!(first_ring < poly);
        // Footer site label is the last text drawn
        let last_text = s.ops.iter().rev().find(|o| o.starts_with("text")).unwrap();
        assert_eq!(last_text, "text digitspantest.online");
    }

    #[test]
    fn panel_radius_follows_the_template() {
        let reg = TemplateRegistry::new();

        let mut sharp = RecordingSurface::default();
        draw_card(&mut sharp, &reg.get("minimal").style, &record(120));
        assert!(sharp.ops.contains(&"rounded_rect r0".to_string()));

        let mut soft = RecordingSurface::default();
        draw_card(&mut soft, &reg.get("classic").style, &record(120));
        assert!(soft.ops.contains(&"rounded_rect r12".to_string()));
        assert!(!soft.ops.contains(&"rounded_rect r16".to_string()));
    }

    #[test]
    fn empty_suggestions_fall_back_to_defaults() {
        let reg = TemplateRegistry::new();
        let mut s = RecordingSurface::default();
        draw_card(&mut s, &reg.get("classic").style, &record(120));
        assert!(s
            .ops
            .iter()
            .any(|o| o.starts_with("text Continue training")));
    }
}
