//! Drawing surface for card rendering.
//!
//! `DrawSurface` is the capability the layout code draws against; the
//! shipped backend rasterizes into an RGBA buffer. Coordinates are
//! logical 1200×630 pixels, scaled by the device pixel ratio inside the
//! backend, so layout code never sees the output resolution.

use image::RgbaImage;

use super::font;

/// sRGB color with straight alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 0xFF, g: 0xFF, b: 0xFF, a: 0xFF };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 0xFF }
    }

    /// Parse `#rrggbb` (or `#rrggbbaa`). Returns None on anything else.
    pub fn from_hex(s: &str) -> Option<Color> {
        let hex = s.strip_prefix('#')?;
        let bytes = hex::decode(hex).ok()?;
        match bytes[..] {
            [r, g, b] => Some(Color::rgb(r, g, b)),
            [r, g, b, a] => Some(Color { r, g, b, a }),
            _ => None,
        }
    }

    pub fn with_alpha(self, a: u8) -> Color {
        Color { a, ..self }
    }

    /// Linear interpolation, `t` clamped to [0, 1].
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

/// Axis-aligned rectangle in logical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect { x, y, w, h }
    }
}

/// What the card layout needs from a backend. Everything takes logical
/// coordinates; implementations own the pixel-ratio scaling.
pub trait DrawSurface {
    /// Logical size, (width, height).
    fn size(&self) -> (u32, u32);

    /// Top-to-bottom linear gradient across `rect`.
    fn vertical_gradient(&mut self, rect: Rect, top: Color, bottom: Color);

    fn rounded_rect(&mut self, rect: Rect, radius: f32, fill: Color);

    fn circle(&mut self, cx: f32, cy: f32, radius: f32, fill: Color);

    /// 1-logical-pixel stroked circle (radar grid rings).
    fn ring(&mut self, cx: f32, cy: f32, radius: f32, stroke: Color);

    fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, stroke: Color);

    /// Closed polygon filled with a diagonal gradient and stroked with
    /// `stroke` (radar data polygon).
    fn polygon(&mut self, points: &[(f32, f32)], fill_a: Color, fill_b: Color, stroke: Color);

    /// Bitmap text, top-left anchored at (x, y).
    fn text(&mut self, x: f32, y: f32, text: &str, scale: u32, color: Color);

    /// Bitmap text centered horizontally on `cx`.
    fn text_centered(&mut self, cx: f32, y: f32, text: &str, scale: u32, color: Color) {
        let half = font::text_width(text, scale) as f32 / 2.0;
        self.text(cx - half, y, text, scale, color);
    }
}

// ── Raster backend ──

pub struct RasterSurface {
    img: RgbaImage,
    width: u32,
    height: u32,
    /// Device pixel ratio. 2 doubles the output resolution.
    dpr: u32,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, pixel_ratio: u32) -> RasterSurface {
        let dpr = pixel_ratio.max(1);
        RasterSurface {
            img: RgbaImage::from_pixel(width * dpr, height * dpr, image::Rgba([0, 0, 0, 0xFF])),
            width,
            height,
            dpr,
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.img
    }

    /// Source-over blend of one device pixel.
    fn blend(&mut self, x: i64, y: i64, c: Color) {
        if c.a == 0 || x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.img.width() || y >= self.img.height() {
            return;
        }
        if c.a == 0xFF {
            self.img.put_pixel(x, y, image::Rgba([c.r, c.g, c.b, 0xFF]));
            return;
        }
        let dst = self.img.get_pixel(x, y).0;
        let a = c.a as u32;
        let inv = 255 - a;
        let over = |s: u8, d: u8| ((s as u32 * a + d as u32 * inv + 127) / 255) as u8;
        self.img.put_pixel(
            x,
            y,
            image::Rgba([over(c.r, dst[0]), over(c.g, dst[1]), over(c.b, dst[2]), 0xFF]),
        );
    }

    /// Iterate the device pixels covered by a logical rect.
    fn device_bounds(&self, rect: Rect) -> (i64, i64, i64, i64) {
        let d = self.dpr as f32;
        (
            (rect.x * d).floor() as i64,
            (rect.y * d).floor() as i64,
            ((rect.x + rect.w) * d).ceil() as i64,
            ((rect.y + rect.h) * d).ceil() as i64,
        )
    }
}

/// Distance from a point to a rounded rect's edge, negative inside.
fn rounded_rect_sdf(px: f32, py: f32, rect: Rect, radius: f32) -> f32 {
    let r = radius.min(rect.w / 2.0).min(rect.h / 2.0);
    let cx = rect.x + rect.w / 2.0;
    let cy = rect.y + rect.h / 2.0;
    let qx = (px - cx).abs() - (rect.w / 2.0 - r);
    let qy = (py - cy).abs() - (rect.h / 2.0 - r);
    let ox = qx.max(0.0);
    let oy = qy.max(0.0);
    (ox * ox + oy * oy).sqrt() + qx.max(qy).min(0.0) - r
}

/// Even-odd point-in-polygon test.
fn point_in_polygon(px: f32, py: f32, points: &[(f32, f32)]) -> bool {
    let mut inside = false;
    let n = points.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

impl DrawSurface for RasterSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn vertical_gradient(&mut self, rect: Rect, top: Color, bottom: Color) {
        let (x0, y0, x1, y1) = self.device_bounds(rect);
        let span = (y1 - y0).max(1) as f32;
        for y in y0..y1 {
            let c = top.lerp(bottom, (y - y0) as f32 / span);
            for x in x0..x1 {
                self.blend(x, y, c);
            }
        }
    }

    fn rounded_rect(&mut self, rect: Rect, radius: f32, fill: Color) {
        let (x0, y0, x1, y1) = self.device_bounds(rect);
        let d = self.dpr as f32;
        for y in y0..y1 {
            for x in x0..x1 {
                let px = (x as f32 + 0.5) / d;
                let py = (y as f32 + 0.5) / d;
                if rounded_rect_sdf(px, py, rect, radius) <= 0.0 {
                    self.blend(x, y, fill);
                }
            }
        }
    }

    fn circle(&mut self, cx: f32, cy: f32, radius: f32, fill: Color) {
        let r = Rect::new(cx - radius, cy - radius, radius * 2.0, radius * 2.0);
        let (x0, y0, x1, y1) = self.device_bounds(r);
        let d = self.dpr as f32;
        for y in y0..y1 {
            for x in x0..x1 {
                let px = (x as f32 + 0.5) / d - cx;
                let py = (y as f32 + 0.5) / d - cy;
                if px * px + py * py <= radius * radius {
                    self.blend(x, y, fill);
                }
            }
        }
    }

    fn ring(&mut self, cx: f32, cy: f32, radius: f32, stroke: Color) {
        let outer = radius + 0.5;
        let r = Rect::new(cx - outer, cy - outer, outer * 2.0, outer * 2.0);
        let (x0, y0, x1, y1) = self.device_bounds(r);
        let d = self.dpr as f32;
        for y in y0..y1 {
            for x in x0..x1 {
                let px = (x as f32 + 0.5) / d - cx;
                let py = (y as f32 + 0.5) / d - cy;
                let dist = (px * px + py * py).sqrt();
                if (dist - radius).abs() <= 0.5 {
                    self.blend(x, y, stroke);
                }
            }
        }
    }

    fn line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, stroke: Color) {
        let d = self.dpr as f32;
        let (dx, dy) = (x1 - x0, y1 - y0);
        let steps = ((dx.abs().max(dy.abs())) * d).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = ((x0 + dx * t) * d).round() as i64;
            let y = ((y0 + dy * t) * d).round() as i64;
            for oy in 0..self.dpr as i64 {
                for ox in 0..self.dpr as i64 {
                    self.blend(x + ox, y + oy, stroke);
                }
            }
        }
    }

    fn polygon(&mut self, points: &[(f32, f32)], fill_a: Color, fill_b: Color, stroke: Color) {
        if points.len() < 3 {
            return;
        }
        let min_x = points.iter().map(|p| p.0).fold(f32::MAX, f32::min);
        let min_y = points.iter().map(|p| p.1).fold(f32::MAX, f32::min);
        let max_x = points.iter().map(|p| p.0).fold(f32::MIN, f32::max);
        let max_y = points.iter().map(|p| p.1).fold(f32::MIN, f32::max);
        let bounds = Rect::new(min_x, min_y, max_x - min_x, max_y - min_y);
        let (x0, y0, x1, y1) = self.device_bounds(bounds);
        let d = self.dpr as f32;
        let span = ((max_x - min_x) + (max_y - min_y)).max(1.0);
        for y in y0..y1 {
            for x in x0..x1 {
                let px = (x as f32 + 0.5) / d;
                let py = (y as f32 + 0.5) / d;
                if point_in_polygon(px, py, points) {
                    // Diagonal gradient across the bounding box
                    let t = ((px - min_x) + (py - min_y)) / span;
                    self.blend(x, y, fill_a.lerp(fill_b, t));
                }
            }
        }
        for i in 0..points.len() {
            let (ax, ay) = points[i];
            let (bx, by) = points[(i + 1) % points.len()];
            self.line(ax, ay, bx, by, stroke);
        }
    }

    fn text(&mut self, x: f32, y: f32, text: &str, scale: u32, color: Color) {
        let cell = (scale * self.dpr) as i64;
        let d = self.dpr as f32;
        let mut pen_x = (x * d).round() as i64;
        let pen_y = (y * d).round() as i64;
        for ch in text.chars() {
            let rows = font::glyph(ch);
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..font::GLYPH_WIDTH {
                    if bits & (1 << (font::GLYPH_WIDTH - 1 - col)) != 0 {
                        let bx = pen_x + col as i64 * cell;
                        let by = pen_y + row as i64 * cell;
                        for oy in 0..cell {
                            for ox in 0..cell {
                                self.blend(bx + ox, by + oy, color);
                            }
                        }
                    }
                }
            }
            pen_x += font::ADVANCE as i64 * cell;
        }
    }
}
