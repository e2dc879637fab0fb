//! Color string resolution.

use super::bounded;
use lru::LruCache;
use peniko::Color;

/// Entries kept by each color cache.
pub const COLOR_CACHE_SIZE: usize = 200;

/// Resolved color: 8-bit channels plus float alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    pub fn to_color(self) -> Color {
        let alpha = (self.a.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::from_rgba8(self.r, self.g, self.b, alpha)
    }
}

impl From<Rgba> for Color {
    fn from(rgba: Rgba) -> Self {
        rgba.to_color()
    }
}

fn named_color(name: &str) -> Option<&'static str> {
    Some(match name {
        "black" => "#000000",
        "white" => "#ffffff",
        "red" => "#ff0000",
        "green" => "#008000",
        "lime" => "#00ff00",
        "blue" => "#0000ff",
        "yellow" => "#ffff00",
        "cyan" | "aqua" => "#00ffff",
        "magenta" | "fuchsia" => "#ff00ff",
        "gray" | "grey" => "#808080",
        "silver" => "#c0c0c0",
        "orange" => "#ffa500",
        "purple" => "#800080",
        "pink" => "#ffc0cb",
        "brown" => "#a52a2a",
        "navy" => "#000080",
        "teal" => "#008080",
        _ => return None,
    })
}

/// Parse `hex` and apply `opacity` as alpha, without caching.
///
/// Accepts `#rgb`, `#rrggbb` (leading `#` optional) and the basic CSS color
/// names. Anything else, including `transparent`, `none` and the empty
/// string, resolves to transparent black.
pub fn parse_hex(hex: &str, opacity: f64) -> Rgba {
    let trimmed = hex.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.is_empty() || lower == "transparent" || lower == "none" {
        return Rgba::TRANSPARENT;
    }
    let resolved = named_color(&lower).unwrap_or(&lower);
    let digits = resolved.strip_prefix('#').unwrap_or(resolved);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Rgba::TRANSPARENT;
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Rgba::TRANSPARENT,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).unwrap_or(0);
    let alpha = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
    Rgba::new(channel(0), channel(2), channel(4), alpha as f32)
}

/// Caches color string resolution and the derived [`Color`] handles.
#[derive(Debug)]
pub struct ColorCache {
    rgba: LruCache<String, Rgba>,
    handles: LruCache<String, Color>,
}

impl Default for ColorCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorCache {
    pub fn new() -> Self {
        Self {
            rgba: bounded(COLOR_CACHE_SIZE),
            handles: bounded(COLOR_CACHE_SIZE),
        }
    }

    fn key(hex: &str, opacity: f64) -> String {
        format!("{hex}_{opacity}")
    }

    /// Resolve `hex` at `opacity`, memoized.
    pub fn hex_to_rgba(&mut self, hex: &str, opacity: f64) -> Rgba {
        let key = Self::key(hex, opacity);
        if let Some(rgba) = self.rgba.peek(&key) {
            return *rgba;
        }
        let rgba = parse_hex(hex, opacity);
        if rgba.is_transparent() && !hex.trim().is_empty() {
            log::trace!("Color {hex:?} resolved to transparent");
        }
        self.rgba.push(key, rgba);
        rgba
    }

    /// Resolve `hex` at `opacity` to a [`Color`], memoized separately from
    /// the channel values.
    pub fn color(&mut self, hex: &str, opacity: f64) -> Color {
        let key = Self::key(hex, opacity);
        if let Some(color) = self.handles.peek(&key) {
            return *color;
        }
        let color = self.hex_to_rgba(hex, opacity).to_color();
        self.handles.push(key, color);
        color
    }

    /// Number of `(channel, handle)` entries.
    pub fn len(&self) -> (usize, usize) {
        (self.rgba.len(), self.handles.len())
    }

    pub fn clear(&mut self) {
        self.rgba.clear();
        self.handles.clear();
    }
}
