//! Text element attributes and the glyph-metric heuristics shared by the
//! text renderer and hit-testing.
//!
//! Bounds come from a constant glyph advance rather than real font metrics,
//! so selection boxes are approximate for proportional fonts.

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Approximate advance of one glyph, as a fraction of the font size.
pub const GLYPH_ADVANCE_FACTOR: f64 = 0.6;

/// Line height used when the element does not specify one.
pub const DEFAULT_LINE_HEIGHT: f64 = 1.2;

/// Weights at or above this are drawn with simulated bold.
pub const BOLD_THRESHOLD: u16 = 600;

/// CSS-style numeric font weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FontWeightRepr", into = "u16")]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: FontWeight = FontWeight(400);
    pub const BOLD: FontWeight = FontWeight(700);

    /// Whether this weight should be rendered bold.
    pub fn is_bold(self) -> bool {
        self.0 >= BOLD_THRESHOLD
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        FontWeight::NORMAL
    }
}

impl From<FontWeight> for u16 {
    fn from(weight: FontWeight) -> Self {
        weight.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FontWeightRepr {
    Number(u16),
    Name(String),
}

impl From<FontWeightRepr> for FontWeight {
    fn from(repr: FontWeightRepr) -> Self {
        match repr {
            FontWeightRepr::Number(n) => FontWeight(n),
            FontWeightRepr::Name(name) => match name.trim().to_ascii_lowercase().as_str() {
                "bold" | "bolder" => FontWeight::BOLD,
                "light" | "lighter" => FontWeight(300),
                other => other.parse().map(FontWeight).unwrap_or(FontWeight::NORMAL),
            },
        }
    }
}

/// Decoration line drawn relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

/// Case transform applied before layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

fn default_font_family() -> String {
    "Inter".to_string()
}

fn default_font_size() -> f64 {
    16.0
}

/// Text-specific attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProps {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: FontWeight,
    #[serde(default)]
    pub text_decoration: TextDecoration,
    #[serde(default)]
    pub text_transform: TextTransform,
    /// Line height factor (multiplied by the font size).
    #[serde(default)]
    pub line_height: Option<f64>,
    #[serde(default)]
    pub letter_spacing: f64,
    /// Text color; falls back to the element fill when absent.
    #[serde(default)]
    pub color: Option<String>,
}

impl TextProps {
    /// Text attributes with default font settings.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            font_weight: FontWeight::NORMAL,
            text_decoration: TextDecoration::None,
            text_transform: TextTransform::None,
            line_height: None,
            letter_spacing: 0.0,
            color: None,
        }
    }

    /// Content after applying the case transform.
    pub fn display_text(&self) -> Cow<'_, str> {
        match self.text_transform {
            TextTransform::None => Cow::Borrowed(&self.text),
            TextTransform::Uppercase => Cow::Owned(self.text.to_uppercase()),
            TextTransform::Lowercase => Cow::Owned(self.text.to_lowercase()),
            TextTransform::Capitalize => Cow::Owned(capitalize_words(&self.text)),
        }
    }

    /// Line height factor, defaulting to [`DEFAULT_LINE_HEIGHT`].
    pub fn line_height_factor(&self) -> f64 {
        self.line_height
            .filter(|lh| lh.is_finite() && *lh > 0.0)
            .unwrap_or(DEFAULT_LINE_HEIGHT)
    }

    /// Approximate advance of one glyph at this font size.
    pub fn glyph_advance(&self) -> f64 {
        self.font_size * GLYPH_ADVANCE_FACTOR
    }

    /// Baseline of line `index` out of `line_count`, relative to the element top.
    ///
    /// The line-height factor only spaces lines apart; a single line sits at
    /// one font size below the top.
    pub fn baseline_offset(&self, index: usize, line_count: usize) -> f64 {
        if line_count <= 1 {
            self.font_size
        } else {
            self.font_size + index as f64 * self.line_height_factor() * self.font_size
        }
    }

    /// Estimated advance width of a single line.
    pub fn estimate_line_width(&self, line: &str) -> f64 {
        let chars = line.chars().count();
        if chars == 0 {
            return 0.0;
        }
        chars as f64 * self.glyph_advance() + (chars - 1) as f64 * self.letter_spacing
    }

    /// Estimated bounding box with the text's top-left at `(x, y)`.
    pub fn estimate_bounds(&self, x: f64, y: f64) -> Rect {
        let display = self.display_text();
        let lines: Vec<&str> = display.split('\n').collect();
        let width = lines
            .iter()
            .map(|line| self.estimate_line_width(line))
            .fold(0.0, f64::max)
            .max(1.0);
        let extra_lines = lines.len().saturating_sub(1) as f64;
        let height = self.font_size * DEFAULT_LINE_HEIGHT
            + extra_lines * self.line_height_factor() * self.font_size;
        Rect::new(x, y, x + width, y + height)
    }
}

fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.push(ch);
        }
    }
    out
}
