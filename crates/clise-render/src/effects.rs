//! Brightness / contrast / saturation color matrices.

use clise_core::elements::ColorAdjustments;

// Rec. 709 luma weights.
const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

/// A 4x5 row-major color matrix over normalized RGBA.
///
/// Each output channel is `m[0]*r + m[1]*g + m[2]*b + m[3]*a + m[4]` for its
/// row; the fifth column is an offset in `0.0..=1.0` units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [f32; 20]);

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorMatrix {
    #[rustfmt::skip]
    pub const IDENTITY: ColorMatrix = ColorMatrix([
        1.0, 0.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]);

    /// Shift RGB by `amount` (`-1.0..=1.0`).
    #[rustfmt::skip]
    pub fn brightness(amount: f32) -> Self {
        let b = amount.clamp(-1.0, 1.0);
        ColorMatrix([
            1.0, 0.0, 0.0, 0.0, b,
            0.0, 1.0, 0.0, 0.0, b,
            0.0, 0.0, 1.0, 0.0, b,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ])
    }

    /// Scale RGB about mid-gray; `amount` in `-1.0..=1.0`, 0 is identity.
    #[rustfmt::skip]
    pub fn contrast(amount: f32) -> Self {
        let s = 1.0 + amount.clamp(-1.0, 1.0);
        let t = 0.5 * (1.0 - s);
        ColorMatrix([
            s,   0.0, 0.0, 0.0, t,
            0.0, s,   0.0, 0.0, t,
            0.0, 0.0, s,   0.0, t,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ])
    }

    /// Interpolate from grayscale (`-1.0`) through identity (`0.0`) to
    /// doubled saturation (`1.0`).
    #[rustfmt::skip]
    pub fn saturation(amount: f32) -> Self {
        let s = 1.0 + amount.clamp(-1.0, 1.0);
        let (r, g, b) = ((1.0 - s) * LUMA_R, (1.0 - s) * LUMA_G, (1.0 - s) * LUMA_B);
        ColorMatrix([
            r + s, g,     b,     0.0, 0.0,
            r,     g + s, b,     0.0, 0.0,
            r,     g,     b + s, 0.0, 0.0,
            0.0,   0.0,   0.0,   1.0, 0.0,
        ])
    }

    /// `self ∘ inner`: the matrix that applies `inner` first, then `self`.
    pub fn compose(&self, inner: &ColorMatrix) -> ColorMatrix {
        let a = &self.0;
        let b = &inner.0;
        let mut out = [0.0f32; 20];
        for row in 0..4 {
            for col in 0..5 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[row * 5 + k] * b[k * 5 + col];
                }
                if col == 4 {
                    sum += a[row * 5 + 4];
                }
                out[row * 5 + col] = sum;
            }
        }
        ColorMatrix(out)
    }

    /// The combined matrix for `adjustments`: saturation ∘ contrast ∘
    /// brightness. `None` when every adjustment is zero.
    pub fn from_adjustments(adjustments: &ColorAdjustments) -> Option<ColorMatrix> {
        if adjustments.is_identity() {
            return None;
        }
        let brightness = Self::brightness(adjustments.brightness as f32);
        let contrast = Self::contrast(adjustments.contrast as f32);
        let saturation = Self::saturation(adjustments.saturation as f32);
        Some(saturation.compose(&contrast.compose(&brightness)))
    }

    /// Transform one unpremultiplied color, clamping to `0.0..=1.0`.
    pub fn apply(&self, rgba: [f32; 4]) -> [f32; 4] {
        let m = &self.0;
        let mut out = [0.0f32; 4];
        for (row, value) in out.iter_mut().enumerate() {
            let r = &m[row * 5..row * 5 + 5];
            *value = (r[0] * rgba[0] + r[1] * rgba[1] + r[2] * rgba[2] + r[3] * rgba[3] + r[4]).clamp(0.0, 1.0);
        }
        out
    }

    /// Transform RGBA8 pixels in place.
    pub fn apply_to_rgba8(&self, pixels: &mut [u8], premultiplied: bool) {
        for px in pixels.chunks_exact_mut(4) {
            let alpha = px[3] as f32 / 255.0;
            let unpremul = |c: u8| {
                let c = c as f32 / 255.0;
                if premultiplied && alpha > 0.0 { (c / alpha).min(1.0) } else { c }
            };
            let [r, g, b, a] = self.apply([unpremul(px[0]), unpremul(px[1]), unpremul(px[2]), alpha]);
            let scale = if premultiplied { a } else { 1.0 };
            px[0] = (r * scale * 255.0).round() as u8;
            px[1] = (g * scale * 255.0).round() as u8;
            px[2] = (b * scale * 255.0).round() as u8;
            px[3] = (a * 255.0).round() as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 4], b: [f32; 4]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn test_zero_adjustments_are_identity() {
        assert!(ColorMatrix::from_adjustments(&ColorAdjustments::default()).is_none());
        let m = ColorMatrix::brightness(0.0)
            .compose(&ColorMatrix::contrast(0.0))
            .compose(&ColorMatrix::saturation(0.0));
        assert!(close(m.apply([0.2, 0.4, 0.6, 1.0]), [0.2, 0.4, 0.6, 1.0]));
    }

    #[test]
    fn test_full_desaturation_is_gray() {
        let [r, g, b, _] = ColorMatrix::saturation(-1.0).apply([1.0, 0.0, 0.0, 1.0]);
        assert!((r - LUMA_R).abs() < 1e-5);
        assert!((g - LUMA_R).abs() < 1e-5);
        assert!((b - LUMA_R).abs() < 1e-5);
    }

    #[test]
    fn test_composition_order() {
        // Brightness runs before contrast: 0.25 + 0.25 = 0.5 is the contrast pivot.
        let adjustments = ColorAdjustments {
            brightness: 0.25,
            contrast: 0.5,
            saturation: 0.0,
        };
        let m = ColorMatrix::from_adjustments(&adjustments).unwrap_or_default();
        assert!(close(m.apply([0.25, 0.25, 0.25, 1.0]), [0.5, 0.5, 0.5, 1.0]));
    }

    #[test]
    fn test_pixels_keep_alpha() {
        let mut pixels = [255u8, 0, 0, 128];
        ColorMatrix::brightness(0.0).apply_to_rgba8(&mut pixels, false);
        assert_eq!(pixels, [255, 0, 0, 128]);
    }
}
