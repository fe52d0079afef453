//! Hue/saturation/lightness adjustment of RGBA buffers.

use std::collections::HashMap;

use crate::pixel::Rgba;

/// A relative HSL shift.
///
/// `hue` is in degrees and wraps. `saturation` and `lightness` are added to
/// the 0..=1 channel values and clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HslAdjustment {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

impl HslAdjustment {
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.hue.rem_euclid(360.0) == 0.0 && self.saturation == 0.0 && self.lightness == 0.0
    }

    /// Adjust a single colour. Alpha is preserved.
    #[must_use]
    pub fn apply(&self, [r, g, b, a]: Rgba) -> Rgba {
        let (h, s, l) = rgb_to_hsl(r, g, b);
        let h = (h + self.hue).rem_euclid(360.0);
        let s = (s + self.saturation).clamp(0.0, 1.0);
        let l = (l + self.lightness).clamp(0.0, 1.0);
        let [r, g, b] = hsl_to_rgb(h, s, l);
        [r, g, b, a]
    }
}

/// Apply `adjustment` to every pixel of an RGBA8888 buffer in place.
///
/// Game art repeats a small set of colours, so results are cached per
/// distinct RGB value for the duration of the call.
pub fn adjust_hsl(rgba: &mut [u8], adjustment: HslAdjustment) {
    if adjustment.is_identity() {
        return;
    }

    let mut cache: HashMap<[u8; 3], [u8; 3]> = HashMap::new();
    for pixel in rgba.chunks_exact_mut(4) {
        let key = [pixel[0], pixel[1], pixel[2]];
        let rgb = *cache.entry(key).or_insert_with(|| {
            let [r, g, b, _] = adjustment.apply([key[0], key[1], key[2], 0xFF]);
            [r, g, b]
        });
        pixel[..3].copy_from_slice(&rgb);
    }
}

/// Convert RGB to `(hue degrees, saturation, lightness)`.
#[must_use]
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let delta = max - min;

    if delta == 0.0 {
        return (0.0, 0.0, l);
    }

    let s = if l > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let h = if max == r {
        (g - b) / delta + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    (h * 60.0, s, l)
}

/// Convert `(hue degrees, saturation, lightness)` back to RGB.
#[must_use]
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    if s == 0.0 {
        let v = to_channel(l);
        return [v, v, v];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    [
        to_channel(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_channel(hue_to_channel(p, q, h)),
        to_channel(hue_to_channel(p, q, h - 1.0 / 3.0)),
    ]
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_channel(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_hsl_primaries() {
        assert_eq!(rgb_to_hsl(255, 0, 0), (0.0, 1.0, 0.5));
        let (h, s, l) = rgb_to_hsl(0, 255, 0);
        assert!((h - 120.0).abs() < 1e-3 && (s - 1.0).abs() < 1e-6 && (l - 0.5).abs() < 1e-6);
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), [0, 0, 255]);
    }

    #[test]
    fn test_round_trip_preserves_colour() {
        for rgb in [[12, 200, 99], [255, 255, 255], [0, 0, 0], [128, 64, 32]] {
            let (h, s, l) = rgb_to_hsl(rgb[0], rgb[1], rgb[2]);
            assert_eq!(hsl_to_rgb(h, s, l), rgb);
        }
    }

    #[test]
    fn test_hue_shift_wraps() {
        let shift = HslAdjustment {
            hue: 480.0,
            ..HslAdjustment::default()
        };
        // Red shifted by 120 degrees is green.
        assert_eq!(shift.apply([255, 0, 0, 7]), [0, 255, 0, 7]);
    }

    #[test]
    fn test_lightness_clamps() {
        let brighten = HslAdjustment {
            lightness: 2.0,
            ..HslAdjustment::default()
        };
        assert_eq!(brighten.apply([10, 20, 30, 255]), [255, 255, 255, 255]);
    }

    #[test]
    fn test_adjust_buffer_preserves_alpha() {
        let mut rgba = vec![255, 0, 0, 10, 255, 0, 0, 200, 0, 0, 255, 0];
        adjust_hsl(
            &mut rgba,
            HslAdjustment {
                saturation: -1.0,
                ..HslAdjustment::default()
            },
        );
        assert_eq!(rgba, vec![128, 128, 128, 10, 128, 128, 128, 200, 128, 128, 128, 0]);
    }

    #[test]
    fn test_identity_is_noop() {
        let mut rgba = vec![1, 2, 3, 4];
        adjust_hsl(&mut rgba, HslAdjustment::default());
        assert_eq!(rgba, vec![1, 2, 3, 4]);
    }
}
