//! Palette reduction applied before packing textures for some file kinds.
//!
//! Portrait and selection screen textures are drawn with a fixed number of
//! colours. Edited art must be reduced to that budget before it is written
//! back.

use crate::kmeans::{DEFAULT_ITERATIONS, kmeans};

/// Which kind of texture file a texture belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextureFileKind {
    /// Stage and polygon model textures. Never quantized.
    #[default]
    Stage,
    /// Character portrait sheets.
    Portrait,
    /// Character selection screen textures.
    SelectionScreen,
}

/// Colours allowed in a 64-wide, 64-tall portrait image.
pub const PORTRAIT_SMALL_COLORS: usize = 44;
/// Colours allowed in a 64-wide portrait image taller than 64 pixels.
pub const PORTRAIT_LARGE_COLORS: usize = 112;
/// Colours allowed in a selection screen texture.
pub const SELECTION_SCREEN_COLORS: usize = 504;

impl TextureFileKind {
    /// Colour budget for a `width × height` texture, or `None` when the
    /// texture is stored without palette reduction.
    #[must_use]
    pub fn palette_budget(self, width: u32, height: u32) -> Option<usize> {
        match self {
            Self::Stage => None,
            Self::Portrait => match (width, height) {
                (64, 64) => Some(PORTRAIT_SMALL_COLORS),
                (64, h) if h > 64 => Some(PORTRAIT_LARGE_COLORS),
                _ => None,
            },
            Self::SelectionScreen => Some(SELECTION_SCREEN_COLORS),
        }
    }
}

/// Reduce an RGBA8888 buffer to at most `colors` distinct colours in place.
///
/// Returns the number of colours in the result.
pub fn quantize_rgba(rgba: &mut [u8], colors: usize) -> usize {
    let points: Vec<[f32; 4]> = rgba
        .chunks_exact(4)
        .map(|p| [p[0], p[1], p[2], p[3]].map(f32::from))
        .collect();

    let clustering = kmeans(&points, colors, DEFAULT_ITERATIONS);
    let palette: Vec<[u8; 4]> = clustering
        .centroids
        .iter()
        .map(|c| c.map(|v| v.round().clamp(0.0, 255.0) as u8))
        .collect();

    for (pixel, &cluster) in rgba.chunks_exact_mut(4).zip(&clustering.assignments) {
        if let Some(color) = palette.get(cluster) {
            pixel.copy_from_slice(color);
        }
    }

    tracing::trace!(
        pixels = points.len(),
        budget = colors,
        palette = palette.len(),
        "quantized texture"
    );
    palette.len()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn distinct(rgba: &[u8]) -> usize {
        rgba.chunks_exact(4).collect::<HashSet<_>>().len()
    }

    #[test]
    fn test_palette_budgets() {
        let portrait = TextureFileKind::Portrait;
        assert_eq!(portrait.palette_budget(64, 64), Some(44));
        assert_eq!(portrait.palette_budget(64, 128), Some(112));
        assert_eq!(portrait.palette_budget(32, 64), None);
        assert_eq!(TextureFileKind::SelectionScreen.palette_budget(256, 256), Some(504));
        assert_eq!(TextureFileKind::Stage.palette_budget(64, 64), None);
    }

    #[test]
    fn test_quantize_reduces_colours() {
        let mut rgba: Vec<u8> = (0..=255u8).flat_map(|i| [i, 255 - i, i / 2, 255]).collect();
        assert_eq!(distinct(&rgba), 256);

        let palette = quantize_rgba(&mut rgba, 16);
        assert_eq!(palette, 16);
        assert!(distinct(&rgba) <= 16);
    }

    #[test]
    fn test_quantize_under_budget_is_exact() {
        let original: Vec<u8> = [[1, 2, 3, 4], [200, 100, 50, 255], [1, 2, 3, 4]]
            .into_iter()
            .flatten()
            .collect();
        let mut rgba = original.clone();
        assert_eq!(quantize_rgba(&mut rgba, 44), 2);
        assert_eq!(rgba, original);
    }
}
