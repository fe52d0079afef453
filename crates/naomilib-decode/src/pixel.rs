//! Packed 16-bit pixel formats.
//!
//! Expansion to 8 bits per channel scales 5- and 6-bit channels by shifting
//! (a 5-bit 31 becomes 248) and 4-bit channels by multiplying by 17. Packing
//! truncates. One lossy trip through a packed format is therefore stable:
//! expanding, packing and expanding again yields the first expansion.

/// An RGBA8888 pixel, channels in `[r, g, b, a]` order.
pub type Rgba = [u8; 4];

/// Colour formats a texture header can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    Argb1555,
    Rgb565,
    Argb4444,
    /// Declared by some headers but never decoded.
    Rgb555,
    /// Declared by some headers but never decoded.
    Argb8888,
}

impl ColorFormat {
    /// Map a texture header format code. Unknown codes fall back to RGB555.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Argb1555,
            1 => Self::Rgb565,
            2 => Self::Argb4444,
            3 => Self::Argb8888,
            _ => Self::Rgb555,
        }
    }

    /// Whether pixels in this format can be converted.
    #[must_use]
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Argb1555 | Self::Rgb565 | Self::Argb4444)
    }

    /// Expand a packed pixel. Unsupported formats yield transparent black.
    #[must_use]
    pub fn to_rgba(self, value: u16) -> Rgba {
        match self {
            Self::Argb1555 => argb1555_to_rgba8888(value),
            Self::Rgb565 => rgb565_to_rgba8888(value),
            Self::Argb4444 => argb4444_to_rgba8888(value),
            Self::Rgb555 | Self::Argb8888 => [0, 0, 0, 0],
        }
    }

    /// Pack an RGBA pixel. Unsupported formats yield zero.
    #[must_use]
    pub fn from_rgba(self, pixel: Rgba) -> u16 {
        match self {
            Self::Argb1555 => rgba8888_to_argb1555(pixel),
            Self::Rgb565 => rgba8888_to_rgb565(pixel),
            Self::Argb4444 => rgba8888_to_argb4444(pixel),
            Self::Rgb555 | Self::Argb8888 => 0,
        }
    }
}

#[must_use]
pub fn rgb565_to_rgba8888(value: u16) -> Rgba {
    let r = ((value >> 11) & 0x1F) as u8;
    let g = ((value >> 5) & 0x3F) as u8;
    let b = (value & 0x1F) as u8;
    [r << 3, g << 2, b << 3, 0xFF]
}

#[must_use]
pub fn argb1555_to_rgba8888(value: u16) -> Rgba {
    let a = if value & 0x8000 != 0 { 0xFF } else { 0x00 };
    let r = ((value >> 10) & 0x1F) as u8;
    let g = ((value >> 5) & 0x1F) as u8;
    let b = (value & 0x1F) as u8;
    [r << 3, g << 3, b << 3, a]
}

#[must_use]
pub fn argb4444_to_rgba8888(value: u16) -> Rgba {
    let a = ((value >> 12) & 0xF) as u8;
    let r = ((value >> 8) & 0xF) as u8;
    let g = ((value >> 4) & 0xF) as u8;
    let b = (value & 0xF) as u8;
    [r * 0x11, g * 0x11, b * 0x11, a * 0x11]
}

#[must_use]
pub fn rgba8888_to_rgb565([r, g, b, _]: Rgba) -> u16 {
    (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3)
}

/// Alpha is thresholded at the midpoint.
#[must_use]
pub fn rgba8888_to_argb1555([r, g, b, a]: Rgba) -> u16 {
    let alpha = if a >= 0x80 { 0x8000 } else { 0 };
    alpha | (u16::from(r >> 3) << 10) | (u16::from(g >> 3) << 5) | u16::from(b >> 3)
}

#[must_use]
pub fn rgba8888_to_argb4444([r, g, b, a]: Rgba) -> u16 {
    (u16::from(a >> 4) << 12) | (u16::from(r >> 4) << 8) | (u16::from(g >> 4) << 4) | u16::from(b >> 4)
}
