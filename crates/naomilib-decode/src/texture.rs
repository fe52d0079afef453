//! Texture header table and texture pixel decoding.
//!
//! The polygon file carries a table of 16-byte texture headers. Pixel data
//! lives in a separate texture file, addressed by runtime pointers relative
//! to the first texture's base location.

use crate::address::{
    TEXTURE_TABLE_END_POINTER, TEXTURE_TABLE_START_POINTER, resolve_model_ram_offset,
    to_file_offset,
};
use crate::error::{DecodeError, DecodeResult};
use crate::morton::twiddled_index;
use crate::pixel::ColorFormat;
use crate::reader::{Field, Primitive, read_u16, read_u32};

/// Size of one texture header record.
pub const TEXTURE_HEADER_SIZE: usize = 0x10;

/// Largest width or height the hardware can sample.
pub const MAX_TEXTURE_DIMENSION: u32 = 1024;

mod layout {
    use super::{Field, Primitive};

    pub const WIDTH: Field = Field::new(0x00, Primitive::U16);
    pub const HEIGHT: Field = Field::new(0x02, Primitive::U16);
    pub const FORMAT: Field = Field::new(0x04, Primitive::U8);
    pub const TYPE: Field = Field::new(0x05, Primitive::U8);
    pub const BASE_LOCATION: Field = Field::new(0x08, Primitive::U32);
}

/// One entry of the texture header table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDef {
    /// Position in the table; meshes refer to textures by this index.
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub color_format: ColorFormat,
    pub texture_type: u8,
    /// Runtime address of the pixel data.
    pub base_location: u32,
    /// Runtime address the texture file is loaded at.
    pub ram_offset: u32,
}

impl TextureDef {
    /// Offset of the pixel data inside the texture file, if it lies after
    /// the load address.
    #[must_use]
    pub fn file_offset(&self) -> Option<usize> {
        to_file_offset(self.base_location, self.ram_offset).ok()
    }

    /// Bytes of packed pixel data.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * 2
    }

    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether both sides are powers of two no larger than
    /// [`MAX_TEXTURE_DIMENSION`].
    #[must_use]
    pub fn has_valid_dimensions(&self) -> bool {
        is_valid_dimension(self.width) && is_valid_dimension(self.height)
    }

    /// Refuse definitions whose pixel data could not be a real texture.
    pub fn check_dimensions(&self) -> DecodeResult<()> {
        if self.has_valid_dimensions() {
            Ok(())
        } else {
            Err(DecodeError::invalid(
                "texture dimensions",
                format!("texture {} is {}x{}", self.index, self.width, self.height),
            ))
        }
    }

    /// Whether the whole texture lies inside a buffer of `len` bytes.
    #[must_use]
    pub fn fits_in(&self, len: usize) -> bool {
        self.file_offset()
            .and_then(|offset| offset.checked_add(self.byte_len()))
            .is_some_and(|end| end <= len)
    }
}

fn is_valid_dimension(side: u32) -> bool {
    side.is_power_of_two() && side <= MAX_TEXTURE_DIMENSION
}

/// Read the texture header table referenced by a polygon file header.
///
/// A file without a texture table (null start pointer) yields no textures.
pub fn scan_texture_table(buf: &[u8]) -> DecodeResult<Vec<TextureDef>> {
    let ram_offset = resolve_model_ram_offset(buf)?;
    let start_pointer = read_u32(buf, TEXTURE_TABLE_START_POINTER)?;
    if start_pointer == 0 {
        tracing::debug!("polygon file has no texture table");
        return Ok(Vec::new());
    }

    let start = to_file_offset(start_pointer, ram_offset)?;
    let end = to_file_offset(read_u32(buf, TEXTURE_TABLE_END_POINTER)?, ram_offset)?;
    scan_texture_headers(buf, start, end)
}

/// Scan 16-byte texture headers in `[start, end)`.
///
/// Scanning stops at the first entry with a zero width, or at the first
/// entry whose dimensions are not powers of two up to
/// [`MAX_TEXTURE_DIMENSION`]. An entry with a zero height is taken to be
/// square. Every definition shares the first entry's base location as its
/// `ram_offset`.
pub fn scan_texture_headers(buf: &[u8], start: usize, end: usize) -> DecodeResult<Vec<TextureDef>> {
    let end = if end > buf.len() {
        tracing::warn!(end, len = buf.len(), "texture table runs past end of file");
        buf.len()
    } else {
        end
    };

    let mut defs: Vec<TextureDef> = Vec::new();
    let mut cursor = start;
    while cursor + TEXTURE_HEADER_SIZE <= end {
        let width = layout::WIDTH.read(buf, cursor)?.as_u32();
        if width == 0 {
            break;
        }

        let height = match layout::HEIGHT.read(buf, cursor)?.as_u32() {
            0 => width,
            h => h,
        };
        if !(is_valid_dimension(width) && is_valid_dimension(height)) {
            tracing::warn!(
                index = defs.len(),
                width,
                height,
                "texture header has impossible dimensions, ending table"
            );
            break;
        }
        let base_location = layout::BASE_LOCATION.read(buf, cursor)?.as_u32();
        let ram_offset = defs.first().map_or(base_location, |first| first.ram_offset);

        defs.push(TextureDef {
            index: defs.len(),
            width,
            height,
            color_format: ColorFormat::from_code(layout::FORMAT.read(buf, cursor)?.as_u32() as u8),
            texture_type: layout::TYPE.read(buf, cursor)?.as_u32() as u8,
            base_location,
            ram_offset,
        });
        cursor += TEXTURE_HEADER_SIZE;
    }

    tracing::debug!(textures = defs.len(), "scanned texture headers");
    Ok(defs)
}

/// Decode one texture from a texture file into row-major RGBA8888.
///
/// Pixels whose data falls outside `buf` are left transparent black, as are
/// all pixels of unsupported formats. Definitions with impossible
/// dimensions are refused.
pub fn decode_texture(buf: &[u8], def: &TextureDef) -> DecodeResult<Vec<u8>> {
    def.check_dimensions()?;
    let mut rgba = vec![0u8; def.pixel_count() * 4];
    let Some(base) = def.file_offset() else {
        return Ok(rgba);
    };
    if !def.color_format.is_supported() {
        return Ok(rgba);
    }

    for y in 0..def.height {
        for x in 0..def.width {
            let word = twiddled_index(x, y, def.width, def.height);
            let Ok(value) = read_u16(buf, base + word * 2) else {
                continue;
            };
            let dest = (y as usize * def.width as usize + x as usize) * 4;
            rgba[dest..dest + 4].copy_from_slice(&def.color_format.to_rgba(value));
        }
    }
    Ok(rgba)
}
