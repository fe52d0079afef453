//! Writing edited pixels back into a texture file.

use crate::error::{DecodeError, DecodeResult};
use crate::morton::twiddled_index;
use crate::reader::write_u16;
use crate::texture::TextureDef;

/// Pack row-major RGBA8888 pixels into the region `def` occupies in `dest`.
///
/// Returns the number of pixels written. Pixels whose destination lies past
/// the end of `dest` are skipped: texture definitions may point at runtime
/// memory that is not part of this file. Bytes outside the texture's own
/// pixels are never touched. Definitions with impossible dimensions are
/// refused.
pub fn write_texture_region(dest: &mut [u8], def: &TextureDef, rgba: &[u8]) -> DecodeResult<usize> {
    def.check_dimensions()?;
    let expected = def.pixel_count() * 4;
    if rgba.len() != expected {
        return Err(DecodeError::invalid(
            "texture pixels",
            format!(
                "texture {} is {}x{} and needs {expected} bytes, got {}",
                def.index,
                def.width,
                def.height,
                rgba.len()
            ),
        ));
    }

    if !def.color_format.is_supported() {
        tracing::warn!(
            index = def.index,
            format = ?def.color_format,
            "cannot encode texture format, leaving texture unchanged"
        );
        return Ok(0);
    }

    let Some(base) = def.file_offset() else {
        return Ok(0);
    };

    let mut written = 0;
    for (i, pixel) in rgba.chunks_exact(4).enumerate() {
        let x = (i % def.width as usize) as u32;
        let y = (i / def.width as usize) as u32;
        let offset = base + twiddled_index(x, y, def.width, def.height) * 2;
        let value = def
            .color_format
            .from_rgba([pixel[0], pixel[1], pixel[2], pixel[3]]);
        if write_u16(dest, offset, value).is_ok() {
            written += 1;
        }
    }

    if written < def.pixel_count() {
        tracing::debug!(
            index = def.index,
            written,
            total = def.pixel_count(),
            "texture extends past end of file"
        );
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::ColorFormat;
    use crate::texture::decode_texture;

    fn def(width: u32, height: u32, format: ColorFormat, base: u32) -> TextureDef {
        TextureDef {
            index: 0,
            width,
            height,
            color_format: format,
            texture_type: 0,
            base_location: base,
            ram_offset: 0,
        }
    }

    #[test]
    fn test_write_then_decode() {
        let def = def(4, 2, ColorFormat::Argb4444, 4);
        let mut rgba = Vec::new();
        for i in 0..8u8 {
            rgba.extend_from_slice(&[i * 17, 255 - i * 17, 0x33, 0xFF]);
        }

        let mut file = vec![0xAB; 4 + def.byte_len() + 4];
        assert_eq!(write_texture_region(&mut file, &def, &rgba).unwrap(), 8);
        assert_eq!(decode_texture(&file, &def).unwrap(), rgba);
        // Surrounding bytes are untouched.
        assert_eq!(&file[..4], &[0xAB; 4]);
        assert_eq!(&file[file.len() - 4..], &[0xAB; 4]);
    }

    #[test]
    fn test_writes_past_end_are_skipped() {
        let def = def(2, 2, ColorFormat::Rgb565, 4);
        let mut file = vec![0u8; 8];
        let rgba = [0xFF; 16];
        // Words 0 and 1 fit; 2 and 3 do not.
        assert_eq!(write_texture_region(&mut file, &def, &rgba).unwrap(), 2);
        assert_eq!(&file[4..], &[0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_unsupported_format_is_noop() {
        let def = def(2, 2, ColorFormat::Rgb555, 0);
        let mut file = vec![0x11; 8];
        assert_eq!(write_texture_region(&mut file, &def, &[0xFF; 16]).unwrap(), 0);
        assert_eq!(file, vec![0x11; 8]);
    }

    #[test]
    fn test_pixel_count_mismatch() {
        let def = def(2, 2, ColorFormat::Rgb565, 0);
        let mut file = vec![0u8; 8];
        assert!(matches!(
            write_texture_region(&mut file, &def, &[0; 12]),
            Err(DecodeError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_impossible_dimensions_are_refused() {
        let def = def(0xFFFF, 0xFFFF, ColorFormat::Rgb565, 0);
        let mut file = vec![0x22; 8];
        assert!(matches!(
            write_texture_region(&mut file, &def, &[]),
            Err(DecodeError::InvalidFormat { .. })
        ));
        assert_eq!(file, vec![0x22; 8]);
    }
}
