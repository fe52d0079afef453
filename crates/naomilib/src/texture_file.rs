//! Texture files: loading, editing and re-exporting texture pixel data.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use naomilib_decode::{
    Compression, HslAdjustment, SectionLayout, TextureDef, TextureFileKind, adjust_hsl,
    decode_texture, decompress_texture_buffer, quantize_rgba, recompress, write_texture_region,
};

use crate::{Error, Result};

/// Marker inserted before the extension of exported files.
pub const EXPORT_MARKER: &str = "mod";

/// Options applied when edited textures are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Reduce edited textures to their file kind's colour budget.
    pub quantize: bool,
    /// Re-apply the file's original compression on export.
    pub recompress: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            quantize: true,
            recompress: true,
        }
    }
}

/// A texture file and the definitions that address it.
#[derive(Debug, Clone)]
pub struct TextureFile {
    data: Vec<u8>,
    compression: Compression,
    kind: TextureFileKind,
    textures: Vec<TextureDef>,
}

impl TextureFile {
    /// Load a texture file addressed by `textures`, usually the table of the
    /// matching polygon file.
    ///
    /// Portrait files are read as multi-section containers when they are
    /// not plain; other kinds as whole-file LZSS.
    pub fn load(bytes: &[u8], textures: &[TextureDef], kind: TextureFileKind) -> Result<Self> {
        let layout = match kind {
            TextureFileKind::Portrait => Some(SectionLayout::portrait()),
            TextureFileKind::Stage | TextureFileKind::SelectionScreen => None,
        };
        let (data, compression) = decompress_texture_buffer(bytes, textures, layout.as_ref())?;

        tracing::info!(
            bytes = data.len(),
            textures = textures.len(),
            ?kind,
            ?compression,
            "loaded texture file"
        );

        Ok(Self {
            data,
            compression,
            kind,
            textures: textures.to_vec(),
        })
    }

    pub fn from_path(
        path: impl AsRef<Path>,
        textures: &[TextureDef],
        kind: TextureFileKind,
    ) -> Result<Self> {
        Self::load(&std::fs::read(path)?, textures, kind)
    }

    /// The working (decompressed) buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn compression(&self) -> &Compression {
        &self.compression
    }

    #[must_use]
    pub fn kind(&self) -> TextureFileKind {
        self.kind
    }

    #[must_use]
    pub fn textures(&self) -> &[TextureDef] {
        &self.textures
    }

    pub fn texture(&self, index: usize) -> Result<&TextureDef> {
        self.textures.get(index).ok_or(Error::UnknownTexture(index))
    }

    /// Decode one texture to an RGBA image.
    pub fn decode_texture(&self, index: usize) -> Result<RgbaImage> {
        let def = self.texture(index)?;
        let rgba = decode_texture(&self.data, def)?;
        RgbaImage::from_raw(def.width, def.height, rgba).ok_or(Error::DimensionMismatch {
            width: def.width,
            height: def.height,
            actual_width: def.width,
            actual_height: def.height,
        })
    }

    /// Overwrite a texture with raw RGBA8888 pixels of the same size.
    ///
    /// Returns the number of pixels that landed inside the file.
    pub fn write_rgba(
        &mut self,
        index: usize,
        width: u32,
        height: u32,
        rgba: &mut [u8],
        options: &ExportOptions,
    ) -> Result<usize> {
        let def = *self.texture(index)?;
        if (width, height) != (def.width, def.height) {
            return Err(Error::DimensionMismatch {
                width: def.width,
                height: def.height,
                actual_width: width,
                actual_height: height,
            });
        }

        if options.quantize
            && let Some(budget) = self.kind.palette_budget(def.width, def.height)
        {
            let colors = quantize_rgba(rgba, budget);
            tracing::debug!(index, budget, colors, "quantized texture");
        }

        Ok(write_texture_region(&mut self.data, &def, rgba)?)
    }

    /// Replace a texture with an image, resized to fit with nearest
    /// neighbour sampling.
    pub fn replace_texture(
        &mut self,
        index: usize,
        image: &RgbaImage,
        options: &ExportOptions,
    ) -> Result<usize> {
        let def = *self.texture(index)?;
        def.check_dimensions()?;
        let resized;
        let image = if image.dimensions() == (def.width, def.height) {
            image
        } else {
            tracing::debug!(
                index,
                from = ?image.dimensions(),
                to = ?(def.width, def.height),
                "resizing replacement texture"
            );
            resized = imageops::resize(image, def.width, def.height, FilterType::Nearest);
            &resized
        };

        let mut rgba = image.as_raw().clone();
        self.write_rgba(index, def.width, def.height, &mut rgba, options)
    }

    /// Replace a texture with a PNG image.
    pub fn replace_texture_from_png(
        &mut self,
        index: usize,
        png: &[u8],
        options: &ExportOptions,
    ) -> Result<usize> {
        let image = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgba8();
        self.replace_texture(index, &image, options)
    }

    /// Shift the hue, saturation and lightness of one texture in place.
    pub fn adjust_hsl(&mut self, index: usize, adjustment: HslAdjustment) -> Result<usize> {
        let def = *self.texture(index)?;
        let mut rgba = decode_texture(&self.data, &def)?;
        adjust_hsl(&mut rgba, adjustment);
        Ok(write_texture_region(&mut self.data, &def, &rgba)?)
    }

    /// Serialize the file, re-compressing it the way it was loaded unless
    /// `options.recompress` is off.
    pub fn export(&self, options: &ExportOptions) -> Result<Vec<u8>> {
        if !options.recompress {
            return Ok(self.data.clone());
        }
        Ok(recompress(&self.data, &self.compression)?)
    }

    /// Export next to `source`, returning the path written.
    pub fn export_to(&self, source: impl AsRef<Path>, options: &ExportOptions) -> Result<PathBuf> {
        let path = exported_file_name(source.as_ref());
        std::fs::write(&path, self.export(options)?)?;
        tracing::info!(path = %path.display(), "exported texture file");
        Ok(path)
    }
}

/// Output path for an edited file: `<stem>.mod.<ext>`, or `<name>.mod`
/// when the source has no extension.
#[must_use]
pub fn exported_file_name(source: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    let name = match source.extension() {
        Some(ext) => format!("{stem}.{EXPORT_MARKER}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{EXPORT_MARKER}"),
    };
    source.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exported_file_name() {
        assert_eq!(
            exported_file_name(Path::new("roms/PL00TEX.BIN")),
            PathBuf::from("roms/PL00TEX.mod.BIN")
        );
        assert_eq!(
            exported_file_name(Path::new("STG01TEX")),
            PathBuf::from("STG01TEX.mod")
        );
        assert_eq!(
            exported_file_name(Path::new("a.b.bin")),
            PathBuf::from("a.b.mod.bin")
        );
    }

    #[test]
    fn test_export_options_default() {
        let options = ExportOptions::default();
        assert!(options.quantize && options.recompress);
    }
}
