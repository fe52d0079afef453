//! Detecting and undoing whole-file compression.
//!
//! Files carry no flag saying whether they are compressed. Instead the
//! buffer is first scanned as if it were plain. If that scan runs out of
//! bounds the buffer is decompressed and scanned again. Only range errors
//! count as a compression signal; any other failure is a real format error.

use crate::address::scan_model_pointer_table;
use crate::bitstream;
use crate::error::{DecodeError, DecodeResult};
use crate::scanner::scan_model;
use crate::sections::{SectionLayout, decode_sections, encode_sections};
use crate::texture::{TextureDef, scan_texture_table};

/// How a file's working buffer was obtained from its bytes on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Compression {
    /// The file is used as is.
    #[default]
    None,
    /// The whole file is one LZSS stream.
    Lzss,
    /// A multi-section container; the working buffer is the concatenation
    /// of the decoded sections.
    Sections {
        lengths: Vec<usize>,
        layout: SectionLayout,
    },
}

impl Compression {
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Dry-run a polygon file scan.
///
/// Succeeds if the header, model table, every model and the texture table
/// can be read without running out of bounds. Models that fail for other
/// reasons do not count against the buffer; the full scan reports them.
pub fn probe_polygon_buffer(buf: &[u8]) -> DecodeResult<()> {
    let table = scan_model_pointer_table(buf)?;
    if table.offsets.len() < table.count as usize {
        return Err(DecodeError::OutOfBounds {
            offset: 0,
            len: table.count as usize * 4,
            buffer_len: buf.len(),
        });
    }

    for &address in &table.offsets {
        match scan_model(buf, address).error {
            Some(e) if e.is_out_of_bounds() => return Err(e),
            _ => {}
        }
    }

    scan_texture_table(buf)?;
    Ok(())
}

/// Dry-run texture placement against a texture file buffer.
///
/// The first texture must lie wholly inside the buffer, and any texture that
/// starts inside it must also end inside it. Textures that start past the
/// end are ignored: they live elsewhere in runtime memory.
pub fn probe_texture_buffer(buf: &[u8], defs: &[TextureDef]) -> DecodeResult<()> {
    let out_of_bounds = |def: &TextureDef| DecodeError::OutOfBounds {
        offset: def.file_offset().unwrap_or(usize::MAX),
        len: def.byte_len(),
        buffer_len: buf.len(),
    };

    let Some(first) = defs.first() else {
        return Ok(());
    };
    if !first.fits_in(buf.len()) {
        return Err(out_of_bounds(first));
    }

    for def in defs {
        let starts_inside = def.file_offset().is_some_and(|offset| offset < buf.len());
        if starts_inside && !def.fits_in(buf.len()) {
            return Err(out_of_bounds(def));
        }
    }
    Ok(())
}

/// Produce the working buffer for a polygon file.
pub fn decompress_polygon_buffer(buf: &[u8]) -> DecodeResult<(Vec<u8>, Compression)> {
    match probe_polygon_buffer(buf) {
        Ok(()) => return Ok((buf.to_vec(), Compression::None)),
        Err(e) if e.is_out_of_bounds() => {
            tracing::debug!("plain polygon scan failed ({e}), trying lzss");
        }
        Err(e) => return Err(e),
    }

    match bitstream::decompress(buf) {
        Ok(decoded) if probe_polygon_buffer(&decoded).is_ok() => {
            tracing::debug!(
                compressed = buf.len(),
                decompressed = decoded.len(),
                "polygon file is lzss compressed"
            );
            Ok((decoded, Compression::Lzss))
        }
        _ => {
            tracing::warn!("polygon file does not decompress cleanly, scanning as is");
            Ok((buf.to_vec(), Compression::None))
        }
    }
}

/// Produce the working buffer for a texture file.
///
/// With a section layout the file is expected to be a multi-section
/// container when it is not plain. Otherwise a whole-file LZSS stream is
/// tried.
pub fn decompress_texture_buffer(
    buf: &[u8],
    defs: &[TextureDef],
    layout: Option<&SectionLayout>,
) -> DecodeResult<(Vec<u8>, Compression)> {
    match probe_texture_buffer(buf, defs) {
        Ok(()) => return Ok((buf.to_vec(), Compression::None)),
        Err(e) if e.is_out_of_bounds() => {
            tracing::debug!("texture data does not fit plain file ({e})");
        }
        Err(e) => return Err(e),
    }

    let attempt = match layout {
        Some(layout) => decode_sections(buf, layout).map(|decoded| {
            let compression = Compression::Sections {
                lengths: decoded.lengths,
                layout: layout.clone(),
            };
            (decoded.data, compression)
        }),
        None => bitstream::decompress(buf).map(|decoded| (decoded, Compression::Lzss)),
    };

    match attempt {
        Ok((decoded, compression)) if probe_texture_buffer(&decoded, defs).is_ok() => {
            tracing::debug!(
                compressed = buf.len(),
                decompressed = decoded.len(),
                ?compression,
                "texture file is compressed"
            );
            Ok((decoded, compression))
        }
        Ok(_) => {
            tracing::warn!("decompressed texture data still does not fit, using file as is");
            Ok((buf.to_vec(), Compression::None))
        }
        Err(e) => {
            tracing::warn!("texture file does not decompress cleanly ({e}), using file as is");
            Ok((buf.to_vec(), Compression::None))
        }
    }
}

/// Re-apply the compression a working buffer was decoded with.
pub fn recompress(data: &[u8], compression: &Compression) -> DecodeResult<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Lzss => bitstream::compress(data),
        Compression::Sections { lengths, layout } => encode_sections(data, lengths, layout),
    }
}
