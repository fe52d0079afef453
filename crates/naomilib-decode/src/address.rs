//! Runtime pointer resolution.
//!
//! Polygon files are memory snapshots: pointers inside them are addresses as
//! the game saw them after loading the file somewhere in RAM. The load
//! address is recovered from the first pointer in the file (the model table
//! lives near the start, so masking its low byte gives the base).

use crate::error::{DecodeError, DecodeResult};
use crate::reader::read_u32;

/// File offset of the model table pointer.
pub const MODEL_TABLE_POINTER: usize = 0x00;
/// File offset of the model count.
pub const MODEL_COUNT: usize = 0x04;
/// File offset of the texture header table start pointer.
pub const TEXTURE_TABLE_START_POINTER: usize = 0x08;
/// File offset of the texture header table end pointer.
pub const TEXTURE_TABLE_END_POINTER: usize = 0x10;
/// Smallest buffer that holds the polygon file header.
pub const POLYGON_HEADER_SIZE: usize = 0x14;

/// Result of reading the model pointer table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelTable {
    /// File offsets of each model, in table order. Unreadable entries are
    /// skipped, so this may be shorter than `count`.
    pub offsets: Vec<usize>,
    /// The model count declared in the header.
    pub count: u32,
    /// Runtime base address the file was loaded at.
    pub ram_offset: u32,
}

/// Recover the runtime load address of a polygon file.
pub fn resolve_model_ram_offset(buf: &[u8]) -> DecodeResult<u32> {
    Ok(read_u32(buf, MODEL_TABLE_POINTER)? & 0xFFFF_FF00)
}

/// Convert a runtime pointer into a file offset.
///
/// Pointers below the load address cannot refer to this file.
pub fn to_file_offset(pointer: u32, ram_offset: u32) -> DecodeResult<usize> {
    pointer
        .checked_sub(ram_offset)
        .map(|offset| offset as usize)
        .ok_or(DecodeError::PointerOutOfRange {
            pointer,
            ram_offset,
        })
}

/// Read the model pointer table.
///
/// The header must be readable; individual table entries that fall outside
/// the buffer are logged and skipped.
pub fn scan_model_pointer_table(buf: &[u8]) -> DecodeResult<ModelTable> {
    if buf.len() < POLYGON_HEADER_SIZE {
        return Err(DecodeError::BufferTooSmall {
            expected: POLYGON_HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let ram_offset = resolve_model_ram_offset(buf)?;
    let table = to_file_offset(read_u32(buf, MODEL_TABLE_POINTER)?, ram_offset)?;
    let count = read_u32(buf, MODEL_COUNT)?;

    let mut offsets = Vec::new();
    for index in 0..count as usize {
        let entry = table + index * 4;
        let resolved =
            read_u32(buf, entry).and_then(|pointer| to_file_offset(pointer, ram_offset));
        match resolved {
            Ok(offset) => offsets.push(offset),
            Err(e) => {
                tracing::warn!(index, entry, "skipping model table entry: {e}");
                // Everything past the end of the buffer will fail the same way.
                if matches!(e, DecodeError::OutOfBounds { .. }) {
                    break;
                }
            }
        }
    }

    tracing::debug!(
        ram_offset = format_args!("{ram_offset:#010x}"),
        declared = count,
        resolved = offsets.len(),
        "scanned model table"
    );

    Ok(ModelTable {
        offsets,
        count,
        ram_offset,
    })
}
