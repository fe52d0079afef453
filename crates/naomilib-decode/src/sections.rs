//! Multi-section texture containers.
//!
//! Portrait texture files start with a table of `u32` section offsets. The
//! table is as long as the first offset says (`first / 4` entries). Each
//! section runs to the next offset, or to the end of the file, and holds an
//! independent LZSS stream. Sections named in the [`SectionLayout`] carry a
//! VQ stream under the LZSS.

use crate::bitstream;
use crate::error::{DecodeError, DecodeResult};
use crate::reader::read_u32;
use crate::vq;

/// Section alignment used when rebuilding a container.
pub const SECTION_ALIGNMENT: usize = 4;

/// Which sections of a container are VQ-compressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionLayout {
    pub vq_sections: Vec<usize>,
}

impl SectionLayout {
    /// Character portrait files: the first section is VQ.
    #[must_use]
    pub fn portrait() -> Self {
        Self {
            vq_sections: vec![0],
        }
    }

    #[must_use]
    pub fn is_vq(&self, section: usize) -> bool {
        self.vq_sections.contains(&section)
    }
}

/// The decoded contents of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedSections {
    /// Every decoded section, concatenated in table order.
    pub data: Vec<u8>,
    /// Decoded length of each section.
    pub lengths: Vec<usize>,
}

/// Split a container into its raw (still compressed) sections.
pub fn split_sections(buf: &[u8]) -> DecodeResult<Vec<&[u8]>> {
    let first = read_u32(buf, 0)? as usize;
    if first == 0 || first % 4 != 0 || first > buf.len() {
        return Err(DecodeError::invalid(
            "section table",
            format!("first section offset {first:#x} in a {} byte file", buf.len()),
        ));
    }

    let count = first / 4;
    let mut offsets = Vec::with_capacity(count + 1);
    for i in 0..count {
        offsets.push(read_u32(buf, i * 4)? as usize);
    }
    offsets.push(buf.len());

    let mut sections = Vec::with_capacity(count);
    for (i, pair) in offsets.windows(2).enumerate() {
        let (start, end) = (pair[0], pair[1]);
        if start > end || end > buf.len() {
            return Err(DecodeError::invalid(
                "section table",
                format!("section {i} spans {start:#x}..{end:#x} in a {} byte file", buf.len()),
            ));
        }
        sections.push(&buf[start..end]);
    }
    Ok(sections)
}

/// Decode every section of a container.
pub fn decode_sections(buf: &[u8], layout: &SectionLayout) -> DecodeResult<DecodedSections> {
    let mut decoded = DecodedSections::default();
    for (i, raw) in split_sections(buf)?.into_iter().enumerate() {
        let mut section = bitstream::decompress(raw)?;
        if layout.is_vq(i) {
            section = vq::decompress(&section)?;
        }
        decoded.lengths.push(section.len());
        decoded.data.extend_from_slice(&section);
    }

    tracing::debug!(
        sections = decoded.lengths.len(),
        bytes = decoded.data.len(),
        "decoded section container"
    );
    Ok(decoded)
}

/// Rebuild a container from decoded section data.
///
/// `lengths` splits `data` into sections. Each section is VQ-compressed if
/// the layout says so, then LZSS-compressed, and placed at the next
/// 4-byte boundary.
pub fn encode_sections(data: &[u8], lengths: &[usize], layout: &SectionLayout) -> DecodeResult<Vec<u8>> {
    let total: usize = lengths.iter().sum();
    if total != data.len() || lengths.is_empty() {
        return Err(DecodeError::invalid(
            "section lengths",
            format!(
                "{} sections totalling {total} bytes for {} bytes of data",
                lengths.len(),
                data.len()
            ),
        ));
    }

    let mut out = vec![0u8; lengths.len() * 4];
    let mut start = 0;
    for (i, &len) in lengths.iter().enumerate() {
        let section = &data[start..start + len];
        start += len;

        let packed = if layout.is_vq(i) {
            bitstream::compress(&vq::compress(section)?)?
        } else {
            bitstream::compress(section)?
        };

        out.resize(out.len().next_multiple_of(SECTION_ALIGNMENT), 0);
        let offset = u32::try_from(out.len()).map_err(|_| {
            DecodeError::invalid("section table", "container exceeds 4 GiB")
        })?;
        out[i * 4..i * 4 + 4].copy_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&packed);
    }
    Ok(out)
}
